//! Upload ingestion.
//!
//! [`IngestionCoordinator`] drives one upload through the pipeline:
//!
//! ```text
//! received → (HEIC? convert) → decoded → duplicate check → metadata
//!          → original persisted → record created (processing)
//!          → renditions → hashes → location name → enrichment → draft
//! ```
//!
//! The original is stored through the [`StorageGateway`] before the record
//! exists, so `photo.original` is always a resolvable location (or `None`
//! when both tiers refused it). A fatal failure after the record was created
//! rolls the upload back: the record, the stored original and any rendition
//! already written are removed.
//!
//! [`IngestionCoordinator::quick_upload`] only validates and stashes the
//! upload next to a minimal `processing` record; a background worker later
//! calls [`IngestionCoordinator::process_pending`] to run the full pipeline.
//!
//! Temporary files (HEIC conversions) live in a per-call [`ScratchFiles`]
//! guard and are removed on every exit path.

use crate::catalog::{CatalogError, PhotoRepository};
use crate::config::Config;
use crate::dedupe::{self, DuplicateMatch};
use crate::enrich::{Enricher, apply_enrichment};
use crate::heic::{HeicConverter, HeicError, is_heic};
use crate::imaging::{
    ImageBackend, ImagingError, OutputFormat, RenditionKind, Watermark, generate_renditions,
    rendition_path,
};
use crate::metadata::{self, Geocoder};
use crate::photo::{Photo, PhotoStatus};
use crate::report::{BatchReport, ItemOutcome};
use crate::slug::unique_slug;
use crate::storage::StorageGateway;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Upload file extensions the pipeline accepts.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "heic", "heif"];

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Directory (below the private root or bucket prefix) holding originals.
pub const ORIGINALS_DIR: &str = "originals";

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Rejected {}: {reason}", .path.display())]
    Rejected { path: PathBuf, reason: String },
    #[error("{} duplicates photo {} (distance {})", .path.display(), .existing.slug, .existing.distance)]
    Duplicate {
        path: PathBuf,
        existing: DuplicateMatch,
    },
    #[error("Photo not found: {0}")]
    PhotoNotFound(Uuid),
    #[error("Photo {0} has no pending upload")]
    NotPending(Uuid),
    #[error("HEIC conversion failed: {0}")]
    Heic(#[from] HeicError),
    #[error("Imaging error: {0}")]
    Imaging(#[from] ImagingError),
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// Batch outcome for a failed item.
    pub fn outcome(&self) -> ItemOutcome {
        match self {
            Self::Duplicate { existing, .. } => ItemOutcome::Duplicate {
                of: existing.photo_id,
                slug: existing.slug.clone(),
                distance: existing.distance,
            },
            Self::NotFound(_) | Self::PhotoNotFound(_) => ItemOutcome::NotFound,
            other => ItemOutcome::Error(other.to_string()),
        }
    }
}

/// Temp files created while processing one upload.
///
/// Dropping the guard deletes them, whether processing succeeded or not.
#[derive(Default)]
pub struct ScratchFiles {
    files: Vec<TempPath>,
}

impl ScratchFiles {
    /// Create an empty temp file ending in `suffix` and track it.
    pub fn create(&mut self, suffix: &str) -> std::io::Result<PathBuf> {
        let path = tempfile::Builder::new()
            .prefix("darkroom-")
            .suffix(suffix)
            .tempfile()?
            .into_temp_path();
        let owned = path.to_path_buf();
        self.files.push(path);
        Ok(owned)
    }

    /// Take ownership of an existing temp file.
    pub fn track(&mut self, path: TempPath) -> PathBuf {
        let owned = path.to_path_buf();
        self.files.push(path);
        owned
    }
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        for path in self.files.drain(..) {
            let shown = path.display().to_string();
            if let Err(e) = path.close() {
                debug!(path = %shown, error = %e, "Could not remove scratch file");
            }
        }
    }
}

/// Check an upload's existence, type and size.
pub fn validate_upload(path: &Path) -> Result<(), IngestError> {
    let meta = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(IngestError::NotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    let rejected = |reason: String| IngestError::Rejected {
        path: path.to_path_buf(),
        reason,
    };
    if !meta.is_file() {
        return Err(rejected("not a regular file".into()));
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if !ACCEPTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(rejected(format!(
            "unsupported file type (accepted: {})",
            ACCEPTED_EXTENSIONS.join(", ")
        )));
    }
    if meta.len() > MAX_UPLOAD_BYTES {
        return Err(rejected(format!(
            "file is {} bytes, limit is {MAX_UPLOAD_BYTES}",
            meta.len()
        )));
    }
    Ok(())
}

/// Decode an image, converting HEIC/HEIF through `heic` first.
///
/// Returns the image and the path that was decoded: `path` itself, or the
/// converted JPEG, which lives as long as `scratch`.
pub fn decode_upload(
    backend: &impl ImageBackend,
    heic: &dyn HeicConverter,
    path: &Path,
    scratch: &mut ScratchFiles,
) -> Result<(DynamicImage, PathBuf), IngestError> {
    let working = if is_heic(path) {
        let converted = scratch.create(".jpg")?;
        heic.convert(path, &converted)?;
        debug!(path = %path.display(), "Converted HEIC upload");
        converted
    } else {
        path.to_path_buf()
    };
    let image = backend.decode(&working)?;
    Ok((image, working))
}

/// File stem shared by a photo's renditions: `{slug}-{id fragment}`.
pub fn rendition_stem(photo: &Photo) -> String {
    format!("{}-{}", photo.slug, photo.id_fragment())
}

/// Storage key for a photo's original, keeping the upload's extension.
pub fn original_key(stem: &str, upload: &Path) -> String {
    let ext = upload
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| "jpg".to_string());
    format!("{ORIGINALS_DIR}/{stem}.{ext}")
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string())
}

/// Orchestrates uploads from file to draft photo.
pub struct IngestionCoordinator<'a, B, R> {
    config: &'a Config,
    backend: &'a B,
    gateway: &'a StorageGateway,
    repo: &'a mut R,
    heic: &'a dyn HeicConverter,
    geocoder: Option<&'a dyn Geocoder>,
    enricher: Option<&'a dyn Enricher>,
    watermark: Option<Watermark>,
}

impl<'a, B: ImageBackend, R: PhotoRepository> IngestionCoordinator<'a, B, R> {
    pub fn new(
        config: &'a Config,
        backend: &'a B,
        gateway: &'a StorageGateway,
        repo: &'a mut R,
        heic: &'a dyn HeicConverter,
    ) -> Self {
        Self {
            config,
            backend,
            gateway,
            repo,
            heic,
            geocoder: None,
            enricher: None,
            watermark: Watermark::from_config(&config.watermark),
        }
    }

    pub fn with_geocoder(mut self, geocoder: &'a dyn Geocoder) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    pub fn with_enricher(mut self, enricher: &'a dyn Enricher) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn repo(&self) -> &R {
        &*self.repo
    }

    /// Run the full pipeline for one upload.
    pub fn ingest(&mut self, path: &Path, category: Option<&str>) -> Result<Photo, IngestError> {
        validate_upload(path)?;
        let filename = display_name(path);
        let slug = unique_slug(&filename, |s| self.repo.slug_exists(s));
        let mut photo = Photo::new(slug, filename);
        photo.category = category.map(str::to_string);
        info!(path = %path.display(), slug = %photo.slug, "Ingesting upload");
        self.process(photo, path, false)
    }

    /// Ingest each file, reporting per-item outcomes.
    pub fn ingest_batch(&mut self, paths: &[PathBuf], category: Option<&str>) -> BatchReport {
        let mut report = BatchReport::default();
        for path in paths {
            let outcome = match self.ingest(path, category) {
                Ok(photo) => ItemOutcome::Succeeded(photo.id),
                Err(e) => {
                    log_item_failure(path, &e);
                    e.outcome()
                }
            };
            report.push(path.display().to_string(), outcome);
        }
        report
    }

    /// Validate and stash an upload for deferred processing.
    ///
    /// Only exact duplicates are rejected here; the record stays in
    /// `processing` until [`process_pending`](Self::process_pending) runs.
    pub fn quick_upload(
        &mut self,
        path: &Path,
        category: Option<&str>,
    ) -> Result<Photo, IngestError> {
        validate_upload(path)?;
        let hash = dedupe::file_hash(path)?;
        if let Some(existing) = self.repo.find_by_file_hash(&hash) {
            return Err(IngestError::Duplicate {
                path: path.to_path_buf(),
                existing: DuplicateMatch {
                    photo_id: existing.id,
                    slug: existing.slug,
                    distance: 0,
                },
            });
        }

        let filename = display_name(path);
        let slug = unique_slug(&filename, |s| self.repo.slug_exists(s));
        let mut photo = Photo::new(slug, filename);
        photo.category = category.map(str::to_string);

        let pending_dir = &self.config.paths.pending_dir;
        std::fs::create_dir_all(pending_dir)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_else(|| "jpg".to_string());
        let stash = pending_dir.join(format!("{}.{ext}", photo.id.simple()));
        std::fs::copy(path, &stash)?;
        photo.pending_upload = Some(stash.clone());

        if let Err(e) = self.repo.insert(photo.clone()) {
            let _ = std::fs::remove_file(&stash);
            return Err(e.into());
        }
        info!(photo_id = %photo.id, slug = %photo.slug, "Queued upload for processing");
        Ok(photo)
    }

    /// Quick-upload each file, reporting per-item outcomes.
    pub fn quick_upload_batch(
        &mut self,
        paths: &[PathBuf],
        category: Option<&str>,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        for path in paths {
            let outcome = match self.quick_upload(path, category) {
                Ok(photo) => ItemOutcome::Succeeded(photo.id),
                Err(e) => {
                    log_item_failure(path, &e);
                    e.outcome()
                }
            };
            report.push(path.display().to_string(), outcome);
        }
        report
    }

    /// Run the deferred pipeline for a quick-upload record.
    ///
    /// On success the stash is removed and the record becomes a draft. On
    /// failure the record stays in `processing` with its stash, so the
    /// worker can retry.
    pub fn process_pending(&mut self, photo_id: Uuid) -> Result<Photo, IngestError> {
        let photo = self
            .repo
            .get(photo_id)
            .ok_or(IngestError::PhotoNotFound(photo_id))?;
        let stash = photo
            .pending_upload
            .clone()
            .ok_or(IngestError::NotPending(photo_id))?;
        if !stash.is_file() {
            return Err(IngestError::NotFound(stash));
        }

        let mut photo = self.process(photo, &stash, true)?;
        if let Err(e) = std::fs::remove_file(&stash) {
            warn!(path = %stash.display(), error = %e, "Could not remove processed stash");
        }
        photo.pending_upload = None;
        self.repo.update(&photo)?;
        Ok(photo)
    }

    /// Process every record waiting in the quick-upload queue.
    pub fn process_all_pending(&mut self) -> BatchReport {
        let pending: Vec<Uuid> = self
            .repo
            .all()
            .into_iter()
            .filter(|p| p.pending_upload.is_some())
            .map(|p| p.id)
            .collect();
        let mut report = BatchReport::default();
        for id in pending {
            let outcome = match self.process_pending(id) {
                Ok(photo) => ItemOutcome::Succeeded(photo.id),
                Err(e) => {
                    error!(photo_id = %id, error = %e, "Deferred processing failed");
                    e.outcome()
                }
            };
            report.push(id.to_string(), outcome);
        }
        report
    }

    fn process(
        &mut self,
        mut photo: Photo,
        upload: &Path,
        record_exists: bool,
    ) -> Result<Photo, IngestError> {
        let mut scratch = ScratchFiles::default();
        let (source, working) = decode_upload(self.backend, self.heic, upload, &mut scratch)?;
        let file_hash = dedupe::file_hash(upload)?;
        let image_hash = dedupe::dhash(&source);
        if !record_exists && let Some(existing) = self.find_existing(&file_hash, &image_hash) {
            return Err(IngestError::Duplicate {
                path: upload.to_path_buf(),
                existing,
            });
        }

        photo.original_width = Some(source.width());
        photo.original_height = Some(source.height());
        if let Some(meta) = metadata::read_metadata(&working) {
            photo.exif = meta.exif;
            photo.latitude = meta.latitude;
            photo.longitude = meta.longitude;
        }

        let stem = rendition_stem(&photo);
        if photo.original.is_none() {
            photo.original = self.gateway.put(upload, &original_key(&stem, upload));
            match &photo.original {
                Some(location) => debug!(photo_id = %photo.id, original = %location, "Stored original"),
                None => warn!(photo_id = %photo.id, "Original could not be stored on any tier"),
            }
        }

        match self.derive(&mut photo, &source, &stem, record_exists, file_hash, image_hash) {
            Ok(()) => {
                info!(photo_id = %photo.id, slug = %photo.slug, "Photo ready as draft");
                Ok(photo)
            }
            Err(e) => {
                error!(photo_id = %photo.id, error = %e, "Processing failed, rolling back");
                self.roll_back(&photo, &stem, record_exists);
                Err(e)
            }
        }
    }

    fn derive(
        &mut self,
        photo: &mut Photo,
        source: &DynamicImage,
        stem: &str,
        record_exists: bool,
        file_hash: String,
        image_hash: String,
    ) -> Result<(), IngestError> {
        if record_exists {
            self.repo.update(photo)?;
        } else {
            self.repo.insert(photo.clone())?;
        }

        let settings = self
            .config
            .rendition_settings(photo.custom_max_resolution, photo.custom_quality);
        let public_root = &self.config.paths.public_root;
        let set = generate_renditions(
            self.backend,
            source,
            public_root,
            stem,
            &settings,
            self.watermark.as_ref(),
        )?;
        let display_file = public_root.join(&set.display_path);
        photo.display_path = Some(set.display_path);
        photo.thumbnail_path = Some(set.thumbnail_path);
        photo.watermarked_path = Some(set.watermarked_path);
        photo.width = Some(set.width);
        photo.height = Some(set.height);

        photo.file_hash = Some(file_hash);
        photo.image_hash = Some(image_hash);

        if self.config.geocoding.enabled
            && let Some(geocoder) = self.geocoder
            && let (Some(lat), Some(lon)) = (photo.latitude, photo.longitude)
        {
            photo.location_name = metadata::location_name(geocoder, lat, lon);
        }

        if let Some(enricher) = self.enricher {
            apply_enrichment(enricher, photo, &display_file);
        }

        if !self.config.images.keep_original
            && let Some(original) = photo.original.take()
            && !self.gateway.delete(&original)
        {
            warn!(photo_id = %photo.id, original = %original, "Could not discard original");
        }

        photo.status = PhotoStatus::Draft;
        self.repo.update(photo)?;
        Ok(())
    }

    fn find_existing(&self, file_hash: &str, image_hash: &str) -> Option<DuplicateMatch> {
        if let Some(photo) = self.repo.find_by_file_hash(file_hash) {
            return Some(DuplicateMatch {
                photo_id: photo.id,
                slug: photo.slug,
                distance: 0,
            });
        }
        dedupe::find_similar(&*self.repo, image_hash, self.config.images.duplicate_threshold)
    }

    /// Undo a failed upload. Deferred records keep their original and stash
    /// so the worker can retry.
    fn roll_back(&mut self, photo: &Photo, stem: &str, record_exists: bool) {
        let public_root = &self.config.paths.public_root;
        let candidates = [
            rendition_path(RenditionKind::Display, stem, OutputFormat::Avif),
            rendition_path(RenditionKind::Thumbnail, stem, OutputFormat::Webp),
            rendition_path(RenditionKind::Watermarked, stem, OutputFormat::Avif),
            rendition_path(RenditionKind::Watermarked, stem, OutputFormat::Webp),
        ];
        for relative in candidates {
            let _ = std::fs::remove_file(public_root.join(relative));
        }
        if record_exists {
            return;
        }
        if let Some(original) = &photo.original {
            self.gateway.delete(original);
        }
        match self.repo.remove(photo.id) {
            Ok(_) | Err(CatalogError::NotFound(_)) => {}
            Err(e) => warn!(photo_id = %photo.id, error = %e, "Could not remove failed record"),
        }
    }
}

fn log_item_failure(path: &Path, err: &IngestError) {
    match err {
        IngestError::Duplicate { existing, .. } => {
            info!(path = %path.display(), existing = %existing.photo_id, distance = existing.distance, "Skipped duplicate")
        }
        _ => error!(path = %path.display(), error = %err, "Upload failed"),
    }
}
