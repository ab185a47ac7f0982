//! Re-optimization and removal of existing photos.
//!
//! [`ReoptimizationEngine::reoptimize`] regenerates a photo's three
//! renditions under its current (or newly overridden) settings. Originals
//! may live remotely, locally, or nowhere at all, so the source is resolved
//! through a fixed priority chain:
//!
//! 1. remote original, downloaded to a temp file
//! 2. local original
//! 3. public display rendition
//! 4. public watermarked rendition
//! 5. a scan of the originals and display directories for the photo's id
//!    fragment, for records whose paths went stale
//!
//! HEIC/HEIF originals go through the HEIC converter first. A candidate
//! that still cannot be decoded is skipped in favour of the next one.
//!
//! Renditions are re-derived in place: `width`/`height` and the rendition
//! paths change, `status` and `file_hash` never do.

use crate::catalog::{CatalogError, PhotoRepository};
use crate::config::Config;
use crate::heic::HeicConverter;
use crate::imaging::{ImageBackend, ImagingError, RenditionKind, Watermark, generate_renditions};
use crate::ingest::{ORIGINALS_DIR, ScratchFiles, decode_upload, rendition_stem};
use crate::photo::{Photo, StorageLocation};
use crate::report::{BatchReport, ItemOutcome};
use crate::storage::StorageGateway;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ReoptimizeError {
    #[error("Photo not found: {0}")]
    PhotoNotFound(Uuid),
    #[error("No usable source image for photo {0}")]
    NoSource(Uuid),
    #[error("Imaging error: {0}")]
    Imaging(#[from] ImagingError),
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

/// Where a re-optimization source came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    RemoteOriginal,
    LocalOriginal,
    Display,
    Watermarked,
    Recovered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub path: PathBuf,
    pub kind: SourceKind,
}

/// New per-photo settings to apply before regenerating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overrides {
    pub max_resolution: Option<u32>,
    pub quality: Option<u32>,
}

/// Find the best available source image for `photo`.
///
/// A downloaded remote original is tracked by `scratch` and disappears
/// with it.
pub fn resolve_source(
    gateway: &StorageGateway,
    public_root: &Path,
    photo: &Photo,
    scratch: &mut ScratchFiles,
) -> Option<ResolvedSource> {
    stored_sources(gateway, public_root, photo, scratch)
        .into_iter()
        .next()
        .or_else(|| recovered_sources(gateway, public_root, photo).into_iter().next())
}

/// Sources the record points at, best first: original, display, watermarked.
fn stored_sources(
    gateway: &StorageGateway,
    public_root: &Path,
    photo: &Photo,
    scratch: &mut ScratchFiles,
) -> Vec<ResolvedSource> {
    let mut sources = Vec::new();

    match &photo.original {
        Some(StorageLocation::Remote(key)) => match gateway.fetch_to_temp(key) {
            Some(temp) => sources.push(ResolvedSource {
                path: scratch.track(temp),
                kind: SourceKind::RemoteOriginal,
            }),
            None => debug!(photo_id = %photo.id, key, "Remote original unavailable"),
        },
        Some(StorageLocation::Local(relative)) => {
            match gateway.local_path(relative).filter(|p| p.is_file()) {
                Some(path) => sources.push(ResolvedSource {
                    path,
                    kind: SourceKind::LocalOriginal,
                }),
                None => {
                    debug!(photo_id = %photo.id, path = %relative.display(), "Local original missing");
                }
            }
        }
        None => {}
    }

    for (relative, kind) in [
        (&photo.display_path, SourceKind::Display),
        (&photo.watermarked_path, SourceKind::Watermarked),
    ] {
        if let Some(relative) = relative {
            let path = public_root.join(relative);
            if path.is_file() {
                sources.push(ResolvedSource { path, kind });
            }
        }
    }
    sources
}

/// Files under the originals and display directories carrying the photo's
/// id fragment, for records whose paths went stale.
fn recovered_sources(gateway: &StorageGateway, public_root: &Path, photo: &Photo) -> Vec<ResolvedSource> {
    let fragment = photo.id_fragment();
    let search_dirs = [
        gateway.local_root().join(ORIGINALS_DIR),
        public_root.join(RenditionKind::Display.directory()),
    ];
    let mut sources = Vec::new();
    for dir in &search_dirs {
        let hits = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.file_name().to_string_lossy().contains(&fragment));
        for entry in hits {
            warn!(photo_id = %photo.id, path = %entry.path().display(), "Recovered source by id scan");
            sources.push(ResolvedSource {
                path: entry.into_path(),
                kind: SourceKind::Recovered,
            });
        }
    }
    sources
}

/// Delete a photo's rendition files, and its original unless `keep_original`.
///
/// Returns how many files were removed. Missing files are not an error.
pub fn delete_photo_files(
    gateway: &StorageGateway,
    public_root: &Path,
    photo: &Photo,
    keep_original: bool,
) -> usize {
    let mut removed = 0;
    let renditions = [
        &photo.display_path,
        &photo.thumbnail_path,
        &photo.watermarked_path,
    ];
    for relative in renditions.into_iter().flatten() {
        let path = public_root.join(relative);
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Could not delete rendition"),
        }
    }
    if let Some(stash) = &photo.pending_upload
        && std::fs::remove_file(stash).is_ok()
    {
        removed += 1;
    }
    if !keep_original
        && let Some(original) = &photo.original
        && gateway.delete(original)
    {
        removed += 1;
    }
    debug!(photo_id = %photo.id, removed, "Deleted photo files");
    removed
}

/// Delete a photo's files and then its record.
pub fn delete_photo(
    repo: &mut dyn PhotoRepository,
    gateway: &StorageGateway,
    public_root: &Path,
    photo_id: Uuid,
    keep_original: bool,
) -> Result<Photo, CatalogError> {
    let photo = repo.get(photo_id).ok_or(CatalogError::NotFound(photo_id))?;
    delete_photo_files(gateway, public_root, &photo, keep_original);
    let removed = repo.remove(photo_id)?;
    info!(photo_id = %photo_id, slug = %removed.slug, "Deleted photo");
    Ok(removed)
}

/// Regenerates renditions for existing photos.
pub struct ReoptimizationEngine<'a, B, R> {
    config: &'a Config,
    backend: &'a B,
    gateway: &'a StorageGateway,
    repo: &'a mut R,
    heic: &'a dyn HeicConverter,
    watermark: Option<Watermark>,
}

impl<'a, B: ImageBackend, R: PhotoRepository> ReoptimizationEngine<'a, B, R> {
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
            watermark: Watermark::from_config(&config.watermark),
        }
    }

    /// Regenerate all renditions of one photo.
    ///
    /// Overrides given here become the photo's per-photo settings. Without
    /// a resolvable source nothing is touched.
    pub fn reoptimize(&mut self, photo_id: Uuid, overrides: Overrides) -> Result<Photo, ReoptimizeError> {
        let mut photo = self
            .repo
            .get(photo_id)
            .ok_or(ReoptimizeError::PhotoNotFound(photo_id))?;
        let public_root = &self.config.paths.public_root;

        let mut scratch = ScratchFiles::default();
        let (source, image) = self
            .load_source(&photo, &mut scratch)
            .ok_or(ReoptimizeError::NoSource(photo_id))?;
        debug!(photo_id = %photo_id, source = ?source.kind, path = %source.path.display(), "Resolved source");

        if overrides.max_resolution.is_some() {
            photo.custom_max_resolution = overrides.max_resolution;
        }
        if overrides.quality.is_some() {
            photo.custom_quality = overrides.quality;
        }
        let settings = self
            .config
            .rendition_settings(photo.custom_max_resolution, photo.custom_quality);
        let set = generate_renditions(
            self.backend,
            &image,
            public_root,
            &rendition_stem(&photo),
            &settings,
            self.watermark.as_ref(),
        )?;

        let previous = [
            photo.display_path.replace(set.display_path),
            photo.thumbnail_path.replace(set.thumbnail_path),
            photo.watermarked_path.replace(set.watermarked_path),
        ];
        let current = [
            &photo.display_path,
            &photo.thumbnail_path,
            &photo.watermarked_path,
        ];
        for old in previous.into_iter().flatten() {
            if !current.iter().any(|c| c.as_deref() == Some(old.as_str())) {
                let _ = std::fs::remove_file(public_root.join(&old));
            }
        }
        photo.width = Some(set.width);
        photo.height = Some(set.height);
        self.repo.update(&photo)?;

        info!(
            photo_id = %photo_id,
            source = ?source.kind,
            width = set.width,
            height = set.height,
            "Re-optimized photo"
        );
        Ok(photo)
    }

    /// Decode the first usable source in chain order.
    ///
    /// A candidate that cannot be converted or decoded (a corrupt original,
    /// a HEIC file without a working converter) hands over to the next one.
    fn load_source(
        &self,
        photo: &Photo,
        scratch: &mut ScratchFiles,
    ) -> Option<(ResolvedSource, DynamicImage)> {
        let public_root = &self.config.paths.public_root;
        let stored = stored_sources(self.gateway, public_root, photo, scratch);
        self.decode_first(photo, stored, scratch).or_else(|| {
            let recovered = recovered_sources(self.gateway, public_root, photo);
            self.decode_first(photo, recovered, scratch)
        })
    }

    fn decode_first(
        &self,
        photo: &Photo,
        candidates: Vec<ResolvedSource>,
        scratch: &mut ScratchFiles,
    ) -> Option<(ResolvedSource, DynamicImage)> {
        for source in candidates {
            match decode_upload(self.backend, self.heic, &source.path, scratch) {
                Ok((image, _)) => return Some((source, image)),
                Err(e) => warn!(
                    photo_id = %photo.id,
                    source = ?source.kind,
                    path = %source.path.display(),
                    error = %e,
                    "Source unusable, trying the next one"
                ),
            }
        }
        None
    }

    /// Re-optimize every processed photo, one at a time.
    ///
    /// Records still waiting in the quick-upload queue are skipped.
    pub fn reoptimize_all(&mut self, overrides: Overrides) -> BatchReport {
        let ids: Vec<Uuid> = self
            .repo
            .all()
            .into_iter()
            .filter(|p| p.pending_upload.is_none())
            .map(|p| p.id)
            .collect();
        let mut report = BatchReport::default();
        for id in ids {
            let outcome = match self.reoptimize(id, overrides) {
                Ok(photo) => ItemOutcome::Succeeded(photo.id),
                Err(ReoptimizeError::PhotoNotFound(_)) => ItemOutcome::NotFound,
                Err(e) => {
                    error!(photo_id = %id, error = %e, "Re-optimization failed");
                    ItemOutcome::Error(e.to_string())
                }
            };
            report.push(id.to_string(), outcome);
        }
        info!(
            succeeded = report.succeeded(),
            failed = report.errors(),
            "Re-optimization finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::JsonCatalog;
    use crate::heic::tests::StubConverter;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::imaging::OutputFormat;
    use crate::photo::PhotoStatus;
    use crate::storage::tests::MemoryRemote;
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        config: Config,
        catalog: JsonCatalog,
        gateway: StorageGateway,
        backend: MockBackend,
        heic: StubConverter,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let mut config = Config::default();
            config.paths.public_root = tmp.path().join("public");
            config.paths.private_root = tmp.path().join("private");
            config.paths.catalog = tmp.path().join("catalog.json");
            config.images.max_resolution = 400;
            config.images.thumbnail_size = 100;
            let catalog = JsonCatalog::open(&config.paths.catalog).unwrap();
            let gateway = StorageGateway::local_only(&config.paths.private_root);
            Self {
                _tmp: tmp,
                config,
                catalog,
                gateway,
                backend: MockBackend::with_source(800, 600),
                heic: StubConverter { jpeg: None },
            }
        }

        fn write(root: &Path, relative: &str) {
            let path = root.join(relative);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, b"image").unwrap();
        }

        /// A processed draft whose files all exist on disk.
        fn add_photo(&mut self, slug: &str) -> Photo {
            let mut photo = Photo::new(slug, format!("{slug}.jpg"));
            let stem = rendition_stem(&photo);
            let original = format!("originals/{stem}.jpg");
            Self::write(&self.config.paths.private_root, &original);
            photo.original = Some(StorageLocation::Local(original.into()));
            photo.display_path = Some(format!("display/{stem}.avif"));
            photo.thumbnail_path = Some(format!("thumbnails/{stem}.webp"));
            photo.watermarked_path = Some(format!("watermarked/{stem}.webp"));
            for relative in photo.rendition_paths().unwrap() {
                Self::write(&self.config.paths.public_root, relative);
            }
            photo.width = Some(2000);
            photo.height = Some(1500);
            photo.file_hash = Some("f".repeat(64));
            photo.image_hash = Some("0123456789abcdef".into());
            photo.status = PhotoStatus::Draft;
            self.catalog.insert(photo.clone()).unwrap();
            photo
        }

        fn engine(&mut self) -> ReoptimizationEngine<'_, MockBackend, JsonCatalog> {
            ReoptimizationEngine::new(
                &self.config,
                &self.backend,
                &self.gateway,
                &mut self.catalog,
                &self.heic,
            )
        }

        /// Swap the photo's original for a `.heic` file of the same stem.
        fn make_heic_original(&mut self, photo: &mut Photo) {
            let original = format!("originals/{}.heic", rendition_stem(photo));
            Self::write(&self.config.paths.private_root, &original);
            photo.original = Some(StorageLocation::Local(original.into()));
            self.catalog.update(photo).unwrap();
        }

        fn public(&self, relative: &str) -> PathBuf {
            self.config.paths.public_root.join(relative)
        }

        fn decoded_paths(&self) -> Vec<String> {
            self.backend
                .get_operations()
                .into_iter()
                .filter_map(|op| match op {
                    RecordedOp::Decode(p) => Some(p),
                    _ => None,
                })
                .collect()
        }
    }

    fn resolve(fx: &Fixture, photo: &Photo) -> Option<SourceKind> {
        let mut scratch = ScratchFiles::default();
        resolve_source(&fx.gateway, &fx.config.paths.public_root, photo, &mut scratch)
            .map(|s| s.kind)
    }

    // =========================================================================
    // Source resolution
    // =========================================================================

    #[test]
    fn remote_original_wins_over_display() {
        let mut fx = Fixture::new();
        let remote = MemoryRemote::default();
        fx.gateway = StorageGateway::new(&fx.config.paths.private_root, Some(Box::new(remote.clone())));
        let mut photo = fx.add_photo("a");
        let upload = fx.config.paths.private_root.join(photo.original.as_ref().unwrap().to_string());
        let location = fx.gateway.put(&upload, "originals/a.jpg").unwrap();
        assert!(location.is_remote());
        photo.original = Some(location);

        assert_eq!(resolve(&fx, &photo), Some(SourceKind::RemoteOriginal));
    }

    #[test]
    fn unreachable_remote_falls_through_to_display() {
        let mut fx = Fixture::new();
        fx.gateway = StorageGateway::new(
            &fx.config.paths.private_root,
            Some(Box::new(MemoryRemote::unreachable())),
        );
        let mut photo = fx.add_photo("a");
        photo.original = Some(StorageLocation::Remote("originals/a.jpg".into()));
        assert_eq!(resolve(&fx, &photo), Some(SourceKind::Display));
    }

    #[test]
    fn chain_degrades_step_by_step() {
        let mut fx = Fixture::new();
        let photo = fx.add_photo("a");
        assert_eq!(resolve(&fx, &photo), Some(SourceKind::LocalOriginal));

        let mut without_original = photo.clone();
        without_original.original = None;
        assert_eq!(resolve(&fx, &without_original), Some(SourceKind::Display));

        std::fs::remove_file(fx.public(photo.display_path.as_deref().unwrap())).unwrap();
        assert_eq!(resolve(&fx, &without_original), Some(SourceKind::Watermarked));

        std::fs::remove_file(fx.public(photo.watermarked_path.as_deref().unwrap())).unwrap();
        // The original file is still on disk under its id fragment.
        assert_eq!(resolve(&fx, &without_original), Some(SourceKind::Recovered));

        let stem = rendition_stem(&photo);
        std::fs::remove_file(fx.config.paths.private_root.join(format!("originals/{stem}.jpg"))).unwrap();
        assert_eq!(resolve(&fx, &without_original), None);
    }

    #[test]
    fn recovery_scan_ignores_other_photos() {
        let mut fx = Fixture::new();
        let other = fx.add_photo("other");
        let mut lost = Photo::new("lost", "lost.jpg");
        lost.display_path = Some("display/gone.avif".into());
        assert_eq!(resolve(&fx, &lost), None);
        assert_eq!(resolve(&fx, &other), Some(SourceKind::LocalOriginal));
    }

    // =========================================================================
    // Re-optimization
    // =========================================================================

    #[test]
    fn reoptimize_regenerates_under_new_settings() {
        let mut fx = Fixture::new();
        let photo = fx.add_photo("sunset");
        let updated = fx
            .engine()
            .reoptimize(
                photo.id,
                Overrides {
                    max_resolution: Some(200),
                    quality: Some(60),
                },
            )
            .unwrap();

        assert_eq!((updated.width, updated.height), (Some(200), Some(150)));
        assert_eq!(updated.custom_max_resolution, Some(200));
        assert_eq!(updated.custom_quality, Some(60));
        assert_eq!(updated.status, PhotoStatus::Draft);
        assert_eq!(updated.file_hash, photo.file_hash);
        assert_eq!(updated.image_hash, photo.image_hash);
        assert_eq!(updated.original, photo.original);
        for relative in updated.rendition_paths().unwrap() {
            assert_eq!(std::fs::read(fx.public(relative)).unwrap(), b"mock");
        }
        assert_eq!(fx.catalog.get(photo.id).unwrap(), updated);

        let stem = rendition_stem(&photo);
        assert!(fx.decoded_paths()[0].ends_with(&format!("originals/{stem}.jpg")));
    }

    #[test]
    fn stale_renditions_in_other_formats_are_removed() {
        let mut fx = Fixture::new();
        let photo = fx.add_photo("a");
        fx.config.watermark.format = OutputFormat::Avif;
        let updated = fx.engine().reoptimize(photo.id, Overrides::default()).unwrap();

        let old = photo.watermarked_path.unwrap();
        let new = updated.watermarked_path.unwrap();
        assert!(new.ends_with(".avif"));
        assert!(fx.public(&new).is_file());
        assert!(!fx.public(&old).exists());
    }

    #[test]
    fn only_watermarked_rendition_survives() {
        let mut fx = Fixture::new();
        let mut photo = fx.add_photo("a");
        let stem = rendition_stem(&photo);
        std::fs::remove_file(fx.config.paths.private_root.join(format!("originals/{stem}.jpg"))).unwrap();
        photo.original = None;
        std::fs::remove_file(fx.public(photo.display_path.as_deref().unwrap())).unwrap();
        std::fs::remove_file(fx.public(photo.thumbnail_path.as_deref().unwrap())).unwrap();
        fx.catalog.update(&photo).unwrap();

        let updated = fx.engine().reoptimize(photo.id, Overrides::default()).unwrap();
        for relative in updated.rendition_paths().unwrap() {
            assert!(fx.public(relative).is_file());
        }
        assert_eq!(updated.file_hash, photo.file_hash);
        assert!(fx.decoded_paths()[0].contains("watermarked"));
    }

    #[test]
    fn heic_original_is_converted_before_decoding() {
        let mut fx = Fixture::new();
        let mut photo = fx.add_photo("night");
        fx.make_heic_original(&mut photo);
        fx.heic = StubConverter {
            jpeg: Some(b"jpeg".to_vec()),
        };

        let updated = fx.engine().reoptimize(photo.id, Overrides::default()).unwrap();
        assert_eq!(updated.original, photo.original);
        let decoded = fx.decoded_paths();
        assert_eq!(decoded.len(), 1);
        assert!(decoded[0].ends_with(".jpg"));
        assert!(decoded[0].contains("darkroom-"));
        assert!(!Path::new(&decoded[0]).exists());
    }

    #[test]
    fn unconvertible_original_falls_through_to_display() {
        let mut fx = Fixture::new();
        let mut photo = fx.add_photo("night");
        fx.make_heic_original(&mut photo);

        let updated = fx.engine().reoptimize(photo.id, Overrides::default()).unwrap();
        let decoded = fx.decoded_paths();
        assert_eq!(decoded.len(), 1);
        assert!(decoded[0].ends_with(photo.display_path.as_deref().unwrap()));
        for relative in updated.rendition_paths().unwrap() {
            assert!(fx.public(relative).is_file());
        }
    }

    #[test]
    fn no_source_leaves_photo_untouched() {
        let mut fx = Fixture::new();
        let mut photo = Photo::new("ghost", "ghost.jpg");
        photo.display_path = Some("display/ghost.avif".into());
        fx.catalog.insert(photo.clone()).unwrap();

        let result = fx.engine().reoptimize(photo.id, Overrides::default());
        assert!(matches!(result, Err(ReoptimizeError::NoSource(_))));
        assert_eq!(fx.catalog.get(photo.id).unwrap(), photo);
        assert!(fx.backend.get_operations().is_empty());
    }

    #[test]
    fn downloaded_source_is_cleaned_up() {
        let mut fx = Fixture::new();
        let remote = MemoryRemote::default();
        fx.gateway = StorageGateway::new(&fx.config.paths.private_root, Some(Box::new(remote.clone())));
        let mut photo = fx.add_photo("a");
        let local = fx.config.paths.private_root.join(photo.original.as_ref().unwrap().to_string());
        photo.original = fx.gateway.put(&local, "originals/a.jpg");
        fx.catalog.update(&photo).unwrap();

        fx.engine().reoptimize(photo.id, Overrides::default()).unwrap();
        let decoded = fx.decoded_paths();
        assert!(decoded[0].contains("darkroom-fetch-"));
        assert!(!Path::new(&decoded[0]).exists());
    }

    #[test]
    fn reoptimize_all_continues_past_failures() {
        let mut fx = Fixture::new();
        fx.add_photo("good");
        let broken = Photo::new("broken", "broken.jpg");
        fx.catalog.insert(broken.clone()).unwrap();
        let mut queued = Photo::new("queued", "queued.jpg");
        queued.pending_upload = Some("pending/q.jpg".into());
        fx.catalog.insert(queued).unwrap();

        let report = fx.engine().reoptimize_all(Overrides::default());
        assert_eq!(report.items.len(), 2);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.errors(), 1);
        let failed = report
            .items
            .iter()
            .find(|i| matches!(i.outcome, ItemOutcome::Error(_)))
            .unwrap();
        assert_eq!(failed.item, broken.id.to_string());
    }

    #[test]
    fn unknown_photo_is_not_found() {
        let mut fx = Fixture::new();
        assert!(matches!(
            fx.engine().reoptimize(Uuid::new_v4(), Overrides::default()),
            Err(ReoptimizeError::PhotoNotFound(_))
        ));
    }

    // =========================================================================
    // Deletion
    // =========================================================================

    #[test]
    fn delete_removes_renditions_and_original() {
        let mut fx = Fixture::new();
        let photo = fx.add_photo("a");
        let removed = delete_photo(
            &mut fx.catalog,
            &fx.gateway,
            &fx.config.paths.public_root,
            photo.id,
            false,
        )
        .unwrap();

        assert_eq!(removed.id, photo.id);
        assert!(fx.catalog.is_empty());
        for relative in photo.rendition_paths().unwrap() {
            assert!(!fx.public(relative).exists());
        }
        assert!(!fx.gateway.exists(photo.original.as_ref().unwrap()));
    }

    #[test]
    fn delete_can_keep_original() {
        let mut fx = Fixture::new();
        let photo = fx.add_photo("a");
        let count = delete_photo_files(&fx.gateway, &fx.config.paths.public_root, &photo, true);
        assert_eq!(count, 3);
        assert!(fx.gateway.exists(photo.original.as_ref().unwrap()));
    }
}
