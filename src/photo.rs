//! The photo record and its storage locations.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Lifecycle state of a photo.
///
/// `Processing` records are mid-pipeline (or waiting in the quick-upload
/// queue); `Draft` records have all three renditions; `Published` is only
/// ever set from outside the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoStatus {
    #[default]
    Processing,
    Draft,
    Published,
}

/// Which storage tier holds an object, and under what name.
///
/// Local locations are relative to the private root; remote locations are
/// object keys in the configured bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "tier", content = "path", rename_all = "lowercase")]
pub enum StorageLocation {
    Local(PathBuf),
    Remote(String),
}

impl StorageLocation {
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

impl std::fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(key) => write!(f, "remote:{key}"),
        }
    }
}

/// Camera and capture metadata read from EXIF.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExifData {
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    /// Shutter speed as written by the camera, e.g. `1/250`.
    pub exposure_time: Option<String>,
    pub f_number: Option<f64>,
    pub iso: Option<u32>,
    /// Millimetres.
    pub focal_length: Option<f64>,
    pub lens: Option<String>,
    pub taken_at: Option<NaiveDateTime>,
}

impl ExifData {
    /// True when no field was found.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A photo managed by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub original_filename: String,
    /// `None` when originals are discarded after processing.
    #[serde(default)]
    pub original: Option<StorageLocation>,
    #[serde(default)]
    pub display_path: Option<String>,
    #[serde(default)]
    pub thumbnail_path: Option<String>,
    #[serde(default)]
    pub watermarked_path: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub original_width: Option<u32>,
    #[serde(default)]
    pub original_height: Option<u32>,
    #[serde(default)]
    pub file_hash: Option<String>,
    #[serde(default)]
    pub image_hash: Option<String>,
    #[serde(default)]
    pub exif: ExifData,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub location_name: Option<String>,
    pub status: PhotoStatus,
    #[serde(default)]
    pub custom_max_resolution: Option<u32>,
    #[serde(default)]
    pub custom_quality: Option<u32>,
    /// Raw upload waiting for deferred processing.
    #[serde(default)]
    pub pending_upload: Option<PathBuf>,
}

impl Photo {
    /// A fresh record in the `Processing` state.
    pub fn new(slug: impl Into<String>, original_filename: impl Into<String>) -> Self {
        let original_filename = original_filename.into();
        let title = title_from_filename(&original_filename);
        Self {
            id: Uuid::new_v4(),
            slug: slug.into(),
            title,
            description: None,
            category: None,
            original_filename,
            original: None,
            display_path: None,
            thumbnail_path: None,
            watermarked_path: None,
            width: None,
            height: None,
            original_width: None,
            original_height: None,
            file_hash: None,
            image_hash: None,
            exif: ExifData::default(),
            latitude: None,
            longitude: None,
            location_name: None,
            status: PhotoStatus::Processing,
            custom_max_resolution: None,
            custom_quality: None,
            pending_upload: None,
        }
    }

    /// All three rendition paths, when the photo is fully processed.
    pub fn rendition_paths(&self) -> Option<[&str; 3]> {
        Some([
            self.display_path.as_deref()?,
            self.thumbnail_path.as_deref()?,
            self.watermarked_path.as_deref()?,
        ])
    }

    /// The first 8 hex digits of the id, used in file stems.
    pub fn id_fragment(&self) -> String {
        self.id.simple().to_string()[..8].to_string()
    }
}

/// Human-readable title from an upload filename: `summer_beach-01.jpg` → `Summer Beach 01`.
pub fn title_from_filename(filename: &str) -> String {
    let stem = std::path::Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    stem.split(['_', '-', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
