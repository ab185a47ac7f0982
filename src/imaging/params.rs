//! Parameter types for rendition encoding.
//!
//! These structs describe *what* to produce, not *how* to produce it. They are
//! the interface between [`renditions`](super::renditions) (which decides what
//! files to create) and the [`backend`](super::backend) (which does the pixel
//! and codec work), so a mock backend can stand in during tests.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100). Clamped on construction.
//! - [`OutputFormat`]: AVIF or WebP, with the file extension each one uses.
//! - [`RenditionKind`]: display, thumbnail or watermarked, with its storage directory.
//! - [`EncodeParams`]: Full specification for one encode: output path, format, quality.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// Encoded output format of a rendition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Avif,
    Webp,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Avif => "avif",
            Self::Webp => "webp",
        }
    }
}

/// The three derived renditions every processed photo carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenditionKind {
    Display,
    Thumbnail,
    Watermarked,
}

impl RenditionKind {
    /// Directory (relative to the public root) the rendition is stored under.
    pub fn directory(self) -> &'static str {
        match self {
            Self::Display => "display",
            Self::Thumbnail => "thumbnails",
            Self::Watermarked => "watermarked",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Display => "display",
            Self::Thumbnail => "thumbnail",
            Self::Watermarked => "watermarked",
        }
    }
}

/// Parameters for a single encode-and-write operation.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeParams {
    pub output: PathBuf,
    pub format: OutputFormat,
    pub quality: Quality,
}
