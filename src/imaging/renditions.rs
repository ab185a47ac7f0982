//! Rendition generation.
//!
//! One decoded source produces three files under the public root:
//!
//! | Rendition | Size | Format / quality |
//! |---|---|---|
//! | `display/{stem}.avif` | long edge ≤ `max_resolution` | AVIF at [`webp_quality_to_avif`]`(quality)` |
//! | `thumbnails/{stem}.webp` | long edge ≤ `thumbnail_size` | WebP at `thumbnail_quality` |
//! | `watermarked/{stem}.{avif,webp}` | same as display | configured format, watermark composited |
//!
//! The watermarked rendition always exists: without a usable watermark it is
//! an unmarked copy of the display image.

use super::backend::{ImageBackend, ImagingError};
use super::calculations::{fit_within, webp_quality_to_avif};
use super::params::{EncodeParams, OutputFormat, Quality, RenditionKind};
use super::watermark::Watermark;
use crate::config::RenditionSettings;
use image::DynamicImage;
use image::imageops::FilterType;
use std::path::Path;
use tracing::debug;

/// Relative paths and display dimensions of a freshly generated set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenditionSet {
    pub display_path: String,
    pub thumbnail_path: String,
    pub watermarked_path: String,
    pub width: u32,
    pub height: u32,
}

/// Relative storage path of a rendition, e.g. `display/sunset.avif`.
pub fn rendition_path(kind: RenditionKind, stem: &str, format: OutputFormat) -> String {
    format!("{}/{}.{}", kind.directory(), stem, format.extension())
}

fn resized(source: &DynamicImage, max_dimension: u32) -> DynamicImage {
    let (w, h) = fit_within((source.width(), source.height()), max_dimension);
    if (w, h) == (source.width(), source.height()) {
        source.clone()
    } else {
        source.resize_exact(w, h, FilterType::Lanczos3)
    }
}

/// Encode all three renditions of `source` below `public_root`.
///
/// Any encode failure aborts the whole set; files already written by this
/// call are left for the caller to clean up or overwrite.
pub fn generate_renditions(
    backend: &impl ImageBackend,
    source: &DynamicImage,
    public_root: &Path,
    stem: &str,
    settings: &RenditionSettings,
    watermark: Option<&Watermark>,
) -> Result<RenditionSet, ImagingError> {
    let display_img = resized(source, settings.max_resolution);
    let display_path = rendition_path(RenditionKind::Display, stem, OutputFormat::Avif);
    backend.encode(
        &display_img,
        &EncodeParams {
            output: public_root.join(&display_path),
            format: OutputFormat::Avif,
            quality: Quality::new(webp_quality_to_avif(settings.quality.value())),
        },
    )?;
    debug!(path = %display_path, width = display_img.width(), height = display_img.height(), "Wrote display rendition");

    let thumbnail = resized(&display_img, settings.thumbnail_size);
    let thumbnail_path = rendition_path(RenditionKind::Thumbnail, stem, OutputFormat::Webp);
    backend.encode(
        &thumbnail,
        &EncodeParams {
            output: public_root.join(&thumbnail_path),
            format: OutputFormat::Webp,
            quality: settings.thumbnail_quality,
        },
    )?;
    debug!(path = %thumbnail_path, "Wrote thumbnail rendition");

    let marked = match watermark {
        Some(mark) => mark.apply(&display_img),
        None => display_img.clone(),
    };
    let format = settings.watermark_format;
    let quality = match format {
        OutputFormat::Avif => Quality::new(webp_quality_to_avif(settings.quality.value())),
        OutputFormat::Webp => settings.quality,
    };
    let watermarked_path = rendition_path(RenditionKind::Watermarked, stem, format);
    backend.encode(
        &marked,
        &EncodeParams {
            output: public_root.join(&watermarked_path),
            format,
            quality,
        },
    )?;
    debug!(path = %watermarked_path, watermarked = watermark.is_some(), "Wrote watermarked rendition");

    Ok(RenditionSet {
        display_path,
        thumbnail_path,
        watermarked_path,
        width: display_img.width(),
        height: display_img.height(),
    })
}
