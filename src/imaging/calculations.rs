//! Pure calculation functions for rendition sizing and encoder quality.
//!
//! All functions here are pure and testable without any I/O or images.

/// Lowest AVIF quality any rendition is encoded at.
pub const AVIF_QUALITY_MIN: u32 = 65;
/// Highest AVIF quality any rendition is encoded at.
pub const AVIF_QUALITY_MAX: u32 = 85;

/// Calculate the dimensions of an image constrained to `max_dimension`.
///
/// Landscape and square sources (`width >= height`) are constrained by width,
/// portrait sources by height. The aspect ratio is preserved and images are
/// never upscaled: a source already within the limit is returned unchanged.
///
/// # Examples
/// ```
/// # use darkroom::imaging::fit_within;
/// // 4000x3000 landscape into 2000 → 2000x1500
/// assert_eq!(fit_within((4000, 3000), 2000), (2000, 1500));
///
/// // 3000x4000 portrait into 2000 → 1500x2000
/// assert_eq!(fit_within((3000, 4000), 2000), (1500, 2000));
///
/// // Already small enough → unchanged
/// assert_eq!(fit_within((800, 600), 2000), (800, 600));
/// ```
pub fn fit_within(source: (u32, u32), max_dimension: u32) -> (u32, u32) {
    let (w, h) = source;
    if w == 0 || h == 0 || max_dimension == 0 {
        return (w, h);
    }

    if w >= h {
        if w <= max_dimension {
            return (w, h);
        }
        let ratio = max_dimension as f64 / w as f64;
        (max_dimension, ((h as f64 * ratio).round() as u32).max(1))
    } else {
        if h <= max_dimension {
            return (w, h);
        }
        let ratio = max_dimension as f64 / h as f64;
        (((w as f64 * ratio).round() as u32).max(1), max_dimension)
    }
}

/// Map a WebP-equivalent quality setting onto the AVIF quality scale.
///
/// `70 + ((webp - 80) / 20) * 15`, clamped to
/// [`AVIF_QUALITY_MIN`]..=[`AVIF_QUALITY_MAX`]. AVIF reaches the same visual
/// quality at lower numbers than WebP, and the narrow band keeps display
/// renditions free of blocking without ballooning file size.
///
/// # Examples
/// ```
/// # use darkroom::imaging::webp_quality_to_avif;
/// assert_eq!(webp_quality_to_avif(80), 70);
/// assert_eq!(webp_quality_to_avif(90), 78);
/// assert_eq!(webp_quality_to_avif(100), 85);
/// assert_eq!(webp_quality_to_avif(10), 65);
/// ```
pub fn webp_quality_to_avif(webp_quality: u32) -> u32 {
    let mapped = 70.0 + ((webp_quality as f64 - 80.0) / 20.0) * 15.0;
    (mapped.round() as i64).clamp(AVIF_QUALITY_MIN as i64, AVIF_QUALITY_MAX as i64) as u32
}
