//! Image processing: decoding, sizing, watermarking and encoding.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify / decode** | `image` (EXIF-oriented), `avif-parse` + `rav1d` for AVIF |
//! | **Resize** | Lanczos3, long edge constrained by [`fit_within`] |
//! | **Display → AVIF** | rav1e at [`webp_quality_to_avif`] |
//! | **Thumbnail → WebP** | libwebp, lossy |
//! | **Watermark** | `imageproc` text drawing, `imageops::overlay` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension and quality math (unit testable)
//! - **Parameters**: Data structures describing encodes
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Watermark**: Anchor layout and compositing
//! - **Renditions**: The display/thumbnail/watermarked set built from one source

pub mod backend;
mod calculations;
mod params;
pub mod renditions;
pub mod rust_backend;
pub mod watermark;

pub use backend::{ImageBackend, ImagingError};
pub use calculations::{AVIF_QUALITY_MAX, AVIF_QUALITY_MIN, fit_within, webp_quality_to_avif};
pub use params::{EncodeParams, OutputFormat, Quality, RenditionKind};
pub use renditions::{RenditionSet, generate_renditions, rendition_path};
pub use rust_backend::RustBackend;
pub use watermark::{Position, Watermark};
