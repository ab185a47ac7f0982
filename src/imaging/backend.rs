//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the pipeline needs
//! from a codec layer: decode and encode. Everything above it
//! (sizing, watermarking, file naming) works on decoded [`DynamicImage`]s and
//! never touches a codec directly.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend): pure Rust decoders, rav1e
//! for AVIF and libwebp for lossy WebP.

use super::params::EncodeParams;
use image::DynamicImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },
    #[error("Failed to encode {path}: {reason}")]
    Encode { path: String, reason: String },
}

impl ImagingError {
    pub(crate) fn decode(path: &Path, reason: impl std::fmt::Display) -> Self {
        Self::Decode {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn encode(path: &Path, reason: impl std::fmt::Display) -> Self {
        Self::Encode {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Trait for image codec backends.
pub trait ImageBackend {
    /// Decode an image, applying its EXIF orientation.
    fn decode(&self, path: &Path) -> Result<DynamicImage, ImagingError>;

    /// Encode `img` and write it to `params.output`.
    ///
    /// Implementations must never leave a partially written file at the
    /// output path.
    fn encode(&self, img: &DynamicImage, params: &EncodeParams) -> Result<(), ImagingError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::params::{OutputFormat, Quality};
    use image::RgbImage;
    use std::sync::Mutex;

    /// Mock backend that records encodes without running any codec.
    ///
    /// `decode` hands out a synthetic gradient of the configured size.
    pub struct MockBackend {
        pub width: u32,
        pub height: u32,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Decode(String),
        Encode {
            output: String,
            format: OutputFormat,
            width: u32,
            height: u32,
            quality: u32,
        },
    }

    impl MockBackend {
        pub fn with_source(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                operations: Mutex::new(Vec::new()),
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        pub fn encodes(&self) -> Vec<RecordedOp> {
            self.get_operations()
                .into_iter()
                .filter(|op| matches!(op, RecordedOp::Encode { .. }))
                .collect()
        }
    }

    impl ImageBackend for MockBackend {
        fn decode(&self, path: &Path) -> Result<DynamicImage, ImagingError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Decode(path.to_string_lossy().to_string()));
            Ok(DynamicImage::ImageRgb8(RgbImage::from_fn(
                self.width,
                self.height,
                |x, y| image::Rgb([(x % 256) as u8, (y % 256) as u8, 128]),
            )))
        }

        fn encode(&self, img: &DynamicImage, params: &EncodeParams) -> Result<(), ImagingError> {
            self.operations.lock().unwrap().push(RecordedOp::Encode {
                output: params.output.to_string_lossy().to_string(),
                format: params.format,
                width: img.width(),
                height: img.height(),
                quality: params.quality.value(),
            });
            if let Some(parent) = params.output.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&params.output, b"mock")?;
            Ok(())
        }
    }

    #[test]
    fn mock_records_encode() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = MockBackend::with_source(40, 30);
        let img = backend.decode(Path::new("/src.jpg")).unwrap();

        backend
            .encode(
                &img,
                &EncodeParams {
                    output: tmp.path().join("out.avif"),
                    format: OutputFormat::Avif,
                    quality: Quality::new(70),
                },
            )
            .unwrap();

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 2);
        assert!(matches!(&ops[0], RecordedOp::Decode(p) if p == "/src.jpg"));
        assert!(matches!(
            &ops[1],
            RecordedOp::Encode {
                format: OutputFormat::Avif,
                width: 40,
                height: 30,
                quality: 70,
                ..
            }
        ));
    }
}
