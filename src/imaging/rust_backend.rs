//! Pure Rust codec backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, TIFF, WebP) | `image` crate, EXIF orientation applied |
//! | Decode (AVIF) | `avif-parse` (container) + `rav1d` (AV1 decode) + BT.601 YUV→RGB |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |
//! | Encode → WebP (lossy) | `webp` (libwebp) |
//!
//! Every encode goes to a temporary file in the destination directory and is
//! renamed into place, so readers never observe a half-written rendition.

use super::backend::{ImageBackend, ImagingError};
use super::params::{EncodeParams, OutputFormat};
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader};
use std::io::Write;
use std::path::Path;

/// AV1 encoder speed (0 = slowest/best, 10 = fastest).
const AVIF_SPEED: u8 = 6;

/// Pure Rust backend using the `image` crate ecosystem.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn is_avif(path: &Path) -> bool {
    if path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("avif"))
    {
        return true;
    }
    // Extension-less temp files: sniff the ISOBMFF brand.
    let mut head = [0u8; 12];
    std::fs::File::open(path)
        .and_then(|mut f| std::io::Read::read_exact(&mut f, &mut head))
        .is_ok_and(|_| &head[4..8] == b"ftyp" && (&head[8..12] == b"avif" || &head[8..12] == b"avis"))
}

/// Decode a non-AVIF image and rotate/flip it upright.
fn load_oriented(path: &Path) -> Result<DynamicImage, ImagingError> {
    let mut decoder = ImageReader::open(path)?
        .with_guessed_format()?
        .into_decoder()
        .map_err(|e| ImagingError::decode(path, e))?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let mut img = DynamicImage::from_decoder(decoder).map_err(|e| ImagingError::decode(path, e))?;
    img.apply_orientation(orientation);
    Ok(img)
}

/// Decode an AVIF file using avif-parse (container) + rav1d (AV1 decode).
///
/// The `image` crate's `"avif"` feature only provides the encoder; decoding
/// through it would need the C dav1d library.
fn decode_avif(path: &Path) -> Result<DynamicImage, ImagingError> {
    let file_data = std::fs::read(path)?;
    let avif = avif_parse::read_avif(&mut std::io::Cursor::new(&file_data))
        .map_err(|e| ImagingError::decode(path, format!("{e:?}")))?;
    let (width, height, rgb) =
        decode_av1_frame(&avif.primary_item).map_err(|reason| ImagingError::decode(path, reason))?;
    image::RgbImage::from_raw(width, height, rgb)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| ImagingError::decode(path, "decoded AV1 frame has unexpected size"))
}

/// Run one AV1 frame through rav1d and return it as interleaved RGB8.
fn decode_av1_frame(av1_bytes: &[u8]) -> Result<(u32, u32, Vec<u8>), String> {
    use rav1d::include::dav1d::data::Dav1dData;
    use rav1d::include::dav1d::dav1d::Dav1dSettings;
    use rav1d::include::dav1d::headers::{
        DAV1D_PIXEL_LAYOUT_I400, DAV1D_PIXEL_LAYOUT_I420, DAV1D_PIXEL_LAYOUT_I422,
        DAV1D_PIXEL_LAYOUT_I444,
    };
    use rav1d::include::dav1d::picture::Dav1dPicture;
    use rav1d::src::lib as dav1d;
    use std::ptr::NonNull;

    let mut settings = std::mem::MaybeUninit::<Dav1dSettings>::uninit();
    let settings_ptr = NonNull::new(settings.as_mut_ptr()).ok_or("null settings pointer")?;
    unsafe { dav1d::dav1d_default_settings(settings_ptr) };
    let mut settings = unsafe { settings.assume_init() };
    settings.n_threads = 1;
    settings.max_frame_delay = 1;

    let mut ctx = None;
    let rc = unsafe { dav1d::dav1d_open(NonNull::new(&mut ctx), NonNull::new(&mut settings)) };
    if rc.0 != 0 {
        return Err(format!("rav1d open failed ({})", rc.0));
    }

    let mut data = Dav1dData::default();
    let buf_ptr = unsafe { dav1d::dav1d_data_create(NonNull::new(&mut data), av1_bytes.len()) };
    if buf_ptr.is_null() {
        unsafe { dav1d::dav1d_close(NonNull::new(&mut ctx)) };
        return Err("rav1d data_create failed".into());
    }
    unsafe { std::ptr::copy_nonoverlapping(av1_bytes.as_ptr(), buf_ptr, av1_bytes.len()) };

    let rc = unsafe { dav1d::dav1d_send_data(ctx, NonNull::new(&mut data)) };
    if rc.0 != 0 {
        unsafe {
            dav1d::dav1d_data_unref(NonNull::new(&mut data));
            dav1d::dav1d_close(NonNull::new(&mut ctx));
        }
        return Err(format!("rav1d send_data failed ({})", rc.0));
    }

    let mut pic: Dav1dPicture = unsafe { std::mem::zeroed() };
    let rc = unsafe { dav1d::dav1d_get_picture(ctx, NonNull::new(&mut pic)) };
    if rc.0 != 0 {
        unsafe { dav1d::dav1d_close(NonNull::new(&mut ctx)) };
        return Err(format!("rav1d get_picture failed ({})", rc.0));
    }

    let width = pic.p.w as u32;
    let height = pic.p.h as u32;
    let layout = pic.p.layout;
    let subsampling = match layout {
        DAV1D_PIXEL_LAYOUT_I400 => Some(None),
        DAV1D_PIXEL_LAYOUT_I420 => Some(Some((true, true))),
        DAV1D_PIXEL_LAYOUT_I422 => Some(Some((true, false))),
        DAV1D_PIXEL_LAYOUT_I444 => Some(Some((false, false))),
        _ => None,
    };

    let rgb = match (subsampling, pic.data[0]) {
        (Some(chroma), Some(y_plane)) => {
            let y_ptr = y_plane.as_ptr() as *const u8;
            let chroma_planes = match (chroma, pic.data[1], pic.data[2]) {
                (None, _, _) => Some((y_ptr, y_ptr, 0, (false, false), true)),
                (Some(ss), Some(u), Some(v)) => Some((
                    u.as_ptr() as *const u8,
                    v.as_ptr() as *const u8,
                    pic.stride[1],
                    ss,
                    false,
                )),
                _ => None,
            };
            chroma_planes.map(|(u_ptr, v_ptr, uv_stride, (ss_x, ss_y), monochrome)| {
                YuvPlanes {
                    y_ptr,
                    u_ptr,
                    v_ptr,
                    y_stride: pic.stride[0],
                    uv_stride,
                    width,
                    height,
                    bpc: pic.p.bpc as u32,
                    ss_x,
                    ss_y,
                    monochrome,
                }
                .to_rgb()
            })
        }
        _ => None,
    };

    unsafe {
        dav1d::dav1d_picture_unref(NonNull::new(&mut pic));
        dav1d::dav1d_close(NonNull::new(&mut ctx));
    }

    rgb.map(|rgb| (width, height, rgb))
        .ok_or_else(|| format!("unsupported AVIF pixel layout: {layout}"))
}

/// Decoded YUV plane data from rav1d, ready for RGB conversion.
struct YuvPlanes {
    y_ptr: *const u8,
    u_ptr: *const u8,
    v_ptr: *const u8,
    y_stride: isize,
    uv_stride: isize,
    width: u32,
    height: u32,
    bpc: u32,
    ss_x: bool,
    ss_y: bool,
    monochrome: bool,
}

impl YuvPlanes {
    /// Convert YUV planes to interleaved RGB8 using BT.601 coefficients.
    fn to_rgb(&self) -> Vec<u8> {
        let max_val = ((1u32 << self.bpc) - 1) as f32;
        let center = (1u32 << (self.bpc - 1)) as f32;
        let scale = 255.0 / max_val;

        let mut rgb = Vec::with_capacity((self.width * self.height * 3) as usize);
        for row in 0..self.height {
            for col in 0..self.width {
                let luma = read_sample(self.y_ptr, self.y_stride, col, row, self.bpc);
                if self.monochrome {
                    let v = (luma * scale).clamp(0.0, 255.0) as u8;
                    rgb.extend_from_slice(&[v, v, v]);
                    continue;
                }
                let cx = if self.ss_x { col / 2 } else { col };
                let cy = if self.ss_y { row / 2 } else { row };
                let cb = read_sample(self.u_ptr, self.uv_stride, cx, cy, self.bpc) - center;
                let cr = read_sample(self.v_ptr, self.uv_stride, cx, cy, self.bpc) - center;
                rgb.extend_from_slice(&[
                    ((luma + 1.402 * cr) * scale).clamp(0.0, 255.0) as u8,
                    ((luma - 0.344136 * cb - 0.714136 * cr) * scale).clamp(0.0, 255.0) as u8,
                    ((luma + 1.772 * cb) * scale).clamp(0.0, 255.0) as u8,
                ]);
            }
        }
        rgb
    }
}

/// Read one plane sample, handling both 8-bit and 16-bit storage.
#[inline]
fn read_sample(ptr: *const u8, stride: isize, x: u32, y: u32, bpc: u32) -> f32 {
    if bpc <= 8 {
        (unsafe { *ptr.offset(y as isize * stride + x as isize) }) as f32
    } else {
        let byte_offset = y as isize * stride + x as isize * 2;
        (unsafe { std::ptr::read_unaligned(ptr.offset(byte_offset) as *const u16) }) as f32
    }
}

/// Write the output of `encode` to a sibling temp file, then rename it over `output`.
fn write_atomically(
    output: &Path,
    encode: impl FnOnce(&mut std::fs::File) -> Result<(), ImagingError>,
) -> Result<(), ImagingError> {
    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut staged = tempfile::NamedTempFile::new_in(dir)?;
    encode(staged.as_file_mut())?;
    staged.as_file_mut().flush()?;
    staged
        .persist(output)
        .map_err(|e| ImagingError::Io(e.error))?;
    Ok(())
}

fn encode_avif(
    img: &DynamicImage,
    file: &mut std::fs::File,
    output: &Path,
    quality: u8,
) -> Result<(), ImagingError> {
    let pixels = if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    };
    let encoder = image::codecs::avif::AvifEncoder::new_with_speed_quality(
        std::io::BufWriter::new(file),
        AVIF_SPEED,
        quality,
    );
    pixels
        .write_with_encoder(encoder)
        .map_err(|e| ImagingError::encode(output, e))
}

fn encode_webp(
    img: &DynamicImage,
    file: &mut std::fs::File,
    quality: f32,
) -> Result<(), ImagingError> {
    let encoded = if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height()).encode(quality)
    } else {
        let rgb = img.to_rgb8();
        webp::Encoder::from_rgb(rgb.as_raw(), rgb.width(), rgb.height()).encode(quality)
    };
    file.write_all(&encoded)?;
    Ok(())
}

impl ImageBackend for RustBackend {
    fn decode(&self, path: &Path) -> Result<DynamicImage, ImagingError> {
        if is_avif(path) {
            return decode_avif(path);
        }
        load_oriented(path)
    }

    fn encode(&self, img: &DynamicImage, params: &EncodeParams) -> Result<(), ImagingError> {
        let quality = params.quality.value();
        write_atomically(&params.output, |file| match params.format {
            OutputFormat::Avif => encode_avif(img, file, &params.output, quality as u8),
            OutputFormat::Webp => encode_webp(img, file, quality as f32),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::Quality;
    use image::{ImageEncoder, RgbImage};

    /// Create a small valid JPEG file with the given dimensions.
    fn create_test_jpeg(path: &Path, width: u32, height: u32) {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let file = std::fs::File::create(path).unwrap();
        let writer = std::io::BufWriter::new(file);
        image::codecs::jpeg::JpegEncoder::new(writer)
            .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
            .unwrap();
    }

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }))
    }

    #[test]
    fn decode_synthetic_jpeg() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("test.jpg");
        create_test_jpeg(&path, 200, 150);

        let img = RustBackend::new().decode(&path).unwrap();
        assert_eq!((img.width(), img.height()), (200, 150));
    }

    #[test]
    fn decode_nonexistent_file_errors() {
        let result = RustBackend::new().decode(Path::new("/nonexistent/image.jpg"));
        assert!(result.is_err());
    }

    #[test]
    fn decode_garbage_is_a_decode_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not an image").unwrap();

        let result = RustBackend::new().decode(&path);
        assert!(matches!(result, Err(ImagingError::Decode { .. })));
    }

    #[test]
    fn encode_webp_writes_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let output = tmp.path().join("thumbs/out.webp");

        RustBackend::new()
            .encode(
                &gradient(64, 48),
                &EncodeParams {
                    output: output.clone(),
                    format: OutputFormat::Webp,
                    quality: Quality::new(80),
                },
            )
            .unwrap();

        let decoded = image::open(&output).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn encode_leaves_no_staging_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        let output = tmp.path().join("out.webp");

        RustBackend::new()
            .encode(
                &gradient(16, 16),
                &EncodeParams {
                    output: output.clone(),
                    format: OutputFormat::Webp,
                    quality: Quality::new(80),
                },
            )
            .unwrap();

        let entries: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn avif_encode_decode_roundtrip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("test.avif");
        let backend = RustBackend::new();

        backend
            .encode(
                &gradient(64, 48),
                &EncodeParams {
                    output: path.clone(),
                    format: OutputFormat::Avif,
                    quality: Quality::new(75),
                },
            )
            .unwrap();

        let decoded = backend.decode(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn avif_detected_without_extension() {
        let tmp = tempfile::TempDir::new().unwrap();
        let named = tmp.path().join("x.avif");
        RustBackend::new()
            .encode(
                &gradient(8, 8),
                &EncodeParams {
                    output: named.clone(),
                    format: OutputFormat::Avif,
                    quality: Quality::new(75),
                },
            )
            .unwrap();
        let bare = tmp.path().join("download");
        std::fs::copy(&named, &bare).unwrap();

        assert!(is_avif(&bare));
        assert!(!is_avif(Path::new("/nonexistent")));
    }
}
