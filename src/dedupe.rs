//! Duplicate detection.
//!
//! Two keys identify a photo's content:
//!
//! - **`file_hash`**: SHA-256 of the file bytes. Identical uploads match
//!   exactly.
//! - **`image_hash`**: a 64-bit difference hash (dHash) of the picture. It
//!   survives re-encoding, resizing and mild recompression, so near-identical
//!   uploads land within a small Hamming distance of each other.
//!
//! ## dHash
//!
//! The image is converted to grayscale and resized to 9×8. For each row `y`
//! and column `x` in `0..8`, bit `(y, x)` is set when pixel `(x, y)` is darker
//! than pixel `(x + 1, y)`. Bits are packed row-major, most significant
//! first, and written as 16 lowercase hex digits.
//!
//! [`find_duplicate`] scans every stored perceptual hash linearly. That is
//! fine for a portfolio (thousands of photos); a much larger corpus would
//! want an index such as a BK-tree.

use crate::catalog::PhotoRepository;
use crate::heic::HeicConverter;
use crate::imaging::ImageBackend;
use crate::ingest::{ScratchFiles, decode_upload};
use image::imageops::FilterType;
use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Returned by [`hamming_distance`] for hashes that cannot be compared.
pub const MAX_DISTANCE: u32 = u32::MAX;

/// SHA-256 hash of a file's contents, returned as a hex string.
///
/// The file is streamed through the hasher, never held in memory whole.
pub fn file_hash(path: &Path) -> io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Difference hash of a decoded image.
pub fn dhash(img: &image::DynamicImage) -> String {
    let small = img.grayscale().resize_exact(9, 8, FilterType::Triangle).to_luma8();
    let mut bits: u64 = 0;
    for y in 0..8 {
        for x in 0..8 {
            bits <<= 1;
            if small.get_pixel(x, y)[0] < small.get_pixel(x + 1, y)[0] {
                bits |= 1;
            }
        }
    }
    format!("{bits:016x}")
}

/// Perceptual hash of the image at `path`, or `None` if it cannot be decoded.
///
/// HEIC/HEIF files are converted to a scratch JPEG first.
pub fn perceptual_hash(
    backend: &impl ImageBackend,
    heic: &dyn HeicConverter,
    path: &Path,
) -> Option<String> {
    let mut scratch = ScratchFiles::default();
    match decode_upload(backend, heic, path, &mut scratch) {
        Ok((img, _)) => Some(dhash(&img)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot compute perceptual hash");
            None
        }
    }
}

/// Number of differing bits between two hex-encoded hashes.
///
/// Hashes of different lengths, or that are not valid hex, are
/// [`MAX_DISTANCE`] apart.
///
/// ```
/// # use darkroom::dedupe::{hamming_distance, MAX_DISTANCE};
/// assert_eq!(hamming_distance("ff00", "ff00"), 0);
/// assert_eq!(hamming_distance("ff00", "ff01"), 1);
/// assert_eq!(hamming_distance("ff00", "00ff"), 16);
/// assert_eq!(hamming_distance("ff", "ff00"), MAX_DISTANCE);
/// ```
pub fn hamming_distance(a: &str, b: &str) -> u32 {
    if a.len() != b.len() {
        return MAX_DISTANCE;
    }
    let mut distance = 0;
    for (ca, cb) in a.chars().zip(b.chars()) {
        match (ca.to_digit(16), cb.to_digit(16)) {
            (Some(da), Some(db)) => distance += (da ^ db).count_ones(),
            _ => return MAX_DISTANCE,
        }
    }
    distance
}

/// An existing photo that an upload duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateMatch {
    pub photo_id: Uuid,
    pub slug: String,
    /// 0 for byte-identical files.
    pub distance: u32,
}

/// Find an existing photo that `path` duplicates.
///
/// Exact file-hash matches win. Otherwise the first photo whose perceptual
/// hash is within `threshold` bits is returned. Any failure along the way
/// counts as "no duplicate".
pub fn find_duplicate(
    backend: &impl ImageBackend,
    heic: &dyn HeicConverter,
    repo: &dyn PhotoRepository,
    path: &Path,
    threshold: u32,
) -> Option<DuplicateMatch> {
    let hash = match file_hash(path) {
        Ok(h) => h,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Duplicate check skipped");
            return None;
        }
    };
    if let Some(photo) = repo.find_by_file_hash(&hash) {
        debug!(path = %path.display(), existing = %photo.id, "Exact duplicate");
        return Some(DuplicateMatch {
            photo_id: photo.id,
            slug: photo.slug,
            distance: 0,
        });
    }

    let phash = perceptual_hash(backend, heic, path)?;
    find_similar(repo, &phash, threshold)
}

/// First photo whose stored perceptual hash is within `threshold` of `phash`.
pub fn find_similar(
    repo: &dyn PhotoRepository,
    phash: &str,
    threshold: u32,
) -> Option<DuplicateMatch> {
    repo.all().into_iter().find_map(|photo| {
        let stored = photo.image_hash.as_deref()?;
        let distance = hamming_distance(phash, stored);
        (distance <= threshold).then(|| DuplicateMatch {
            photo_id: photo.id,
            slug: photo.slug,
            distance,
        })
    })
}

/// Incoming files split by whether they duplicate the existing corpus.
#[derive(Debug, Default)]
pub struct BatchCheck {
    pub duplicates: Vec<(PathBuf, DuplicateMatch)>,
    pub valid: Vec<PathBuf>,
}

/// Check each file against the corpus.
///
/// Only the existing photos are compared; two new files that duplicate each
/// other are both reported as valid.
pub fn check_batch(
    backend: &impl ImageBackend,
    heic: &dyn HeicConverter,
    repo: &dyn PhotoRepository,
    paths: &[PathBuf],
    threshold: u32,
) -> BatchCheck {
    let mut result = BatchCheck::default();
    for path in paths {
        match find_duplicate(backend, heic, repo, path, threshold) {
            Some(found) => result.duplicates.push((path.clone(), found)),
            None => result.valid.push(path.clone()),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::JsonCatalog;
    use crate::heic::tests::StubConverter;
    use crate::imaging::RustBackend;
    use crate::photo::Photo;
    use image::{DynamicImage, GrayImage, RgbImage};
    use tempfile::TempDir;

    fn scene(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            let fx = x as f32 / width as f32;
            let fy = y as f32 / height as f32;
            let v = ((fx * 6.0).sin() * 0.5 + 0.5) * 200.0 + fy * 55.0;
            image::Rgb([v as u8, (255.0 * fy) as u8, (255.0 * fx) as u8])
        }))
    }

    // =========================================================================
    // dhash tests
    // =========================================================================

    #[test]
    fn dhash_is_sixteen_lowercase_hex() {
        let h = dhash(&scene(64, 48));
        assert_eq!(h.len(), 16);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn dhash_of_left_to_right_brightening_is_all_ones() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_fn(90, 80, |x, _| image::Luma([(x * 2) as u8])));
        assert_eq!(dhash(&img), "ffffffffffffffff");
    }

    #[test]
    fn dhash_of_flat_image_is_zero() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(50, 50, image::Luma([128])));
        assert_eq!(dhash(&img), "0000000000000000");
    }

    #[test]
    fn dhash_bits_are_row_major_msb_first() {
        // Only the first row brightens to the right.
        let img = DynamicImage::ImageLuma8(GrayImage::from_fn(9, 8, |x, y| {
            image::Luma([if y == 0 { (x * 20) as u8 } else { 100 }])
        }));
        assert_eq!(dhash(&img), "ff00000000000000");
    }

    #[test]
    fn dhash_survives_resize() {
        let original = scene(800, 600);
        let smaller = original.resize_exact(400, 300, FilterType::Lanczos3);
        assert!(hamming_distance(&dhash(&original), &dhash(&smaller)) <= 5);
    }

    // =========================================================================
    // hamming_distance tests
    // =========================================================================

    #[test]
    fn hamming_is_symmetric_and_zero_on_self() {
        let pairs = [
            ("0000000000000000", "ffffffffffffffff"),
            ("0123456789abcdef", "fedcba9876543210"),
            ("a5a5a5a5a5a5a5a5", "5a5a5a5a5a5a5a5a"),
        ];
        for (a, b) in pairs {
            assert_eq!(hamming_distance(a, b), hamming_distance(b, a));
            assert_eq!(hamming_distance(a, a), 0);
            assert!(hamming_distance(a, b) <= 64);
        }
        assert_eq!(hamming_distance("0000000000000000", "ffffffffffffffff"), 64);
    }

    #[test]
    fn hamming_rejects_invalid_hex() {
        assert_eq!(hamming_distance("zz", "00"), MAX_DISTANCE);
    }

    #[test]
    fn hamming_is_case_insensitive() {
        assert_eq!(hamming_distance("ABCDEF", "abcdef"), 0);
    }

    // =========================================================================
    // find_duplicate tests
    // =========================================================================

    const NO_HEIC: StubConverter = StubConverter { jpeg: None };

    fn catalog_with(tmp: &Path, photos: Vec<Photo>) -> JsonCatalog {
        let mut catalog = JsonCatalog::open(&tmp.join("catalog.json")).unwrap();
        for photo in photos {
            catalog.insert(photo).unwrap();
        }
        catalog
    }

    #[test]
    fn exact_match_has_distance_zero() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.png");
        scene(64, 48).save(&path).unwrap();

        let mut existing = Photo::new("a", "a.png");
        existing.file_hash = Some(file_hash(&path).unwrap());
        let catalog = catalog_with(tmp.path(), vec![existing.clone()]);

        let found = find_duplicate(&RustBackend::new(), &NO_HEIC, &catalog, &path, 5).unwrap();
        assert_eq!(found.photo_id, existing.id);
        assert_eq!(found.distance, 0);
    }

    #[test]
    fn perceptual_match_within_threshold() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("b.png");
        let img = scene(200, 150);
        img.save(&path).unwrap();

        let mut existing = Photo::new("a", "a.png");
        existing.file_hash = Some("different".into());
        existing.image_hash = Some(dhash(&img.resize_exact(100, 75, FilterType::Lanczos3)));
        let catalog = catalog_with(tmp.path(), vec![existing.clone()]);

        let found = find_duplicate(&RustBackend::new(), &NO_HEIC, &catalog, &path, 5).unwrap();
        assert_eq!(found.photo_id, existing.id);
        assert!(found.distance <= 5);
    }

    #[test]
    fn distant_hash_is_not_a_duplicate() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("c.png");
        scene(64, 48).save(&path).unwrap();

        let mut existing = Photo::new("a", "a.png");
        existing.image_hash = Some("0000000000000000".into());
        let mut inverted = Photo::new("b", "b.png");
        inverted.image_hash = Some("ffffffffffffffff".into());
        let catalog = catalog_with(tmp.path(), vec![existing, inverted]);
        let phash = dhash(&scene(64, 48));
        // Guard against the scene hashing close to either extreme.
        assert!(hamming_distance(&phash, "0000000000000000") > 5);
        assert!(hamming_distance(&phash, "ffffffffffffffff") > 5);

        assert!(find_duplicate(&RustBackend::new(), &NO_HEIC, &catalog, &path, 5).is_none());
    }

    #[test]
    fn undecodable_file_is_not_a_duplicate() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.jpg");
        std::fs::write(&path, b"garbage").unwrap();
        let mut existing = Photo::new("a", "a.png");
        existing.image_hash = Some("0000000000000000".into());
        let catalog = catalog_with(tmp.path(), vec![existing]);

        assert!(find_duplicate(&RustBackend::new(), &NO_HEIC, &catalog, &path, 64).is_none());
    }

    #[test]
    fn missing_file_is_not_a_duplicate() {
        let tmp = TempDir::new().unwrap();
        let catalog = catalog_with(tmp.path(), vec![]);
        assert!(find_duplicate(&RustBackend::new(), &NO_HEIC, &catalog, &tmp.path().join("nope.jpg"), 5).is_none());
    }

    #[test]
    fn check_batch_partitions() {
        let tmp = TempDir::new().unwrap();
        let dup = tmp.path().join("dup.png");
        let fresh = tmp.path().join("fresh.png");
        scene(64, 48).save(&dup).unwrap();
        DynamicImage::ImageLuma8(GrayImage::from_fn(64, 48, |x, _| image::Luma([(x * 4) as u8])))
            .save(&fresh)
            .unwrap();

        let mut existing = Photo::new("a", "a.png");
        existing.file_hash = Some(file_hash(&dup).unwrap());
        let catalog = catalog_with(tmp.path(), vec![existing]);

        let result = check_batch(&RustBackend::new(), &NO_HEIC, &catalog, &[dup.clone(), fresh.clone()], 5);
        assert_eq!(result.duplicates.len(), 1);
        assert_eq!(result.duplicates[0].0, dup);
        assert_eq!(result.valid, vec![fresh]);
    }

    #[test]
    fn heic_uploads_are_converted_before_hashing() {
        let tmp = TempDir::new().unwrap();
        let img = scene(200, 150);
        let converted = tmp.path().join("converted.png");
        img.save(&converted).unwrap();
        let heic = StubConverter {
            jpeg: Some(std::fs::read(&converted).unwrap()),
        };
        let upload = tmp.path().join("IMG_0007.HEIC");
        std::fs::write(&upload, b"heic bytes").unwrap();

        let mut existing = Photo::new("a", "a.jpg");
        existing.image_hash = Some(dhash(&img));
        let catalog = catalog_with(tmp.path(), vec![existing.clone()]);

        let result = check_batch(&RustBackend::new(), &heic, &catalog, &[upload.clone()], 5);
        assert_eq!(result.duplicates.len(), 1);
        assert_eq!(result.duplicates[0].0, upload);
        assert_eq!(result.duplicates[0].1.photo_id, existing.id);
        assert!(result.valid.is_empty());
    }

    #[test]
    fn failed_heic_conversion_is_not_a_duplicate() {
        let tmp = TempDir::new().unwrap();
        let upload = tmp.path().join("IMG_0008.heic");
        std::fs::write(&upload, b"heic bytes").unwrap();
        let mut existing = Photo::new("a", "a.jpg");
        existing.image_hash = Some("0000000000000000".into());
        let catalog = catalog_with(tmp.path(), vec![existing]);

        assert!(perceptual_hash(&RustBackend::new(), &NO_HEIC, &upload).is_none());
        assert!(find_duplicate(&RustBackend::new(), &NO_HEIC, &catalog, &upload, 64).is_none());
    }

    #[test]
    fn file_hash_matches_known_digest() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("abc.txt");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(
            file_hash(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn file_hash_spans_multiple_read_chunks() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("big.bin");
        let bytes: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &bytes).unwrap();
        assert_eq!(file_hash(&path).unwrap(), format!("{:x}", Sha256::digest(&bytes)));
    }
}
