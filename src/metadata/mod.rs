//! Capture metadata: EXIF fields, GPS coordinates and location names.
//!
//! Everything here degrades instead of failing. A file without readable EXIF
//! yields `None` for the whole bundle; a GPS block with any missing or
//! malformed component yields no coordinates at all (never just one half of
//! the pair); a failed reverse-geocode yields no location name.
//!
//! ## GPS conversion
//!
//! EXIF stores each coordinate as a degrees/minutes/seconds triple of
//! rationals plus a hemisphere reference:
//!
//! ```text
//! decimal = degrees + minutes / 60 + seconds / 3600      (negated for S / W)
//! ```
//!
//! rounded to 8 decimal places.

pub mod geocode;

use crate::photo::ExifData;
use chrono::NaiveDateTime;
use exif::{Exif, In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

pub use geocode::{Geocoder, NominatimGeocoder, ReverseGeocode, build_location_name, location_name};

/// EXIF timestamp layout (`2024:06:01 18:30:00`).
const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Metadata read from one image file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureMetadata {
    pub exif: ExifData,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Read EXIF and GPS metadata from `path`.
///
/// Returns `None` when the file has no readable EXIF block, or the block
/// carries none of the fields of interest.
pub fn read_metadata(path: &Path) -> Option<CaptureMetadata> {
    let exif = match read_exif(path) {
        Ok(exif) => exif,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "No readable EXIF");
            return None;
        }
    };
    let fields = extract_fields(&exif);
    let (latitude, longitude) = extract_gps(&exif);
    if fields.is_empty() && latitude.is_none() {
        return None;
    }
    Some(CaptureMetadata {
        exif: fields,
        latitude,
        longitude,
    })
}

fn read_exif(path: &Path) -> Result<Exif, exif::Error> {
    let file = File::open(path)?;
    Reader::new().read_from_container(&mut BufReader::new(file))
}

fn ascii(exif: &Exif, tag: Tag) -> Option<String> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Ascii(parts) => {
            let text = String::from_utf8_lossy(parts.first()?);
            let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
            (!text.is_empty()).then(|| text.to_string())
        }
        _ => None,
    }
}

fn rational(exif: &Exif, tag: Tag) -> Option<f64> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Rational(v) => v.first().filter(|r| r.denom != 0).map(|r| r.to_f64()),
        _ => None,
    }
}

fn unsigned(exif: &Exif, tag: Tag) -> Option<u32> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Short(v) => v.first().map(|&n| n as u32),
        Value::Long(v) => v.first().copied(),
        _ => None,
    }
}

/// Camera, exposure and capture-time fields.
pub fn extract_fields(exif: &Exif) -> ExifData {
    let exposure_time = exif
        .get_field(Tag::ExposureTime, In::PRIMARY)
        .filter(|f| matches!(&f.value, Value::Rational(v) if v.first().is_some_and(|r| r.denom != 0)))
        .map(|f| f.display_value().to_string());
    let taken_at = ascii(exif, Tag::DateTimeOriginal)
        .or_else(|| ascii(exif, Tag::DateTime))
        .and_then(|s| NaiveDateTime::parse_from_str(&s, EXIF_DATETIME_FORMAT).ok());

    ExifData {
        camera_make: ascii(exif, Tag::Make),
        camera_model: ascii(exif, Tag::Model),
        exposure_time,
        f_number: rational(exif, Tag::FNumber),
        iso: unsigned(exif, Tag::PhotographicSensitivity),
        focal_length: rational(exif, Tag::FocalLength),
        lens: ascii(exif, Tag::LensModel),
        taken_at,
    }
}

/// GPS coordinates from the EXIF GPS block, both or neither.
pub fn extract_gps(exif: &Exif) -> (Option<f64>, Option<f64>) {
    let coordinate = |value_tag: Tag, ref_tag: Tag| -> Option<f64> {
        let parts = match &exif.get_field(value_tag, In::PRIMARY)?.value {
            Value::Rational(v) if v.len() >= 3 => [
                ratio(v[0].num, v[0].denom)?,
                ratio(v[1].num, v[1].denom)?,
                ratio(v[2].num, v[2].denom)?,
            ],
            _ => return None,
        };
        let hemisphere = ascii(exif, ref_tag)?;
        dms_to_decimal(parts, &hemisphere)
    };
    match (
        coordinate(Tag::GPSLatitude, Tag::GPSLatitudeRef),
        coordinate(Tag::GPSLongitude, Tag::GPSLongitudeRef),
    ) {
        (Some(lat), Some(lon)) => (Some(lat), Some(lon)),
        _ => (None, None),
    }
}

fn ratio(num: u32, denom: u32) -> Option<f64> {
    (denom != 0).then(|| num as f64 / denom as f64)
}

/// Parse a rational written as `"n/d"` or a plain number.
///
/// ```
/// # use darkroom::metadata::parse_rational;
/// assert_eq!(parse_rational("468/10"), Some(46.8));
/// assert_eq!(parse_rational("40"), Some(40.0));
/// assert_eq!(parse_rational("1/0"), None);
/// ```
pub fn parse_rational(text: &str) -> Option<f64> {
    let text = text.trim();
    match text.split_once('/') {
        Some((n, d)) => {
            let n: f64 = n.trim().parse().ok()?;
            let d: f64 = d.trim().parse().ok()?;
            (d != 0.0).then(|| n / d)
        }
        None => text.parse().ok().filter(|v: &f64| v.is_finite()),
    }
}

/// Convert degrees/minutes/seconds to signed decimal degrees.
///
/// `hemisphere` must start with `N`, `S`, `E` or `W`; anything else is
/// malformed.
///
/// ```
/// # use darkroom::metadata::dms_to_decimal;
/// assert_eq!(dms_to_decimal([40.0, 26.0, 46.8], "N"), Some(40.44633333));
/// assert_eq!(dms_to_decimal([74.0, 0.0, 21.6], "W"), Some(-74.006));
/// ```
pub fn dms_to_decimal(dms: [f64; 3], hemisphere: &str) -> Option<f64> {
    let [degrees, minutes, seconds] = dms;
    if dms.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return None;
    }
    let sign = match hemisphere.trim().chars().next()?.to_ascii_uppercase() {
        'N' | 'E' => 1.0,
        'S' | 'W' => -1.0,
        _ => return None,
    };
    let decimal = sign * (degrees + minutes / 60.0 + seconds / 3600.0);
    Some((decimal * 1e8).round() / 1e8)
}

/// Coordinate pair from textual DMS components (`"40"`, `"26"`, `"468/10"`).
pub fn gps_from_strings(
    latitude: &[&str],
    latitude_ref: &str,
    longitude: &[&str],
    longitude_ref: &str,
) -> (Option<f64>, Option<f64>) {
    let convert = |parts: &[&str], hemisphere: &str| -> Option<f64> {
        let [d, m, s] = parts else {
            return None;
        };
        dms_to_decimal(
            [parse_rational(d)?, parse_rational(m)?, parse_rational(s)?],
            hemisphere,
        )
    };
    match (convert(latitude, latitude_ref), convert(longitude, longitude_ref)) {
        (Some(lat), Some(lon)) => (Some(lat), Some(lon)),
        _ => (None, None),
    }
}

/// Split signed decimal degrees into a DMS triple and hemisphere letter.
pub fn decimal_to_dms(value: f64, is_latitude: bool) -> ([f64; 3], char) {
    let hemisphere = match (is_latitude, value < 0.0) {
        (true, false) => 'N',
        (true, true) => 'S',
        (false, false) => 'E',
        (false, true) => 'W',
    };
    let abs = value.abs();
    let degrees = abs.trunc();
    let minutes_full = (abs - degrees) * 60.0;
    let minutes = minutes_full.trunc();
    let seconds = (minutes_full - minutes) * 60.0;
    ([degrees, minutes, seconds], hemisphere)
}
