//! CLI output formatting.
//!
//! Output leads with what the user cares about (the photo, the outcome) and
//! shows paths and ids as indented context lines.
//!
//! ## Batch report
//!
//! ```text
//! 001 beach.jpg: ok (3f2a9c1e)
//! 002 beach-copy.jpg: duplicate of beach (distance 0)
//! 003 missing.jpg: not found
//! 004 notes.txt: error
//!     Rejected notes.txt: unsupported file type
//!
//! 1 succeeded, 1 duplicate, 1 not found, 1 failed
//! ```
//!
//! ## Photo list
//!
//! ```text
//! 001 Summer Beach [draft]
//!     Id: 3f2a9c1e-…
//!     Size: 2560x1707
//!     Location: Hallstatt, Gmunden, Upper Austria, Austria
//! ```
//!
//! Each `format_*` function returns lines and has no side effects; the
//! `print_*` wrappers write them to stdout.

use crate::dedupe::BatchCheck;
use crate::photo::{Photo, PhotoStatus};
use crate::report::{BatchReport, ItemOutcome};

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

fn status_label(status: PhotoStatus) -> &'static str {
    match status {
        PhotoStatus::Processing => "processing",
        PhotoStatus::Draft => "draft",
        PhotoStatus::Published => "published",
    }
}

// ============================================================================
// Batch reports
// ============================================================================

/// One line per item plus a summary line.
pub fn format_batch_report(report: &BatchReport) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, item) in report.items.iter().enumerate() {
        let head = format!("{} {}", format_index(i + 1), item.item);
        match &item.outcome {
            ItemOutcome::Succeeded(id) => {
                lines.push(format!("{head}: ok ({})", &id.simple().to_string()[..8]));
            }
            ItemOutcome::Duplicate { slug, distance, .. } => {
                lines.push(format!("{head}: duplicate of {slug} (distance {distance})"));
            }
            ItemOutcome::NotFound => lines.push(format!("{head}: not found")),
            ItemOutcome::Error(message) => {
                lines.push(format!("{head}: error"));
                lines.push(format!("{}{}", indent(1), message));
            }
        }
    }
    if !report.items.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "{} succeeded, {}, {} not found, {} failed",
        report.succeeded(),
        plural(report.duplicates(), "duplicate"),
        report.not_found(),
        report.errors()
    ));
    lines
}

pub fn print_batch_report(report: &BatchReport) {
    for line in format_batch_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Duplicate check
// ============================================================================

pub fn format_duplicate_check(check: &BatchCheck) -> Vec<String> {
    let mut lines = Vec::new();
    if !check.duplicates.is_empty() {
        lines.push("Duplicates".to_string());
        for (i, (path, found)) in check.duplicates.iter().enumerate() {
            lines.push(format!(
                "{} {} → {} (distance {})",
                format_index(i + 1),
                path.display(),
                found.slug,
                found.distance
            ));
        }
    }
    if !check.valid.is_empty() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push("New".to_string());
        for (i, path) in check.valid.iter().enumerate() {
            lines.push(format!("{} {}", format_index(i + 1), path.display()));
        }
    }
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "{}, {} new",
        plural(check.duplicates.len(), "duplicate"),
        check.valid.len()
    ));
    lines
}

pub fn print_duplicate_check(check: &BatchCheck) {
    for line in format_duplicate_check(check) {
        println!("{}", line);
    }
}

// ============================================================================
// Photo listing
// ============================================================================

/// Header plus indented context lines for one photo.
pub fn format_photo(index: usize, photo: &Photo) -> Vec<String> {
    let ctx = indent(1);
    let mut lines = vec![
        format!(
            "{} {} [{}]",
            format_index(index),
            photo.title,
            status_label(photo.status)
        ),
        format!("{ctx}Id: {}", photo.id),
    ];
    if let (Some(w), Some(h)) = (photo.width, photo.height) {
        lines.push(format!("{ctx}Size: {w}x{h}"));
    }
    match &photo.original {
        Some(location) => lines.push(format!("{ctx}Original: {location}")),
        None if photo.pending_upload.is_some() => lines.push(format!("{ctx}Original: pending")),
        None => {}
    }
    let camera = [photo.exif.camera_make.as_deref(), photo.exif.camera_model.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    if !camera.is_empty() {
        lines.push(format!("{ctx}Camera: {camera}"));
    }
    if let Some(name) = &photo.location_name {
        lines.push(format!("{ctx}Location: {name}"));
    } else if let (Some(lat), Some(lon)) = (photo.latitude, photo.longitude) {
        lines.push(format!("{ctx}Location: {lat:.6}, {lon:.6}"));
    }
    if let Some(description) = &photo.description {
        lines.push(format!("{ctx}{}", truncate(description.trim(), 60)));
    }
    lines
}

pub fn format_photo_list(photos: &[Photo]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, photo) in photos.iter().enumerate() {
        lines.extend(format_photo(i + 1, photo));
    }
    if !photos.is_empty() {
        lines.push(String::new());
    }
    lines.push(plural(photos.len(), "photo"));
    lines
}

pub fn print_photo_list(photos: &[Photo]) {
    for line in format_photo_list(photos) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedupe::DuplicateMatch;
    use crate::photo::StorageLocation;
    use std::path::PathBuf;
    use uuid::Uuid;

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(1234), "1234");
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("Zürich Zürich", 2), "Zü...");
    }

    #[test]
    fn batch_report_lines() {
        let id = Uuid::new_v4();
        let mut report = BatchReport::default();
        report.push("beach.jpg", ItemOutcome::Succeeded(id));
        report.push(
            "copy.jpg",
            ItemOutcome::Duplicate {
                of: id,
                slug: "beach".into(),
                distance: 0,
            },
        );
        report.push("missing.jpg", ItemOutcome::NotFound);
        report.push("notes.txt", ItemOutcome::Error("unsupported".into()));

        let lines = format_batch_report(&report);
        assert_eq!(
            lines[0],
            format!("001 beach.jpg: ok ({})", &id.simple().to_string()[..8])
        );
        assert_eq!(lines[1], "002 copy.jpg: duplicate of beach (distance 0)");
        assert_eq!(lines[2], "003 missing.jpg: not found");
        assert_eq!(lines[3], "004 notes.txt: error");
        assert_eq!(lines[4], "    unsupported");
        assert_eq!(lines[5], "");
        assert_eq!(
            lines.last().unwrap(),
            "1 succeeded, 1 duplicate, 1 not found, 1 failed"
        );
    }

    #[test]
    fn empty_batch_is_just_summary() {
        assert_eq!(
            format_batch_report(&BatchReport::default()),
            vec!["0 succeeded, 0 duplicates, 0 not found, 0 failed"]
        );
    }

    #[test]
    fn duplicate_check_sections() {
        let check = BatchCheck {
            duplicates: vec![(
                PathBuf::from("a.jpg"),
                DuplicateMatch {
                    photo_id: Uuid::new_v4(),
                    slug: "sunset".into(),
                    distance: 3,
                },
            )],
            valid: vec![PathBuf::from("b.jpg"), PathBuf::from("c.jpg")],
        };
        let lines = format_duplicate_check(&check);
        assert_eq!(lines[0], "Duplicates");
        assert_eq!(lines[1], "001 a.jpg → sunset (distance 3)");
        assert_eq!(lines[3], "New");
        assert_eq!(lines[4], "001 b.jpg");
        assert_eq!(lines.last().unwrap(), "1 duplicate, 2 new");
    }

    #[test]
    fn photo_shows_context_lines() {
        let mut photo = Photo::new("summer-beach", "summer_beach.jpg");
        photo.status = PhotoStatus::Draft;
        photo.width = Some(2560);
        photo.height = Some(1707);
        photo.original = Some(StorageLocation::Remote("originals/x.jpg".into()));
        photo.exif.camera_make = Some("Canon".into());
        photo.exif.camera_model = Some("EOS R5".into());
        photo.latitude = Some(40.446333);
        photo.longitude = Some(-74.006);

        let lines = format_photo(1, &photo);
        assert_eq!(lines[0], "001 Summer Beach [draft]");
        assert_eq!(lines[1], format!("    Id: {}", photo.id));
        assert!(lines.contains(&"    Size: 2560x1707".to_string()));
        assert!(lines.contains(&"    Original: remote:originals/x.jpg".to_string()));
        assert!(lines.contains(&"    Camera: Canon EOS R5".to_string()));
        assert!(lines.contains(&"    Location: 40.446333, -74.006000".to_string()));
    }

    #[test]
    fn pending_photo_list() {
        let mut photo = Photo::new("later", "later.jpg");
        photo.pending_upload = Some("pending/x.jpg".into());
        let lines = format_photo_list(&[photo]);
        assert_eq!(lines[0], "001 Later [processing]");
        assert!(lines.contains(&"    Original: pending".to_string()));
        assert_eq!(lines.last().unwrap(), "1 photo");
    }
}
