//! URL slugs for photos.
//!
//! Slugs end up in URLs and file names, so they are lowercase ASCII
//! alphanumerics separated by single dashes, truncated at a word boundary.
//! Collisions are resolved by appending `-2`, `-3`, … until the slug is free.

/// Maximum slug length before the collision suffix.
pub const MAX_SLUG_LEN: usize = 80;

/// Fallback when nothing usable survives sanitization.
const FALLBACK_SLUG: &str = "photo";

/// Turn arbitrary text into a URL-safe slug.
///
/// ```
/// # use darkroom::slug::sanitize_slug;
/// assert_eq!(sanitize_slug("My Great Photo!"), "my-great-photo");
/// assert_eq!(sanitize_slug("IMG_0042"), "img-0042");
/// ```
pub fn sanitize_slug(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.len() <= MAX_SLUG_LEN {
        return slug;
    }
    let truncated = &slug[..MAX_SLUG_LEN];
    match truncated.rfind('-') {
        Some(pos) => truncated[..pos].to_string(),
        None => truncated.to_string(),
    }
}

/// Slug for an uploaded file: its sanitized stem, made unique with `taken`.
pub fn unique_slug(filename: &str, taken: impl Fn(&str) -> bool) -> String {
    let stem = std::path::Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    let base = match sanitize_slug(stem) {
        s if s.is_empty() => FALLBACK_SLUG.to_string(),
        s => s,
    };
    if !taken(&base) {
        return base;
    }
    (2u32..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or(base)
}
