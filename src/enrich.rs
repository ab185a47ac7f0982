//! Optional text enrichment (titles, descriptions) from an external
//! captioning service.
//!
//! Enrichment is the last pipeline step and never fails an upload: errors
//! are logged and the photo keeps its filename-derived title.

use crate::photo::Photo;
use std::path::Path;
use tracing::{debug, warn};

/// Text suggested for a photo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enrichment {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// A captioning collaborator. `image` is the display rendition.
pub trait Enricher {
    fn enrich(
        &self,
        photo: &Photo,
        image: &Path,
    ) -> Result<Enrichment, Box<dyn std::error::Error + Send + Sync>>;
}

/// Apply `enricher` to `photo`, swallowing failures.
///
/// Returns true when any field changed.
pub fn apply_enrichment(enricher: &dyn Enricher, photo: &mut Photo, image: &Path) -> bool {
    match enricher.enrich(photo, image) {
        Ok(Enrichment { title, description }) => {
            let mut changed = false;
            if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
                photo.title = title;
                changed = true;
            }
            if let Some(description) = description.filter(|d| !d.trim().is_empty()) {
                photo.description = Some(description);
                changed = true;
            }
            debug!(photo_id = %photo.id, changed, "Enrichment applied");
            changed
        }
        Err(e) => {
            warn!(photo_id = %photo.id, error = %e, "Enrichment failed, keeping photo as is");
            false
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Enricher returning fixed text, or an error.
    pub struct FixedEnricher(pub Option<Enrichment>);

    impl Enricher for FixedEnricher {
        fn enrich(
            &self,
            _photo: &Photo,
            _image: &Path,
        ) -> Result<Enrichment, Box<dyn std::error::Error + Send + Sync>> {
            self.0.clone().ok_or_else(|| "captioning service timed out".into())
        }
    }

    #[test]
    fn applies_title_and_description() {
        let mut photo = Photo::new("a", "a.jpg");
        let enricher = FixedEnricher(Some(Enrichment {
            title: Some("Golden Hour".into()),
            description: Some("Sun setting over the bay.".into()),
        }));
        assert!(apply_enrichment(&enricher, &mut photo, Path::new("display/a.avif")));
        assert_eq!(photo.title, "Golden Hour");
        assert_eq!(photo.description.as_deref(), Some("Sun setting over the bay."));
    }

    #[test]
    fn blank_suggestions_are_ignored() {
        let mut photo = Photo::new("a", "a.jpg");
        let enricher = FixedEnricher(Some(Enrichment {
            title: Some("  ".into()),
            description: None,
        }));
        assert!(!apply_enrichment(&enricher, &mut photo, Path::new("x")));
        assert_eq!(photo.title, "A");
    }

    #[test]
    fn failure_leaves_photo_untouched() {
        let mut photo = Photo::new("a", "a.jpg");
        let before = photo.clone();
        assert!(!apply_enrichment(&FixedEnricher(None), &mut photo, Path::new("x")));
        assert_eq!(photo, before);
    }
}
