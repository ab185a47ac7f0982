//! Photo record storage.
//!
//! The pipeline reads and writes photo records through [`PhotoRepository`];
//! whatever owns the records (a web app's database, the CLI's JSON file)
//! implements it. [`JsonCatalog`] is the file-backed implementation the CLI
//! and tests use.
//!
//! ## Storage
//!
//! The catalog is a single pretty-printed JSON document:
//!
//! ```json
//! { "version": 1, "photos": [ { "id": "…", "slug": "sunset", … } ] }
//! ```
//!
//! Every mutation rewrites the file through a temp file + rename, so a crash
//! never leaves a truncated catalog behind.

use crate::photo::Photo;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Version of the catalog format.
const CATALOG_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Catalog JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported catalog version {0}")]
    Version(u32),
    #[error("Photo {0} not found")]
    NotFound(Uuid),
    #[error("Photo {0} already exists")]
    Duplicate(Uuid),
}

/// Access to photo records.
pub trait PhotoRepository {
    fn all(&self) -> Vec<Photo>;
    fn get(&self, id: Uuid) -> Option<Photo>;
    fn insert(&mut self, photo: Photo) -> Result<(), CatalogError>;
    /// Replace the stored record with the same id.
    fn update(&mut self, photo: &Photo) -> Result<(), CatalogError>;
    fn remove(&mut self, id: Uuid) -> Result<Photo, CatalogError>;

    fn slug_exists(&self, slug: &str) -> bool {
        self.all().iter().any(|p| p.slug == slug)
    }

    fn find_by_file_hash(&self, hash: &str) -> Option<Photo> {
        self.all()
            .into_iter()
            .find(|p| p.file_hash.as_deref() == Some(hash))
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct CatalogFile {
    version: u32,
    photos: Vec<Photo>,
}

/// JSON-file photo catalog.
#[derive(Debug)]
pub struct JsonCatalog {
    path: PathBuf,
    photos: Vec<Photo>,
}

impl JsonCatalog {
    /// Open the catalog at `path`. A missing file is an empty catalog.
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        let photos = match std::fs::read_to_string(path) {
            Ok(content) => {
                let file: CatalogFile = serde_json::from_str(&content)?;
                if file.version != CATALOG_VERSION {
                    return Err(CatalogError::Version(file.version));
                }
                file.photos
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path: path.to_path_buf(),
            photos,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    fn save(&self) -> Result<(), CatalogError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let json = serde_json::to_string_pretty(&CatalogFile {
            version: CATALOG_VERSION,
            photos: self.photos.clone(),
        })?;
        let mut staged = tempfile::NamedTempFile::new_in(dir)?;
        staged.write_all(json.as_bytes())?;
        staged
            .persist(&self.path)
            .map_err(|e| CatalogError::Io(e.error))?;
        Ok(())
    }
}

impl PhotoRepository for JsonCatalog {
    fn all(&self) -> Vec<Photo> {
        self.photos.clone()
    }

    fn get(&self, id: Uuid) -> Option<Photo> {
        self.photos.iter().find(|p| p.id == id).cloned()
    }

    fn insert(&mut self, photo: Photo) -> Result<(), CatalogError> {
        if self.photos.iter().any(|p| p.id == photo.id) {
            return Err(CatalogError::Duplicate(photo.id));
        }
        self.photos.push(photo);
        self.save()
    }

    fn update(&mut self, photo: &Photo) -> Result<(), CatalogError> {
        let slot = self
            .photos
            .iter_mut()
            .find(|p| p.id == photo.id)
            .ok_or(CatalogError::NotFound(photo.id))?;
        *slot = photo.clone();
        self.save()
    }

    fn remove(&mut self, id: Uuid) -> Result<Photo, CatalogError> {
        let index = self
            .photos
            .iter()
            .position(|p| p.id == id)
            .ok_or(CatalogError::NotFound(id))?;
        let photo = self.photos.remove(index);
        self.save()?;
        Ok(photo)
    }

    fn slug_exists(&self, slug: &str) -> bool {
        self.photos.iter().any(|p| p.slug == slug)
    }

    fn find_by_file_hash(&self, hash: &str) -> Option<Photo> {
        self.photos
            .iter()
            .find(|p| p.file_hash.as_deref() == Some(hash))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn open_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let catalog = JsonCatalog::open(&tmp.path().join("catalog.json")).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn insert_persists_and_reloads() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data/catalog.json");
        let photo = Photo::new("sunset", "sunset.jpg");
        let id = photo.id;

        let mut catalog = JsonCatalog::open(&path).unwrap();
        catalog.insert(photo).unwrap();

        let reloaded = JsonCatalog::open(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get(id).unwrap().slug, "sunset");
    }

    #[test]
    fn insert_same_id_twice_fails() {
        let tmp = TempDir::new().unwrap();
        let mut catalog = JsonCatalog::open(&tmp.path().join("c.json")).unwrap();
        let photo = Photo::new("a", "a.jpg");
        catalog.insert(photo.clone()).unwrap();
        assert!(matches!(catalog.insert(photo), Err(CatalogError::Duplicate(_))));
    }

    #[test]
    fn update_replaces_record() {
        let tmp = TempDir::new().unwrap();
        let mut catalog = JsonCatalog::open(&tmp.path().join("c.json")).unwrap();
        let mut photo = Photo::new("a", "a.jpg");
        catalog.insert(photo.clone()).unwrap();

        photo.title = "Renamed".into();
        catalog.update(&photo).unwrap();
        assert_eq!(catalog.get(photo.id).unwrap().title, "Renamed");
    }

    #[test]
    fn update_unknown_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let mut catalog = JsonCatalog::open(&tmp.path().join("c.json")).unwrap();
        let photo = Photo::new("a", "a.jpg");
        assert!(matches!(catalog.update(&photo), Err(CatalogError::NotFound(_))));
    }

    #[test]
    fn remove_returns_record() {
        let tmp = TempDir::new().unwrap();
        let mut catalog = JsonCatalog::open(&tmp.path().join("c.json")).unwrap();
        let photo = Photo::new("a", "a.jpg");
        let id = photo.id;
        catalog.insert(photo).unwrap();

        assert_eq!(catalog.remove(id).unwrap().id, id);
        assert!(catalog.get(id).is_none());
        assert!(matches!(catalog.remove(id), Err(CatalogError::NotFound(_))));
    }

    #[test]
    fn lookups_by_slug_and_hash() {
        let tmp = TempDir::new().unwrap();
        let mut catalog = JsonCatalog::open(&tmp.path().join("c.json")).unwrap();
        let mut photo = Photo::new("beach", "beach.jpg");
        photo.file_hash = Some("abc".into());
        catalog.insert(photo).unwrap();

        assert!(catalog.slug_exists("beach"));
        assert!(!catalog.slug_exists("forest"));
        assert_eq!(catalog.find_by_file_hash("abc").unwrap().slug, "beach");
        assert!(catalog.find_by_file_hash("def").is_none());
    }

    #[test]
    fn corrupt_catalog_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("c.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(JsonCatalog::open(&path), Err(CatalogError::Json(_))));
    }

    #[test]
    fn wrong_version_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("c.json");
        std::fs::write(&path, r#"{"version": 99, "photos": []}"#).unwrap();
        assert!(matches!(JsonCatalog::open(&path), Err(CatalogError::Version(99))));
    }
}
