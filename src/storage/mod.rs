//! Tiered storage for originals.
//!
//! [`StorageGateway`] puts, fetches, deletes and checks objects across two
//! tiers: a remote object store (preferred, when configured) and a local
//! directory (always available). Every location it hands out is a
//! [`StorageLocation`] that records which tier holds the object.
//!
//! The gateway never fails the caller: tier errors are logged and surface as
//! `None` / `false`, and `put` falls back to the local tier when the remote
//! one is unreachable.

pub mod s3;

use crate::config::Config;
use crate::photo::StorageLocation;
use std::path::{Component, Path, PathBuf};
use tempfile::TempPath;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use s3::S3Store;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Remote storage error: {0}")]
    Remote(String),
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

/// A remote object store addressed by string keys.
pub trait RemoteStore {
    fn put_file(&self, source: &Path, key: &str) -> Result<(), StorageError>;
    fn get_to_file(&self, key: &str, dest: &Path) -> Result<(), StorageError>;
    fn delete(&self, key: &str) -> Result<(), StorageError>;
    fn exists(&self, key: &str) -> Result<bool, StorageError>;
}

/// Reject absolute keys and keys that climb out of the root.
fn validate_key(key: &str) -> Result<PathBuf, StorageError> {
    let path = Path::new(key);
    let valid = !key.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if valid {
        Ok(path.to_path_buf())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

/// Uniform access to the local and remote tiers.
pub struct StorageGateway {
    local_root: PathBuf,
    remote: Option<Box<dyn RemoteStore>>,
}

impl StorageGateway {
    pub fn new(local_root: impl Into<PathBuf>, remote: Option<Box<dyn RemoteStore>>) -> Self {
        Self {
            local_root: local_root.into(),
            remote,
        }
    }

    pub fn local_only(local_root: impl Into<PathBuf>) -> Self {
        Self::new(local_root, None)
    }

    /// Build the gateway described by `config`.
    ///
    /// An incomplete remote configuration means local-only operation; a
    /// remote client that fails to initialise is logged and skipped.
    pub fn from_config(config: &Config) -> Self {
        let remote: Option<Box<dyn RemoteStore>> = match config.storage.remote() {
            Some(settings) => match S3Store::connect(&settings) {
                Ok(store) => {
                    info!(bucket = %settings.bucket, "Remote storage enabled");
                    Some(Box::new(store))
                }
                Err(e) => {
                    warn!(error = %e, "Remote storage unavailable, using local storage only");
                    None
                }
            },
            None => None,
        };
        Self::new(config.paths.private_root.clone(), remote)
    }

    /// True when the remote tier is configured.
    pub fn is_enabled(&self) -> bool {
        self.remote.is_some()
    }

    pub fn local_root(&self) -> &Path {
        &self.local_root
    }

    /// Absolute path of a local-tier object.
    pub fn local_path(&self, relative: &Path) -> Option<PathBuf> {
        let key = relative.to_str()?;
        validate_key(key).ok().map(|p| self.local_root.join(p))
    }

    /// Store `source` under `key`, preferring the remote tier.
    pub fn put(&self, source: &Path, key: &str) -> Option<StorageLocation> {
        let relative = match validate_key(key) {
            Ok(p) => p,
            Err(e) => {
                warn!(key, error = %e, "Refusing to store object");
                return None;
            }
        };

        if let Some(remote) = &self.remote {
            match remote.put_file(source, key) {
                Ok(()) => {
                    debug!(key, "Stored object remotely");
                    return Some(StorageLocation::Remote(key.to_string()));
                }
                Err(e) => warn!(key, error = %e, "Remote put failed, falling back to local storage"),
            }
        }

        let dest = self.local_root.join(&relative);
        let copied = dest
            .parent()
            .map_or(Ok(()), std::fs::create_dir_all)
            .and_then(|()| std::fs::copy(source, &dest));
        match copied {
            Ok(_) => {
                debug!(path = %dest.display(), "Stored object locally");
                Some(StorageLocation::Local(relative))
            }
            Err(e) => {
                warn!(key, error = %e, "Local put failed");
                None
            }
        }
    }

    /// Download a remote object into a fresh temp file.
    ///
    /// The caller owns the returned file; dropping it deletes it. Returns
    /// `None` when the remote tier is disabled or the download fails.
    pub fn fetch_to_temp(&self, key: &str) -> Option<TempPath> {
        let remote = self.remote.as_ref()?;
        let suffix = Path::new(key)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        let staged = match tempfile::Builder::new()
            .prefix("darkroom-fetch-")
            .suffix(&suffix)
            .tempfile()
        {
            Ok(f) => f.into_temp_path(),
            Err(e) => {
                warn!(key, error = %e, "Could not create temp file for download");
                return None;
            }
        };
        match remote.get_to_file(key, &staged) {
            Ok(()) => Some(staged),
            Err(e) => {
                warn!(key, error = %e, "Remote fetch failed");
                None
            }
        }
    }

    pub fn delete(&self, location: &StorageLocation) -> bool {
        match location {
            StorageLocation::Remote(key) => {
                let Some(remote) = &self.remote else {
                    warn!(key, "Cannot delete remote object: remote storage disabled");
                    return false;
                };
                match remote.delete(key) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(key, error = %e, "Remote delete failed");
                        false
                    }
                }
            }
            StorageLocation::Local(relative) => {
                let Some(path) = self.local_path(relative) else {
                    return false;
                };
                match std::fs::remove_file(&path) {
                    Ok(()) => true,
                    Err(e) => {
                        debug!(path = %path.display(), error = %e, "Local delete failed");
                        false
                    }
                }
            }
        }
    }

    pub fn exists(&self, location: &StorageLocation) -> bool {
        match location {
            StorageLocation::Remote(key) => match &self.remote {
                Some(remote) => remote.exists(key).unwrap_or_else(|e| {
                    warn!(key, error = %e, "Remote existence check failed");
                    false
                }),
                None => false,
            },
            StorageLocation::Local(relative) => {
                self.local_path(relative).is_some_and(|p| p.is_file())
            }
        }
    }
}
