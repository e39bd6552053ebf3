//! Persisted catalog: one JSON document holding every [`ShowRecord`].
//!
//! Read once when a run starts and written once when it ends. Writes go to a
//! sibling temp file first and are renamed over the old catalog, so a crash
//! mid-write leaves the previous version in place.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::ShowRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Catalog I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to encode catalog: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Catalog {path} is not valid: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the catalog. A missing or blank file is an empty catalog.
    pub async fn load(&self) -> Result<Vec<ShowRecord>, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No catalog yet, starting empty");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if content.trim().is_empty() {
            info!(path = %self.path.display(), "Catalog is empty, starting empty");
            return Ok(Vec::new());
        }

        let shows: Vec<ShowRecord> =
            serde_json::from_str(&content).map_err(|source| StoreError::Parse {
                path: self.path.clone(),
                source,
            })?;

        info!(path = %self.path.display(), shows = shows.len(), "Loaded catalog");
        Ok(shows)
    }

    /// Replaces the stored catalog with `shows`.
    pub async fn save(&self, shows: &[ShowRecord]) -> Result<(), StoreError> {
        let encoded = serde_json::to_string_pretty(shows).map_err(StoreError::Serialize)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, encoded)
            .await
            .map_err(|source| StoreError::Io {
                path: tmp_path.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })?;

        debug!(path = %self.path.display(), shows = shows.len(), "Saved catalog");
        Ok(())
    }
}
