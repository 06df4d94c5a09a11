//! Read-only access to the content-addressed store's file index.
//!
//! The index is owned by the storage subsystem. It is re-read on every query so
//! external updates become visible immediately; nothing is cached between calls.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::IndexError;
use crate::protocol::FileSummary;

/// Metadata the store keeps for one file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileIndexEntry {
    #[serde(default)]
    pub original_name: Option<String>,
    #[serde(default)]
    pub size: u64,
    /// Chunk hashes in reconstruction order
    #[serde(default)]
    pub chunks: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FileIndex {
    storage_dir: PathBuf,
    index_path: PathBuf,
}

impl FileIndex {
    pub fn new(storage_dir: impl Into<PathBuf>, index_file: &str) -> Self {
        let storage_dir = storage_dir.into();
        let index_path = storage_dir.join(index_file);
        Self {
            storage_dir,
            index_path,
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Load the index. `None` means the store has not written one yet.
    async fn load(&self) -> Result<Option<BTreeMap<String, FileIndexEntry>>, IndexError> {
        let raw = match tokio::fs::read(&self.index_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(IndexError::Io {
                    path: self.index_path.clone(),
                    source,
                });
            }
        };

        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|source| IndexError::Unreadable {
                path: self.index_path.clone(),
                source,
            })
    }

    /// Summaries of every indexed file, empty when no index exists
    pub async fn list_files(&self) -> Result<Vec<FileSummary>, IndexError> {
        let index = self.load().await?.unwrap_or_default();
        Ok(index
            .into_iter()
            .map(|(hash, entry)| FileSummary {
                name: entry.original_name,
                hash,
                size: entry.size,
            })
            .collect())
    }

    pub async fn lookup(&self, hash: &str) -> Result<Option<FileIndexEntry>, IndexError> {
        Ok(self
            .load()
            .await?
            .and_then(|mut index| index.remove(hash)))
    }

    /// Whether the chunk artifact is present in the store.
    ///
    /// Hashes that are not a single plain path component are treated as missing.
    pub async fn chunk_exists(&self, chunk_hash: &str) -> bool {
        if !is_plain_component(chunk_hash) {
            tracing::warn!("Rejecting suspicious chunk reference {:?}", chunk_hash);
            return false;
        }

        tokio::fs::try_exists(self.storage_dir.join(chunk_hash))
            .await
            .unwrap_or(false)
    }
}

fn is_plain_component(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.chars().any(|c| c.is_control())
}
