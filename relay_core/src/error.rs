//! Error types shared across the relay core.

use crate::registry::ConnectionId;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// The same connection handle was registered twice
    #[error("connection {0} is already registered")]
    DuplicateConnection(ConnectionId),
}

#[derive(Debug, Error)]
pub enum IndexError {
    /// The index file exists but is not a valid index document
    #[error("index {} is unreadable: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read index {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
