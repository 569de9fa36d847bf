//! Error types for the course mirror.

use std::path::PathBuf;
use thiserror::Error;

/// Local filesystem and state-file failures.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to access {}: {source}", path.display())]
    PathIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

impl StorageError {
    pub(crate) fn at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::PathIo {
            path: path.into(),
            source,
        }
    }
}

/// Crate-wide error.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Fatal: raised before any sync work, nothing is persisted.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("Catalog request failed: {0}")]
    CatalogError(String),

    /// Per-file and non-fatal; the key is retried on the next run.
    #[error("File fetch failed: {0}")]
    FetchFailed(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
