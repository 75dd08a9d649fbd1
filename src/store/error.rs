//! Error types for registry persistence.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from loading or saving the website registry.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to read or write the registry file.
    #[error("Failed to access registry file {path}: {source}")]
    Io {
        /// Path of the registry file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The registry file contains invalid JSON.
    #[error("Failed to parse registry file {path}: {source}")]
    Parse {
        /// Path of the registry file.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// Serializing the registry failed.
    #[error("Failed to serialize registry: {0}")]
    Serialize(#[from] serde_json::Error),
}
