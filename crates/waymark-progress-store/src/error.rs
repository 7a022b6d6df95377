//! Storage failures, surfaced to the engine as persistence errors.

use std::path::PathBuf;

use thiserror::Error;
use waymark_core::error::DomainError;

/// A failed read or write of a progress record.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The file system refused the operation.
    #[error("i/o error on {path}: {source}")]
    Io {
        /// Record or directory path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The record exists but is not valid progress JSON.
    #[error("corrupt progress record {path}: {source}")]
    Corrupt {
        /// Record path.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// The record could not be encoded.
    #[error("cannot encode progress record: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<StoreError> for DomainError {
    fn from(error: StoreError) -> Self {
        Self::Persistence(error.to_string())
    }
}
