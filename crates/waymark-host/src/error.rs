//! Waymark Host: error types.

use thiserror::Error;
use waymark_core::error::DomainError;

/// Startup and runtime errors for the console host.
#[derive(Debug, Error)]
pub enum HostError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The scene catalog could not be loaded.
    #[error("catalog error: {0}")]
    Catalog(#[from] DomainError),

    /// Reading requests or writing output failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// An output line could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}
