//! Core error types for `MrLens`.

use thiserror::Error;

/// Core error type for `MrLens` operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Provider identifier not recognised.
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// Remote URL could not be classified.
    #[error("Unsupported remote URL: {0}")]
    UnsupportedRemote(String),

    /// Invalid data from API response.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
