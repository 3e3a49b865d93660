//! Provider error type.

use mrlens_fetch::{ErrorKind, FetchError};
use thiserror::Error;

/// A failed provider call.
///
/// Wraps the [`FetchError`] taxonomy with a `should_surface` flag. The flag is
/// only ever set for credential errors, and only on the first one reported
/// since the client's credential last changed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error}")]
pub struct ProviderError {
    /// The underlying failure.
    pub error: FetchError,
    /// Whether the user should be told about this failure.
    pub should_surface: bool,
}

impl ProviderError {
    /// Creates an error that is logged but not surfaced.
    pub fn quiet(error: FetchError) -> Self {
        Self {
            error,
            should_surface: false,
        }
    }

    /// Creates an error that should be surfaced to the user.
    pub fn surfaced(error: FetchError) -> Self {
        Self {
            error,
            should_surface: true,
        }
    }

    /// Returns the fieldless kind of the underlying error.
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

impl From<FetchError> for ProviderError {
    fn from(error: FetchError) -> Self {
        Self::quiet(error)
    }
}
