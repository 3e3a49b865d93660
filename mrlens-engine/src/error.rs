//! Engine error and event types.

use mrlens_core::ProviderKind;
use mrlens_fetch::{ErrorKind, FetchError};
use mrlens_providers::ProviderError;
use thiserror::Error;

/// A failed lookup, delivered to every handler registered with
/// [`Engine::on_error`](crate::Engine::on_error).
///
/// The lookup itself still settles (with no merge request) and the failure
/// is cached like a confirmed empty result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{provider} lookup for {sha} failed: {error}")]
pub struct LookupError {
    /// Provider that failed.
    pub provider: ProviderKind,
    /// Commit that was being resolved.
    pub sha: String,
    /// What went wrong.
    pub error: FetchError,
    /// True for the first credential error since the credential changed.
    pub should_surface: bool,
}

impl LookupError {
    pub(crate) fn new(provider: ProviderKind, sha: &str, error: ProviderError) -> Self {
        Self {
            provider,
            sha: sha.to_string(),
            error: error.error,
            should_surface: error.should_surface,
        }
    }

    /// Fieldless kind of the failure.
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

/// Errors returned by engine operations other than [`Engine::resolve`](crate::Engine::resolve).
#[derive(Debug, Error)]
pub enum EngineError {
    /// No registered provider claims the remote, or it cannot be parsed.
    #[error("Unsupported remote: {0}")]
    UnsupportedRemote(String),

    /// The provider kind is not registered.
    #[error("Provider not registered: {0}")]
    ProviderNotRegistered(ProviderKind),

    /// The commit has no cached merge request to enrich.
    #[error("No cached merge request for {0}")]
    NotCached(String),

    /// The provider call failed.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}
