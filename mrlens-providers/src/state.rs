//! Mutable client state shared by the provider implementations.
//!
//! Host and token live behind one lock so a fetch reads both atomically at
//! its start; rotating either only affects fetches started afterwards.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use mrlens_core::ProviderKind;
use mrlens_fetch::FetchError;
use tracing::{debug, warn};

use crate::error::ProviderError;

// ============================================================================
// Client Config
// ============================================================================

/// Host and token captured at the start of a fetch.
#[derive(Clone)]
pub struct ClientConfig {
    /// Instance base URL, without trailing slash.
    pub host: String,
    /// Access token, if any.
    pub token: Option<String>,
}

impl ClientConfig {
    /// Returns the host to use for this fetch.
    pub fn effective_host<'a>(&'a self, host_override: Option<&'a str>) -> &'a str {
        host_override.map_or(self.host.as_str(), |h| h.trim_end_matches('/'))
    }

    /// Returns the token or a `NoCredential` error.
    pub fn require_token(&self) -> Result<&str, FetchError> {
        self.token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(FetchError::NoCredential)
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

// ============================================================================
// Client State
// ============================================================================

/// Credential, host and the one-shot "already surfaced" flag of a client.
#[derive(Debug)]
pub struct ClientState {
    kind: ProviderKind,
    config: RwLock<ClientConfig>,
    surfaced: AtomicBool,
}

impl ClientState {
    /// Creates state for the given provider and host.
    pub fn new(kind: ProviderKind, host: impl Into<String>, token: Option<String>) -> Self {
        Self {
            kind,
            config: RwLock::new(ClientConfig {
                host: normalize_host(&host.into()),
                token: token.filter(|t| !t.is_empty()),
            }),
            surfaced: AtomicBool::new(false),
        }
    }

    /// Returns a copy of the current host and token.
    pub fn snapshot(&self) -> ClientConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the configured host.
    pub fn host(&self) -> String {
        self.snapshot().host
    }

    /// Replaces the configured host.
    pub fn set_host(&self, host: &str) {
        self.config
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .host = normalize_host(host);
    }

    /// Returns true if a non-empty token is configured.
    pub fn has_credential(&self) -> bool {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .token
            .is_some()
    }

    /// Replaces the token and starts a new credential lifetime.
    pub fn set_credential(&self, token: Option<String>) {
        self.config
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .token = token.filter(|t| !t.is_empty());
        self.reset_error_state();
        debug!(provider = %self.kind, "Credential updated");
    }

    /// Re-arms the one-shot surfacing flag.
    pub fn reset_error_state(&self) {
        self.surfaced.store(false, Ordering::SeqCst);
    }

    /// Wraps a fetch error, deciding whether it should be surfaced.
    pub fn report(&self, error: FetchError) -> ProviderError {
        if error.is_credential_error() {
            let first = !self.surfaced.swap(true, Ordering::SeqCst);
            if first {
                warn!(provider = %self.kind, error = %error, "Credential problem");
            } else {
                debug!(provider = %self.kind, error = %error, "Credential problem already surfaced");
            }
            ProviderError {
                error,
                should_surface: first,
            }
        } else {
            debug!(provider = %self.kind, error = %error, "Provider call failed");
            ProviderError::quiet(error)
        }
    }
}

/// Trims whitespace and trailing slashes; bare hosts get `https://`.
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_error_surfaces_once() {
        let state = ClientState::new(ProviderKind::GitLab, "https://gitlab.com", None);
        assert!(state.report(FetchError::NoCredential).should_surface);
        assert!(!state.report(FetchError::NoCredential).should_surface);
        assert!(!state
            .report(FetchError::InvalidCredential { status: 401 })
            .should_surface);
    }

    #[test]
    fn test_set_credential_rearms_flag() {
        let state = ClientState::new(ProviderKind::GitHub, "github.com", None);
        assert!(state.report(FetchError::NoCredential).should_surface);
        state.set_credential(Some("tok".to_string()));
        assert!(state.has_credential());
        assert!(state
            .report(FetchError::InvalidCredential { status: 403 })
            .should_surface);
    }

    #[test]
    fn test_other_errors_never_surface() {
        let state = ClientState::new(ProviderKind::GitHub, "github.com", None);
        assert!(!state.report(FetchError::RateLimited { retry_after: None }).should_surface);
        assert!(!state.report(FetchError::NotFound).should_surface);
        // The flag is untouched by non-credential errors.
        assert!(state.report(FetchError::NoCredential).should_surface);
    }

    #[test]
    fn test_host_normalization() {
        let state = ClientState::new(ProviderKind::GitLab, " gitlab.acme.io/ ", Some(String::new()));
        assert_eq!(state.host(), "https://gitlab.acme.io");
        assert!(!state.has_credential());
        state.set_host("http://127.0.0.1:8080/");
        assert_eq!(state.host(), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_effective_host_and_token() {
        let config = ClientState::new(ProviderKind::GitLab, "https://gitlab.com", None).snapshot();
        assert_eq!(config.effective_host(None), "https://gitlab.com");
        assert_eq!(config.effective_host(Some("https://git.corp/")), "https://git.corp");
        assert_eq!(config.require_token(), Err(FetchError::NoCredential));
        assert!(!format!("{config:?}").contains("tok"));
    }
}
