//! Fetch error types.
//!
//! [`FetchError`] is the error taxonomy every provider reports. It is `Clone`
//! so one settled failure can be handed to every waiter and error handler.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Main Fetch Error
// ============================================================================

/// Error type for provider fetch operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// No access token is configured for the provider.
    #[error("No credential configured")]
    NoCredential,

    /// The provider rejected the token (HTTP 401/403).
    #[error("Credential rejected (HTTP {status})")]
    InvalidCredential {
        /// HTTP status returned.
        status: u16,
    },

    /// Rate limited by the provider (HTTP 429).
    #[error("Rate limited, retry after {retry_after:?} seconds")]
    RateLimited {
        /// Seconds to wait before retrying, if the provider said.
        retry_after: Option<u64>,
    },

    /// Transport failure: DNS, connect, timeout, reset.
    #[error("Network error: {0}")]
    Network(String),

    /// Commit or project does not exist on the provider (HTTP 404).
    #[error("Not found")]
    NotFound,

    /// Any other unexpected status or malformed payload.
    #[error("Unexpected response: {0}")]
    Unknown(String),
}

impl FetchError {
    /// Maps a non-success HTTP status to its taxonomy entry.
    ///
    /// Returns `None` for 2xx statuses.
    pub fn from_status(status: StatusCode, retry_after: Option<u64>) -> Option<Self> {
        if status.is_success() {
            return None;
        }

        Some(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::InvalidCredential {
                status: status.as_u16(),
            },
            StatusCode::NOT_FOUND => Self::NotFound,
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited { retry_after },
            other => Self::Unknown(format!("HTTP {other}")),
        })
    }

    /// Returns the fieldless kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoCredential => ErrorKind::NoCredential,
            Self::InvalidCredential { .. } => ErrorKind::InvalidCredential,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Network(_) => ErrorKind::NetworkError,
            Self::NotFound => ErrorKind::NotFound,
            Self::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Returns true for errors the user can fix by changing the token.
    pub fn is_credential_error(&self) -> bool {
        matches!(self, Self::NoCredential | Self::InvalidCredential { .. })
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Network(format!("Request timed out: {err}"))
        } else if err.is_connect() {
            Self::Network(format!("Connection failed: {err}"))
        } else if err.is_decode() {
            Self::Unknown(format!("Invalid response body: {err}"))
        } else if let Some(status) = err.status() {
            Self::from_status(status, None).unwrap_or_else(|| Self::Unknown(err.to_string()))
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Unknown(format!("JSON error: {err}"))
    }
}

// ============================================================================
// Error Kind
// ============================================================================

/// Fieldless mirror of [`FetchError`] for consumers that only branch on kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No token configured.
    NoCredential,
    /// Token rejected.
    InvalidCredential,
    /// Rate limited.
    RateLimited,
    /// Transport failure.
    NetworkError,
    /// Commit or project missing.
    NotFound,
    /// Anything else.
    Unknown,
}

impl ErrorKind {
    /// Returns the identifier for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoCredential => "no_credential",
            Self::InvalidCredential => "invalid_credential",
            Self::RateLimited => "rate_limited",
            Self::NetworkError => "network_error",
            Self::NotFound => "not_found",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
