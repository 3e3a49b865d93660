//! HTTP client with tracing and status mapping.
//!
//! This module provides a wrapped HTTP client that adds:
//! - Request/response tracing
//! - A shared user agent and timeout
//! - [`HttpClient::get_json`], which maps non-2xx statuses onto [`FetchError`]

use reqwest::{Client, Response, header, header::HeaderMap};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::FetchError;

/// Default request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User agent string for `MrLens`.
pub const USER_AGENT: &str = concat!("MrLens/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// HTTP Client
// ============================================================================

/// HTTP client wrapper with tracing.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
}

impl HttpClient {
    /// Creates a new HTTP client with default settings.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a new HTTP client with a custom timeout.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built. This should only occur
    /// if the system's TLS/SSL configuration is fundamentally broken,
    /// making network operations impossible.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_options(timeout, USER_AGENT)
    }

    /// Creates a new HTTP client with a custom timeout and user agent.
    ///
    /// # Panics
    ///
    /// See [`HttpClient::with_timeout`].
    pub fn with_options(timeout: Duration, user_agent: &str) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .unwrap_or_else(|e| {
                panic!(
                    "Failed to create HTTP client: {e}. \
                    This usually indicates a broken TLS/SSL configuration."
                )
            });

        Self { inner: client }
    }

    /// Performs a GET request and decodes a JSON body.
    ///
    /// Non-2xx statuses are mapped with [`FetchError::from_status`]; transport
    /// failures become [`FetchError::Network`].
    ///
    /// # Errors
    ///
    /// Returns the mapped [`FetchError`] for any failed request or undecodable body.
    #[instrument(skip(self, headers), fields(url = %url))]
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: HeaderMap,
    ) -> Result<T, FetchError> {
        let response = self.inner.get(url).headers(headers).send().await?;
        let status = response.status();
        debug!(status = %status, "Response received");

        if let Some(error) = FetchError::from_status(status, retry_after_secs(&response)) {
            match &error {
                FetchError::NotFound => debug!("Resource not found"),
                FetchError::RateLimited { retry_after } => {
                    warn!(retry_after = ?retry_after, "Rate limited");
                }
                FetchError::InvalidCredential { .. } => warn!(status = %status, "Credential rejected"),
                _ => warn!(status = %status, "Unexpected status"),
            }
            return Err(error);
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            warn!(error = %e, "Failed to parse response");
            FetchError::from(e)
        })
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

/// `Retry-After` in seconds, when the server sent one.
fn retry_after_secs(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

// ============================================================================
// Tests
// ============================================================================
