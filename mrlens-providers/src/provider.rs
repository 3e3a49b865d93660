//! The provider capability trait.

use async_trait::async_trait;
use mrlens_core::{MergeRequest, MrStats, ProviderKind, host_matches, looks_like_provider};

use crate::error::ProviderError;

/// A hosting platform that can map commits to merge requests.
///
/// Implementors own their host URL and optional token. Every network
/// failure is returned as a [`ProviderError`]; nothing here panics on bad
/// input or bad responses.
///
/// ## Implementing a Provider
///
/// ```ignore
/// #[async_trait]
/// impl MergeRequestProvider for MyClient {
///     fn kind(&self) -> ProviderKind { ProviderKind::GitLab }
///     fn host(&self) -> String { self.state.host() }
///     // ...
/// }
/// ```
#[async_trait]
pub trait MergeRequestProvider: Send + Sync {
    /// Which platform this client talks to.
    fn kind(&self) -> ProviderKind;

    /// Configured instance base URL, e.g. `https://gitlab.com`.
    fn host(&self) -> String;

    /// Returns true if a token is configured. Presence only; never validated.
    fn has_credential(&self) -> bool;

    /// Replaces the token. Re-arms the one-shot error surfacing.
    fn set_credential(&self, token: Option<String>);

    /// Returns true if this provider handles the given remote.
    fn claims(&self, remote_url: &str) -> bool {
        looks_like_provider(remote_url, self.kind().id(), Some(&self.host()))
    }

    /// Returns true if `host` is this provider's configured instance.
    fn is_configured_host(&self, host: &str) -> bool {
        host_matches(host, &self.host())
    }

    /// Finds the request that introduced `sha` in `project_path`.
    ///
    /// `Ok(None)` means the provider confirmed there is none.
    async fn resolve(
        &self,
        project_path: &str,
        sha: &str,
        host_override: Option<&str>,
    ) -> Result<Option<MergeRequest>, ProviderError>;

    /// Fetches change-size stats for request `number`.
    async fn fetch_stats(
        &self,
        project_path: &str,
        number: u64,
        host_override: Option<&str>,
    ) -> Result<MrStats, ProviderError>;

    /// Clears the "already surfaced" flag so the next credential error is
    /// reported again.
    fn reset_error_state(&self);
}
