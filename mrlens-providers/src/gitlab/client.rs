//! GitLab client.

use std::sync::Arc;

use async_trait::async_trait;
use mrlens_core::{MergeRequest, MrStats, ProviderKind};
use mrlens_fetch::{FetchError, HttpClient};
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, instrument};

use super::api::{self, GitLabCommit, GitLabMergeRequest};
use crate::error::ProviderError;
use crate::provider::MergeRequestProvider;
use crate::references::gitlab_reference;
use crate::selection::select;
use crate::state::{ClientConfig, ClientState};

// ============================================================================
// GitLab Client
// ============================================================================

/// Merge request lookups against a GitLab instance.
#[derive(Debug)]
pub struct GitLabClient {
    http: Arc<HttpClient>,
    state: ClientState,
}

impl GitLabClient {
    /// Creates a client for gitlab.com without a token.
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self {
            http,
            state: ClientState::new(ProviderKind::GitLab, ProviderKind::GitLab.default_host(), None),
        }
    }

    /// Sets the instance host.
    #[must_use]
    pub fn with_host(self, host: &str) -> Self {
        self.state.set_host(host);
        self
    }

    /// Sets the access token.
    #[must_use]
    pub fn with_token(self, token: Option<String>) -> Self {
        self.state.set_credential(token);
        self
    }

    fn headers(token: &str) -> Result<HeaderMap, FetchError> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(token)
            .map_err(|e| FetchError::Unknown(format!("Invalid token header: {e}")))?;
        headers.insert(api::TOKEN_HEADER, value);
        Ok(headers)
    }

    async fn list_for_commit(
        &self,
        host: &str,
        token: &str,
        project_path: &str,
        sha: &str,
    ) -> Result<Vec<GitLabMergeRequest>, FetchError> {
        let url = format!(
            "{}/repository/commits/{sha}/merge_requests",
            api::project_url(host, project_path)
        );
        self.http.get_json(&url, Self::headers(token)?).await
    }

    async fn commit_message(
        &self,
        host: &str,
        token: &str,
        project_path: &str,
        sha: &str,
    ) -> Result<String, FetchError> {
        let url = format!(
            "{}/repository/commits/{sha}",
            api::project_url(host, project_path)
        );
        let commit: GitLabCommit = self.http.get_json(&url, Self::headers(token)?).await?;
        Ok(commit.message)
    }

    async fn merge_request(
        &self,
        host: &str,
        token: &str,
        project_path: &str,
        iid: u64,
    ) -> Result<GitLabMergeRequest, FetchError> {
        let url = format!(
            "{}/merge_requests/{iid}",
            api::project_url(host, project_path)
        );
        self.http.get_json(&url, Self::headers(token)?).await
    }

    async fn resolve_inner(
        &self,
        config: &ClientConfig,
        project_path: &str,
        sha: &str,
        host_override: Option<&str>,
    ) -> Result<Option<MergeRequest>, FetchError> {
        let token = config.require_token()?;
        let host = config.effective_host(host_override);

        let candidates = self.list_for_commit(host, token, project_path, sha).await?;
        debug!(count = candidates.len(), "Listed merge requests for commit");
        if let Some(mr) = select(candidates) {
            return Ok(Some(mr.into_merge_request()));
        }

        let message = self.commit_message(host, token, project_path, sha).await?;
        let Some(reference) = gitlab_reference(&message) else {
            debug!("No merge request reference in commit message");
            return Ok(None);
        };

        let target = reference.project_path.as_deref().unwrap_or(project_path);
        debug!(iid = reference.number, project = target, "Following commit message reference");
        match self.merge_request(host, token, target, reference.number).await {
            Ok(mr) => Ok(Some(mr.into_merge_request())),
            Err(FetchError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl MergeRequestProvider for GitLabClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::GitLab
    }

    fn host(&self) -> String {
        self.state.host()
    }

    fn has_credential(&self) -> bool {
        self.state.has_credential()
    }

    fn set_credential(&self, token: Option<String>) {
        self.state.set_credential(token);
    }

    #[instrument(skip(self), fields(provider = "gitlab"))]
    async fn resolve(
        &self,
        project_path: &str,
        sha: &str,
        host_override: Option<&str>,
    ) -> Result<Option<MergeRequest>, ProviderError> {
        let config = self.state.snapshot();
        self.resolve_inner(&config, project_path, sha, host_override)
            .await
            .map_err(|e| self.state.report(e))
    }

    #[instrument(skip(self), fields(provider = "gitlab"))]
    async fn fetch_stats(
        &self,
        project_path: &str,
        number: u64,
        host_override: Option<&str>,
    ) -> Result<MrStats, ProviderError> {
        let config = self.state.snapshot();
        let result: Result<MrStats, FetchError> = async {
            let token = config.require_token()?;
            let host = config.effective_host(host_override);
            let mr = self.merge_request(host, token, project_path, number).await?;
            Ok(mr.changes_count.map(MrStats::changes).unwrap_or_default())
        }
        .await;
        result.map_err(|e| self.state.report(e))
    }

    fn reset_error_state(&self) {
        self.state.reset_error_state();
    }
}

// ============================================================================
// Tests
// ============================================================================
