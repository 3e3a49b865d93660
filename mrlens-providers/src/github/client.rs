//! GitHub client.

use std::sync::Arc;

use async_trait::async_trait;
use mrlens_core::{MergeRequest, MrStats, ProviderKind};
use mrlens_fetch::{FetchError, HttpClient};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::{debug, instrument};

use super::api::{self, GitHubCommit, GitHubPullRequest};
use crate::error::ProviderError;
use crate::provider::MergeRequestProvider;
use crate::references::github_reference;
use crate::selection::select;
use crate::state::{ClientConfig, ClientState};

// ============================================================================
// GitHub Client
// ============================================================================

/// Pull request lookups against github.com or GitHub Enterprise.
#[derive(Debug)]
pub struct GitHubClient {
    http: Arc<HttpClient>,
    state: ClientState,
    api_base: Option<String>,
}

impl GitHubClient {
    /// Creates a client for github.com without a token.
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self {
            http,
            state: ClientState::new(ProviderKind::GitHub, ProviderKind::GitHub.default_host(), None),
            api_base: None,
        }
    }

    /// Sets the git host. The API base is derived from it unless set explicitly.
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

    /// Pins the API base URL for the configured host.
    #[must_use]
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = Some(api_base.trim().trim_end_matches('/').to_string());
        self
    }

    fn api_base_for(&self, config: &ClientConfig, host_override: Option<&str>) -> String {
        match (host_override, &self.api_base) {
            (Some(host), _) => api::api_base(host),
            (None, Some(pinned)) => pinned.clone(),
            (None, None) => api::api_base(&config.host),
        }
    }

    fn headers(token: &str) -> Result<HeaderMap, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(api::ACCEPT_VALUE));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(api::GITHUB_API_VERSION),
        );
        let auth = HeaderValue::from_str(&format!("token {token}"))
            .map_err(|e| FetchError::Unknown(format!("Invalid token header: {e}")))?;
        headers.insert(AUTHORIZATION, auth);
        Ok(headers)
    }

    async fn pulls_for_commit(
        &self,
        base: &str,
        token: &str,
        project_path: &str,
        sha: &str,
    ) -> Result<Vec<GitHubPullRequest>, FetchError> {
        let url = format!("{base}/repos/{project_path}/commits/{sha}/pulls");
        self.http.get_json(&url, Self::headers(token)?).await
    }

    async fn commit_message(
        &self,
        base: &str,
        token: &str,
        project_path: &str,
        sha: &str,
    ) -> Result<String, FetchError> {
        let url = format!("{base}/repos/{project_path}/commits/{sha}");
        let commit: GitHubCommit = self.http.get_json(&url, Self::headers(token)?).await?;
        Ok(commit.commit.message)
    }

    async fn pull(
        &self,
        base: &str,
        token: &str,
        project_path: &str,
        number: u64,
    ) -> Result<GitHubPullRequest, FetchError> {
        let url = format!("{base}/repos/{project_path}/pulls/{number}");
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
        let base = self.api_base_for(config, host_override);

        let candidates = self.pulls_for_commit(&base, token, project_path, sha).await?;
        debug!(count = candidates.len(), "Listed pull requests for commit");
        if let Some(pr) = select(candidates) {
            return Ok(Some(pr.into_merge_request()));
        }

        let message = self.commit_message(&base, token, project_path, sha).await?;
        let Some(reference) = github_reference(&message) else {
            debug!("No pull request reference in commit message");
            return Ok(None);
        };

        debug!(number = reference.number, "Following commit message reference");
        match self.pull(&base, token, project_path, reference.number).await {
            Ok(pr) => Ok(Some(pr.into_merge_request())),
            Err(FetchError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl MergeRequestProvider for GitHubClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::GitHub
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

    #[instrument(skip(self), fields(provider = "github"))]
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

    #[instrument(skip(self), fields(provider = "github"))]
    async fn fetch_stats(
        &self,
        project_path: &str,
        number: u64,
        host_override: Option<&str>,
    ) -> Result<MrStats, ProviderError> {
        let config = self.state.snapshot();
        let result: Result<MrStats, FetchError> = async {
            let token = config.require_token()?;
            let base = self.api_base_for(&config, host_override);
            let pr = self.pull(&base, token, project_path, number).await?;
            Ok(pr.stats())
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
