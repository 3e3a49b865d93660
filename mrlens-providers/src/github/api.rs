//! GitHub API response types.

use chrono::{DateTime, Utc};
use mrlens_core::{MergeRequest, MrStats, ProviderKind, deserialize_optional_timestamp};
use serde::Deserialize;
use url::Url;

use crate::selection::Candidate;

// ============================================================================
// Constants
// ============================================================================

/// API host for github.com.
pub const GITHUB_API_BASE: &str = "https://api.github.com";

/// Media type requested from the API.
pub const ACCEPT_VALUE: &str = "application/vnd.github+json";

/// GitHub API version header.
pub const GITHUB_API_VERSION: &str = "2022-11-28";

/// Derives the API base URL from a git host URL.
///
/// `https://github.com` maps to `https://api.github.com`; any other host
/// gets an `api.` prefix. Hosts that already start with `api.` are kept.
pub fn api_base(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    let Ok(url) = Url::parse(host) else {
        return host.to_string();
    };
    let Some(name) = url.host_str() else {
        return host.to_string();
    };

    let name = name.to_ascii_lowercase();
    if name == "github.com" {
        return GITHUB_API_BASE.to_string();
    }
    if name.starts_with("api.") {
        return host.to_string();
    }

    let port = url.port().map(|p| format!(":{p}")).unwrap_or_default();
    format!("{}://api.{name}{port}", url.scheme())
}

// ============================================================================
// Response Types
// ============================================================================

/// Pull request as returned by the commit-pulls and pulls endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubPullRequest {
    /// Repository-local number (`#n`).
    pub number: u64,
    /// Title.
    #[serde(default)]
    pub title: String,
    /// "open" or "closed"; merged PRs are closed with `merged_at` set.
    #[serde(default)]
    pub state: String,
    /// Browser URL.
    #[serde(default)]
    pub html_url: String,
    /// Merge time.
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub merged_at: Option<DateTime<Utc>>,
    /// Lines added. Only present on the single-PR endpoint.
    #[serde(default)]
    pub additions: Option<u64>,
    /// Lines removed. Only present on the single-PR endpoint.
    #[serde(default)]
    pub deletions: Option<u64>,
    /// Files changed. Only present on the single-PR endpoint.
    #[serde(default)]
    pub changed_files: Option<u64>,
}

impl GitHubPullRequest {
    /// Stats carried by the payload, if any.
    pub fn stats(&self) -> MrStats {
        MrStats {
            additions: self.additions,
            deletions: self.deletions,
            changed_files: self.changed_files,
            changes_count: None,
        }
    }

    /// Converts to the domain type. Merged PRs report state `"merged"`.
    pub fn into_merge_request(self) -> MergeRequest {
        let stats = self.stats();
        let state = if self.merged_at.is_some() {
            "merged".to_string()
        } else {
            self.state
        };
        let mut mr = MergeRequest::new(ProviderKind::GitHub, self.number, self.title, self.html_url, state)
            .with_merged_at(self.merged_at);
        if !stats.is_empty() {
            mr.stats = Some(stats);
        }
        mr
    }
}

impl Candidate for GitHubPullRequest {
    fn merged_at(&self) -> Option<DateTime<Utc>> {
        self.merged_at
    }
}

/// Commit as returned by `/repos/{path}/commits/{sha}`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubCommit {
    /// Git-level commit data.
    pub commit: GitHubCommitDetail,
}

/// Inner commit object.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubCommitDetail {
    /// Full commit message.
    #[serde(default)]
    pub message: String,
}
