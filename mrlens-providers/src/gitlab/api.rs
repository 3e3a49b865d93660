//! GitLab API response types.

use chrono::{DateTime, Utc};
use mrlens_core::{MergeRequest, MrStats, ProviderKind, deserialize_optional_timestamp};
use serde::Deserialize;

use crate::selection::Candidate;

// ============================================================================
// Constants
// ============================================================================

/// API prefix appended to the instance host.
pub const API_PREFIX: &str = "/api/v4";

/// Header carrying the personal access token.
pub const TOKEN_HEADER: &str = "PRIVATE-TOKEN";

/// Builds `{host}/api/v4/projects/{encoded path}`.
pub fn project_url(host: &str, project_path: &str) -> String {
    format!(
        "{host}{API_PREFIX}/projects/{}",
        urlencoding::encode(project_path)
    )
}

// ============================================================================
// Response Types
// ============================================================================

/// Merge request as returned by the commit and MR endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabMergeRequest {
    /// Project-local id (`!iid`).
    pub iid: u64,
    /// Title.
    #[serde(default)]
    pub title: String,
    /// "opened", "merged", "closed", "locked".
    #[serde(default)]
    pub state: String,
    /// Browser URL.
    #[serde(default)]
    pub web_url: String,
    /// Merge time.
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub merged_at: Option<DateTime<Utc>>,
    /// Changed file count; a string because large MRs report `"1000+"`.
    #[serde(default)]
    pub changes_count: Option<String>,
}

impl GitLabMergeRequest {
    /// Converts to the domain type.
    pub fn into_merge_request(self) -> MergeRequest {
        let stats = self.changes_count.clone().map(MrStats::changes);
        let mut mr = MergeRequest::new(ProviderKind::GitLab, self.iid, self.title, self.web_url, self.state)
            .with_merged_at(self.merged_at);
        mr.stats = stats;
        mr
    }
}

impl Candidate for GitLabMergeRequest {
    fn merged_at(&self) -> Option<DateTime<Utc>> {
        if self.state == "merged" {
            self.merged_at
        } else {
            None
        }
    }
}

/// Commit as returned by `/repository/commits/{sha}`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabCommit {
    /// Full commit message.
    #[serde(default)]
    pub message: String,
}
