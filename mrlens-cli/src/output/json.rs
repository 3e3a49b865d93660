//! JSON output formatting.

use anyhow::Result;
use chrono::{DateTime, Utc};
use mrlens_core::{BlameLine, MergeRequest, MrStats};
use mrlens_engine::LookupResult;
use serde::{Serialize, Serializer};

// ============================================================================
// Output Types
// ============================================================================

/// JSON output for one lookup.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupOutput {
    pub sha: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub found: bool,
    pub from_cache: bool,
    pub pending: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_request: Option<MergeRequestOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A merge request or pull request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequestOutput {
    pub reference: String,
    pub number: u64,
    pub title: String,
    pub url: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_datetime_opt")]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<MrStats>,
}

impl From<&MergeRequest> for MergeRequestOutput {
    fn from(mr: &MergeRequest) -> Self {
        Self {
            reference: mr.reference(),
            number: mr.number,
            title: mr.title.clone(),
            url: mr.web_url.clone(),
            state: mr.state.clone(),
            merged_at: mr.merged_at,
            stats: mr.stats.clone(),
        }
    }
}

/// One blame line with its merge request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlameOutput {
    pub line: usize,
    pub sha: String,
    pub author: String,
    pub summary: String,
    pub uncommitted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_request: Option<MergeRequestOutput>,
}

/// One registered provider.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderOutput {
    pub id: String,
    pub name: String,
    pub host: String,
    pub enabled: bool,
    pub has_token: bool,
    pub token_env: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claims_remote: Option<bool>,
}

// ============================================================================
// Serialization helpers
// ============================================================================

#[allow(clippy::ref_option)]
fn serialize_datetime_opt<S>(dt: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match dt {
        Some(dt) => s.serialize_str(&dt.to_rfc3339()),
        None => s.serialize_none(),
    }
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Builds the output record for a lookup.
    pub fn lookup_output(
        sha: &str,
        provider: Option<&str>,
        result: &LookupResult,
        error: Option<String>,
    ) -> LookupOutput {
        LookupOutput {
            sha: sha.to_string(),
            provider: provider.map(str::to_string),
            found: result.is_found(),
            from_cache: result.from_cache,
            pending: result.pending,
            merge_request: result.mr.as_deref().map(MergeRequestOutput::from),
            error,
        }
    }

    /// Builds the output record for a blame line.
    pub fn blame_output(index: usize, line: &BlameLine, result: Option<&LookupResult>) -> BlameOutput {
        BlameOutput {
            line: index + 1,
            sha: line.sha.clone(),
            author: line.author.clone(),
            summary: line.summary.clone(),
            uncommitted: line.is_uncommitted(),
            merge_request: result
                .and_then(|r| r.mr.as_deref())
                .map(MergeRequestOutput::from),
        }
    }
}
