//! Merge request types.
//!
//! A [`MergeRequest`] is immutable once constructed. Stats enrichment goes
//! through [`MergeRequest::with_stats`], which returns a new value so readers
//! holding the old one never observe a change.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::provider::ProviderKind;

// ============================================================================
// Merge Request
// ============================================================================

/// A resolved merge request (GitLab) or pull request (GitHub).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequest {
    /// The platform the request lives on.
    pub provider: ProviderKind,
    /// Provider-local sequence number (`!123` / `#123`).
    pub number: u64,
    /// Title.
    pub title: String,
    /// Browser URL.
    pub web_url: String,
    /// When the request was merged, if it was.
    pub merged_at: Option<DateTime<Utc>>,
    /// Provider-specific state ("merged", "opened", "closed", ...).
    pub state: String,
    /// Change-size metrics, populated lazily.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<MrStats>,
}

impl MergeRequest {
    /// Creates a merge request without merge timestamp or stats.
    pub fn new(
        provider: ProviderKind,
        number: u64,
        title: impl Into<String>,
        web_url: impl Into<String>,
        state: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            number,
            title: title.into(),
            web_url: web_url.into(),
            merged_at: None,
            state: state.into(),
            stats: None,
        }
    }

    /// Sets the merge timestamp.
    #[must_use]
    pub fn with_merged_at(mut self, merged_at: Option<DateTime<Utc>>) -> Self {
        self.merged_at = merged_at;
        self
    }

    /// Returns a copy carrying the given stats.
    #[must_use]
    pub fn with_stats(&self, stats: MrStats) -> Self {
        Self {
            stats: Some(stats),
            ..self.clone()
        }
    }

    /// Returns true if the request has been merged.
    pub fn is_merged(&self) -> bool {
        self.merged_at.is_some()
    }

    /// Short reference such as `!42` or `#42`.
    pub fn reference(&self) -> String {
        format!("{}{}", self.provider.reference_prefix(), self.number)
    }
}

// ============================================================================
// Stats
// ============================================================================

/// Change-size metrics for a merge request.
///
/// GitHub reports line and file counts; GitLab reports a single
/// `changes_count` string that may read like `"1000+"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MrStats {
    /// Lines added.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additions: Option<u64>,
    /// Lines removed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletions: Option<u64>,
    /// Files touched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_files: Option<u64>,
    /// Opaque change count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes_count: Option<String>,
}

impl MrStats {
    /// Stats expressed as line and file counts.
    pub fn lines(additions: u64, deletions: u64, changed_files: u64) -> Self {
        Self {
            additions: Some(additions),
            deletions: Some(deletions),
            changed_files: Some(changed_files),
            changes_count: None,
        }
    }

    /// Stats expressed as an opaque change count.
    pub fn changes(count: impl Into<String>) -> Self {
        Self {
            changes_count: Some(count.into()),
            ..Self::default()
        }
    }

    /// Returns true if no metric is set.
    pub fn is_empty(&self) -> bool {
        self.additions.is_none()
            && self.deletions.is_none()
            && self.changed_files.is_none()
            && self.changes_count.is_none()
    }

    /// One-line human summary, e.g. `+12 -3 (2 files)`.
    pub fn summary(&self) -> Option<String> {
        match (self.additions, self.deletions, &self.changes_count) {
            (Some(add), Some(del), _) => {
                let files = self
                    .changed_files
                    .map(|n| format!(" ({n} files)"))
                    .unwrap_or_default();
                Some(format!("+{add} -{del}{files}"))
            }
            (_, _, Some(count)) => Some(format!("{count} changes")),
            _ => None,
        }
    }
}

// ============================================================================
// Timestamps
// ============================================================================

/// Parses an API timestamp.
///
/// Accepts RFC 3339 (`2025-01-01T10:00:00Z`, `2025-01-01T10:00:00.000+02:00`)
/// and bare dates (`2025-01-01`, taken as midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Serde helper for nullable timestamp fields in API payloads.
///
/// Unparseable values deserialize to `None` rather than failing the payload.
///
/// # Errors
///
/// Returns an error only if the field is neither null nor a string.
pub fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}
