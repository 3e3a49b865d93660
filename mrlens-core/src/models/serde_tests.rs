//! Serde serialization/deserialization tests for core types.

use chrono::{TimeZone, Utc};

use crate::{BlameLine, MergeRequest, MrStats, ProviderKind};

// ============================================================================
// ProviderKind Serde Tests
// ============================================================================

#[test]
fn test_provider_kind_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&ProviderKind::GitLab).unwrap(), r#""gitlab""#);
    assert_eq!(serde_json::to_string(&ProviderKind::GitHub).unwrap(), r#""github""#);
}

#[test]
fn test_provider_kind_invalid_deserialize() {
    let result: Result<ProviderKind, _> = serde_json::from_str(r#""bitbucket""#);
    assert!(result.is_err());
}

// ============================================================================
// MergeRequest Serde Tests
// ============================================================================

#[test]
fn test_merge_request_omits_missing_stats() {
    let mr = MergeRequest::new(ProviderKind::GitLab, 12, "Add cache", "https://gitlab.com/g/p/-/merge_requests/12", "merged")
        .with_merged_at(Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()));

    let json = serde_json::to_value(&mr).unwrap();
    assert_eq!(json["provider"], "gitlab");
    assert_eq!(json["number"], 12);
    assert!(json.get("stats").is_none());
}

#[test]
fn test_merge_request_with_stats_roundtrip() {
    let mr = MergeRequest::new(ProviderKind::GitHub, 3, "Docs", "https://github.com/o/r/pull/3", "closed")
        .with_stats(MrStats::lines(10, 2, 1));

    let json = serde_json::to_string(&mr).unwrap();
    let parsed: MergeRequest = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, mr);
}

#[test]
fn test_stats_skip_unset_fields() {
    let json = serde_json::to_value(MrStats::changes("42")).unwrap();
    assert_eq!(json, serde_json::json!({ "changes_count": "42" }));
}

// ============================================================================
// BlameLine Serde Tests
// ============================================================================

#[test]
fn test_blame_line_tolerates_missing_fields() {
    let line: BlameLine = serde_json::from_str(r#"{"sha":"abc123"}"#).unwrap();
    assert_eq!(line.sha, "abc123");
    assert!(line.author.is_empty());
}
