//! Lookup results.

use mrlens_core::MergeRequest;
use serde::Serialize;
use std::sync::Arc;

/// Outcome of one [`Engine::resolve`](crate::Engine::resolve) call.
///
/// | `mr` | `from_cache` | `pending` | Meaning |
/// |------|--------------|-----------|---------|
/// | `Some` | either | `false` | Resolved |
/// | `None` | either | `false` | No merge request (or the lookup failed) |
/// | `None` | `false` | `true` | Unavailable: cancelled or the engine was disposed |
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LookupResult {
    /// The merge request, if one was found.
    pub mr: Option<Arc<MergeRequest>>,
    /// True if served from the cache without waiting on a fetch.
    pub from_cache: bool,
    /// True if this caller stopped waiting before the lookup settled.
    pub pending: bool,
}

impl LookupResult {
    /// A cache hit.
    pub fn cached(mr: Option<Arc<MergeRequest>>) -> Self {
        Self {
            mr,
            from_cache: true,
            pending: false,
        }
    }

    /// A settled fetch.
    pub fn fetched(mr: Option<Arc<MergeRequest>>) -> Self {
        Self {
            mr,
            from_cache: false,
            pending: false,
        }
    }

    /// Nothing to report: unsupported remote.
    pub fn none() -> Self {
        Self::default()
    }

    /// The caller gave up before the lookup settled.
    pub fn pending() -> Self {
        Self {
            mr: None,
            from_cache: false,
            pending: true,
        }
    }

    /// Returns true if a merge request was found.
    pub fn is_found(&self) -> bool {
        self.mr.is_some()
    }
}
