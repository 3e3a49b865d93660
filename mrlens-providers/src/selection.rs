//! Candidate selection policy.
//!
//! A commit can be associated with several merge requests (cherry-picks,
//! re-opened branches, forks). The one that introduced the change is the
//! earliest merged; when nothing was merged the first raw entry is used.

use chrono::{DateTime, Utc};

/// A merge/pull request candidate returned by a provider listing.
pub trait Candidate {
    /// Merge timestamp, if the candidate counts as merged.
    ///
    /// Implementations return `None` for candidates that are not merged even
    /// if the payload carries a timestamp.
    fn merged_at(&self) -> Option<DateTime<Utc>>;
}

/// Picks the earliest merged candidate, else the first raw one.
///
/// Ties on the merge timestamp keep list order.
pub fn select<T: Candidate>(candidates: Vec<T>) -> Option<T> {
    let earliest = candidates
        .iter()
        .enumerate()
        .filter_map(|(index, c)| c.merged_at().map(|ts| (ts, index)))
        .min()
        .map(|(_, index)| index);

    let index = earliest.unwrap_or(0);
    candidates.into_iter().nth(index)
}
