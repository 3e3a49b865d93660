//! Engine counters.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of the engine counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Lookups answered from the cache.
    pub cache_hits: u64,
    /// Lookups that attached to a fetch already in flight.
    pub coalesced: u64,
    /// Fetches started.
    pub fetches: u64,
    /// Waiters that stopped waiting before their fetch settled.
    pub cancelled: u64,
    /// Fetches that settled with an error.
    pub errors: u64,
    /// Fetches currently in flight.
    pub in_flight: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub cache_hits: AtomicU64,
    pub coalesced: AtomicU64,
    pub fetches: AtomicU64,
    pub cancelled: AtomicU64,
    pub errors: AtomicU64,
}

impl Counters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, in_flight: usize) -> EngineStats {
        EngineStats {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            in_flight: in_flight as u64,
        }
    }
}
