//! Time-boxed lookup result cache.
//!
//! Maps `(provider, sha)` to either a merge request or an explicit "no merge
//! request" marker. Entries expire lazily on read. A generation counter is
//! bumped by every [`ResultCache::invalidate_all`] so writers that started
//! before an invalidation can be told apart from those that started after.

use mrlens_core::{MergeRequest, MrStats, ProviderKind};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::signal::RepositorySignal;

// ============================================================================
// Types
// ============================================================================

/// Result of a cache read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// Never looked up, expired or invalidated. Fetch.
    Absent,
    /// Confirmed that no merge request exists. Do not refetch.
    Empty,
    /// A merge request.
    Found(Arc<MergeRequest>),
}

impl CacheLookup {
    /// Returns true unless [`CacheLookup::Absent`].
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Absent)
    }

    /// The cached value, `None` for absent or empty.
    pub fn merge_request(&self) -> Option<Arc<MergeRequest>> {
        match self {
            Self::Found(mr) => Some(Arc::clone(mr)),
            Self::Absent | Self::Empty => None,
        }
    }
}

type CacheKey = (ProviderKind, String);

#[derive(Debug)]
struct Entry {
    value: Option<Arc<MergeRequest>>,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<CacheKey, Entry>,
    generation: u64,
}

// ============================================================================
// Result Cache
// ============================================================================

/// TTL cache of lookup results.
#[derive(Debug)]
pub struct ResultCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
    watchers: Mutex<Vec<JoinHandle<()>>>,
}

impl ResultCache {
    /// Creates a cache using the system clock.
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    /// Creates a cache with a custom clock.
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            inner: Mutex::new(Inner::default()),
            watchers: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn key(kind: ProviderKind, sha: &str) -> CacheKey {
        (kind, sha.to_string())
    }

    /// Configured TTL. Zero means caching is disabled.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns true if entries are ever stored.
    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Reads an entry, evicting it if it has expired.
    pub fn get(&self, kind: ProviderKind, sha: &str) -> CacheLookup {
        let now = self.clock.now();
        let key = Self::key(kind, sha);
        let mut inner = self.lock();

        let Some(entry) = inner.entries.get(&key) else {
            return CacheLookup::Absent;
        };
        if entry.expires_at > now {
            return match &entry.value {
                Some(mr) => CacheLookup::Found(Arc::clone(mr)),
                None => CacheLookup::Empty,
            };
        }

        inner.entries.remove(&key);
        debug!(provider = %kind, sha, "Cache entry expired");
        CacheLookup::Absent
    }

    /// Stores a result. `None` records "no merge request". No-op when the
    /// TTL is zero.
    pub fn set(&self, kind: ProviderKind, sha: &str, value: Option<Arc<MergeRequest>>) {
        if !self.is_enabled() {
            return;
        }
        let expires_at = self.clock.now() + self.ttl;
        self.lock()
            .entries
            .insert(Self::key(kind, sha), Entry { value, expires_at });
    }

    /// Stores a result only if no invalidation happened since `generation`
    /// was read. Returns true if the entry was written.
    pub fn set_if_generation(
        &self,
        kind: ProviderKind,
        sha: &str,
        value: Option<Arc<MergeRequest>>,
        generation: u64,
    ) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let expires_at = self.clock.now() + self.ttl;
        let mut inner = self.lock();
        if inner.generation != generation {
            debug!(provider = %kind, sha, "Skipping cache write after invalidation");
            return false;
        }
        inner
            .entries
            .insert(Self::key(kind, sha), Entry { value, expires_at });
        true
    }

    /// Swaps in a copy of the cached merge request carrying `stats`.
    ///
    /// Succeeds only for a live entry holding a merge request. The expiry is
    /// kept; readers holding the previous value are unaffected.
    pub fn update_stats(&self, kind: ProviderKind, sha: &str, stats: MrStats) -> bool {
        let now = self.clock.now();
        let mut inner = self.lock();
        match inner.entries.get_mut(&Self::key(kind, sha)) {
            Some(Entry {
                value: Some(mr),
                expires_at,
            }) if *expires_at > now => {
                *mr = Arc::new(mr.with_stats(stats));
                true
            }
            _ => false,
        }
    }

    /// Drops every entry and starts a new generation.
    pub fn invalidate_all(&self) {
        let mut inner = self.lock();
        let dropped = inner.entries.len();
        inner.entries.clear();
        inner.generation = inner.generation.wrapping_add(1);
        debug!(dropped, generation = inner.generation, "Cache invalidated");
    }

    /// Current generation.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.lock()
            .entries
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }

    /// Returns true if there are no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invalidates the cache whenever `signal` fires.
    ///
    /// The subscription holds only a weak reference to the cache and ends
    /// on [`ResultCache::dispose`], when the cache is dropped or when the
    /// signal goes away.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn watch(self: &Arc<Self>, signal: &RepositorySignal) {
        let mut rx = signal.subscribe();
        let weak = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let Some(cache) = weak.upgrade() else {
                    break;
                };
                cache.invalidate_all();
            }
        });

        self.watchers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
    }

    /// Ends all signal subscriptions and clears storage.
    pub fn dispose(&self) {
        let handles: Vec<_> = self
            .watchers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for handle in &handles {
            handle.abort();
        }
        self.lock().entries.clear();
        debug!(subscriptions = handles.len(), "Cache disposed");
    }
}

impl Drop for ResultCache {
    fn drop(&mut self) {
        for handle in self
            .watchers
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
        {
            handle.abort();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    const TTL: Duration = Duration::from_secs(600);

    fn mr(number: u64) -> Arc<MergeRequest> {
        Arc::new(MergeRequest::new(
            ProviderKind::GitLab,
            number,
            "Title",
            "https://gitlab.com/g/p/-/merge_requests/1",
            "merged",
        ))
    }

    fn cache_with_clock() -> (ResultCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (ResultCache::with_clock(TTL, clock.clone()), clock)
    }

    #[test]
    fn test_three_valued_lookup() {
        let (cache, _) = cache_with_clock();
        assert_eq!(cache.get(ProviderKind::GitLab, "a"), CacheLookup::Absent);

        cache.set(ProviderKind::GitLab, "a", None);
        assert_eq!(cache.get(ProviderKind::GitLab, "a"), CacheLookup::Empty);
        assert!(cache.get(ProviderKind::GitLab, "a").is_present());

        cache.set(ProviderKind::GitLab, "b", Some(mr(3)));
        let found = cache.get(ProviderKind::GitLab, "b").merge_request().unwrap();
        assert_eq!(found.number, 3);
    }

    #[test]
    fn test_keys_include_provider() {
        let (cache, _) = cache_with_clock();
        cache.set(ProviderKind::GitLab, "same", Some(mr(1)));
        assert_eq!(cache.get(ProviderKind::GitHub, "same"), CacheLookup::Absent);
    }

    #[test]
    fn test_ttl_expiry_boundary() {
        let (cache, clock) = cache_with_clock();
        cache.set(ProviderKind::GitLab, "a", Some(mr(1)));

        clock.advance(TTL - Duration::from_millis(1));
        assert!(cache.get(ProviderKind::GitLab, "a").is_present());

        clock.advance(Duration::from_millis(2));
        assert_eq!(cache.get(ProviderKind::GitLab, "a"), CacheLookup::Absent);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_zero_ttl_disables_caching() {
        let cache = ResultCache::new(Duration::ZERO);
        assert!(!cache.is_enabled());
        cache.set(ProviderKind::GitHub, "a", Some(mr(1)));
        cache.set(ProviderKind::GitHub, "b", None);
        assert_eq!(cache.get(ProviderKind::GitHub, "a"), CacheLookup::Absent);
        assert_eq!(cache.get(ProviderKind::GitHub, "b"), CacheLookup::Absent);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_all_clears_and_bumps_generation() {
        let (cache, _) = cache_with_clock();
        cache.set(ProviderKind::GitLab, "a", Some(mr(1)));
        cache.set(ProviderKind::GitHub, "b", None);
        let before = cache.generation();

        cache.invalidate_all();

        assert!(cache.is_empty());
        assert_eq!(cache.get(ProviderKind::GitHub, "b"), CacheLookup::Absent);
        assert_eq!(cache.generation(), before + 1);
    }

    #[test]
    fn test_set_if_generation_rejects_stale_writes() {
        let (cache, _) = cache_with_clock();
        let generation = cache.generation();
        cache.invalidate_all();

        assert!(!cache.set_if_generation(ProviderKind::GitLab, "a", Some(mr(1)), generation));
        assert_eq!(cache.get(ProviderKind::GitLab, "a"), CacheLookup::Absent);

        let current = cache.generation();
        assert!(cache.set_if_generation(ProviderKind::GitLab, "a", Some(mr(1)), current));
        assert!(cache.get(ProviderKind::GitLab, "a").is_present());
    }

    #[test]
    fn test_update_stats_swaps_value() {
        let (cache, _) = cache_with_clock();
        cache.set(ProviderKind::GitLab, "a", Some(mr(1)));
        let before = cache.get(ProviderKind::GitLab, "a").merge_request().unwrap();

        assert!(cache.update_stats(ProviderKind::GitLab, "a", MrStats::changes("4")));

        let after = cache.get(ProviderKind::GitLab, "a").merge_request().unwrap();
        assert!(before.stats.is_none());
        assert_eq!(after.stats.as_ref().unwrap().changes_count.as_deref(), Some("4"));
        assert!(!Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn test_update_stats_requires_live_mr() {
        let (cache, clock) = cache_with_clock();
        assert!(!cache.update_stats(ProviderKind::GitLab, "missing", MrStats::changes("1")));

        cache.set(ProviderKind::GitLab, "empty", None);
        assert!(!cache.update_stats(ProviderKind::GitLab, "empty", MrStats::changes("1")));

        cache.set(ProviderKind::GitLab, "old", Some(mr(1)));
        clock.advance(TTL);
        assert!(!cache.update_stats(ProviderKind::GitLab, "old", MrStats::changes("1")));
    }

    #[tokio::test]
    async fn test_watch_invalidates_on_signal() {
        let cache = Arc::new(ResultCache::new(TTL));
        let signal = RepositorySignal::new();
        cache.watch(&signal);

        cache.set(ProviderKind::GitLab, "a", Some(mr(1)));
        signal.notify();

        for _ in 0..100 {
            if cache.is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_dispose_ends_subscription() {
        let cache = Arc::new(ResultCache::new(TTL));
        let signal = RepositorySignal::new();
        cache.watch(&signal);
        cache.set(ProviderKind::GitLab, "a", Some(mr(1)));

        cache.dispose();
        assert!(cache.is_empty());

        let generation = cache.generation();
        cache.set(ProviderKind::GitLab, "b", Some(mr(2)));
        signal.notify();
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        assert_eq!(cache.generation(), generation);
        assert!(cache.get(ProviderKind::GitLab, "b").is_present());
    }
}
