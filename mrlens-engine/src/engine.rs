//! Lookup orchestrator.
//!
//! Each `(provider, sha)` key moves through three states:
//!
//! - **Uncached**: no cache entry and no fetch running. The first caller
//!   starts a fetch in its own task.
//! - **InFlight**: a fetch is running. Later callers attach to its watch
//!   channel instead of starting another one.
//! - **Settled**: the fetch finished. Its in-flight entry is removed and the
//!   cache written under the same lock. Error handlers run next, and only
//!   then does every waiter receive the identical value, so a returned
//!   lookup has already been reported.
//!
//! Lock order is in-flight map, then cache. No lock is held across an await.

use futures::FutureExt;
use mrlens_core::{MergeRequest, ProviderKind, RemoteInfo, classify, web_origin};
use mrlens_fetch::FetchError;
use mrlens_providers::{MergeRequestProvider, ProviderError, ProviderRegistry};
use mrlens_store::{CacheLookup, RepositorySignal, ResultCache};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::{EngineError, LookupError};
use crate::result::LookupResult;
use crate::stats::{Counters, EngineStats};

/// Callback receiving every failed lookup.
pub type ErrorHandler = Arc<dyn Fn(&LookupError) + Send + Sync>;

type LookupKey = (ProviderKind, String);

/// Value published by a fetch: `None` until settled.
type Settled = Option<Option<Arc<MergeRequest>>>;

/// Provider and project a remote resolves to.
struct Target {
    provider: Arc<dyn MergeRequestProvider>,
    project_path: String,
    host_override: Option<String>,
}

struct InFlight {
    id: u64,
    generation: u64,
    rx: watch::Receiver<Settled>,
    abort: AbortHandle,
}

struct Inner {
    registry: ProviderRegistry,
    cache: Arc<ResultCache>,
    in_flight: Mutex<HashMap<LookupKey, InFlight>>,
    handlers: RwLock<Vec<ErrorHandler>>,
    next_fetch_id: AtomicU64,
    counters: Counters,
}

impl Inner {
    fn in_flight(&self) -> MutexGuard<'_, HashMap<LookupKey, InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, error: &LookupError) {
        let handlers: Vec<ErrorHandler> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for handler in handlers {
            handler(error);
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Resolves commits to merge requests with caching, in-flight
/// deduplication and per-caller cancellation.
///
/// Cloning is cheap; clones share all state.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

impl Engine {
    /// Creates an engine over a registry and a cache.
    pub fn new(registry: ProviderRegistry, cache: Arc<ResultCache>) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                cache,
                in_flight: Mutex::new(HashMap::new()),
                handlers: RwLock::new(Vec::new()),
                next_fetch_id: AtomicU64::new(0),
                counters: Counters::default(),
            }),
        }
    }

    /// Creates a builder.
    pub fn builder() -> crate::builder::EngineBuilder {
        crate::builder::EngineBuilder::new()
    }

    /// The provider registry.
    pub fn registry(&self) -> &ProviderRegistry {
        &self.inner.registry
    }

    /// The result cache.
    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.inner.cache
    }

    /// Resolves `sha` in the repository behind `remote_url`.
    ///
    /// Never fails: provider errors settle as "no merge request" and are
    /// reported to the [`Engine::on_error`] handlers. If `cancel` fires
    /// first this caller gets [`LookupResult::pending`]; the fetch keeps
    /// running for any other waiter and still populates the cache.
    #[instrument(skip(self, cancel), fields(provider = tracing::field::Empty))]
    pub async fn resolve(
        &self,
        remote_url: &str,
        sha: &str,
        cancel: &CancellationToken,
    ) -> LookupResult {
        if cancel.is_cancelled() {
            Counters::bump(&self.inner.counters.cancelled);
            return LookupResult::pending();
        }

        let Some(target) = self.detect(remote_url) else {
            debug!("No provider for remote");
            return LookupResult::none();
        };
        tracing::Span::current().record("provider", target.provider.kind().id());

        let mut rx = match self.attach_or_start(target, sha) {
            Attached::Cached(result) => return result,
            Attached::Waiting(rx) => rx,
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("Waiter cancelled");
                Counters::bump(&self.inner.counters.cancelled);
                LookupResult::pending()
            }
            settled = rx.wait_for(Option::is_some) => match settled {
                Ok(value) => LookupResult::fetched(value.clone().flatten()),
                Err(_) => {
                    debug!("Fetch dropped before settling");
                    LookupResult::pending()
                }
            },
        }
    }

    fn detect(&self, remote_url: &str) -> Option<Target> {
        let provider = self.inner.registry.detect(remote_url)?;
        let remote = classify(remote_url)?;
        let host_override = host_override(provider.as_ref(), remote_url, &remote);
        Some(Target {
            provider,
            project_path: remote.project_path,
            host_override,
        })
    }

    /// Checks the cache and the in-flight map in one critical section.
    fn attach_or_start(&self, target: Target, sha: &str) -> Attached {
        let kind = target.provider.kind();
        let key: LookupKey = (kind, sha.to_string());
        let mut in_flight = self.inner.in_flight();

        match self.inner.cache.get(kind, sha) {
            CacheLookup::Found(mr) => {
                Counters::bump(&self.inner.counters.cache_hits);
                return Attached::Cached(LookupResult::cached(Some(mr)));
            }
            CacheLookup::Empty => {
                Counters::bump(&self.inner.counters.cache_hits);
                return Attached::Cached(LookupResult::cached(None));
            }
            CacheLookup::Absent => {}
        }

        let generation = self.inner.cache.generation();
        if let Some(entry) = in_flight.get(&key) {
            if entry.generation == generation {
                debug!(sha, "Attaching to in-flight fetch");
                Counters::bump(&self.inner.counters.coalesced);
                return Attached::Waiting(entry.rx.clone());
            }
            debug!(sha, "In-flight fetch predates invalidation, starting a new one");
        }

        let entry = self.spawn_fetch(target, key.clone(), generation);
        let rx = entry.rx.clone();
        in_flight.insert(key, entry);
        Attached::Waiting(rx)
    }

    /// Starts the fetch task. Called with the in-flight lock held, so the
    /// task cannot settle before its entry is inserted.
    fn spawn_fetch(&self, target: Target, key: LookupKey, generation: u64) -> InFlight {
        let id = self.inner.next_fetch_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = watch::channel(None);
        let inner = Arc::clone(&self.inner);
        Counters::bump(&inner.counters.fetches);
        debug!(sha = %key.1, project = %target.project_path, "Starting fetch");

        let handle = tokio::spawn(async move {
            let (kind, sha) = key;
            let Target {
                provider,
                project_path,
                host_override,
            } = target;
            let call = provider.resolve(&project_path, &sha, host_override.as_deref());
            let result = AssertUnwindSafe(call).catch_unwind().await.unwrap_or_else(|_| {
                warn!(provider = %kind, sha = %sha, "Provider panicked");
                Err(ProviderError::quiet(FetchError::Unknown(
                    "provider panicked".to_string(),
                )))
            });

            let (value, error) = match result {
                Ok(mr) => (mr.map(Arc::new), None),
                Err(e) => (None, Some(e)),
            };

            {
                let mut in_flight = inner.in_flight();
                if in_flight.get(&(kind, sha.clone())).is_some_and(|e| e.id == id) {
                    in_flight.remove(&(kind, sha.clone()));
                }
                inner
                    .cache
                    .set_if_generation(kind, &sha, value.clone(), generation);
            }

            if let Some(error) = error {
                Counters::bump(&inner.counters.errors);
                let event = LookupError::new(kind, &sha, error);
                if event.should_surface {
                    info!(provider = %kind, error = %event.error, "Surfacing lookup error");
                }
                inner.emit(&event);
            }
            tx.send_replace(Some(value));
        });

        InFlight {
            id,
            generation,
            rx,
            abort: handle.abort_handle(),
        }
    }

    /// Registers a handler for failed lookups.
    pub fn on_error<F>(&self, handler: F)
    where
        F: Fn(&LookupError) + Send + Sync + 'static,
    {
        self.inner
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(handler));
    }

    /// Drops every cached result.
    pub fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
    }

    /// Invalidates the cache whenever `signal` fires.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn watch_repository(&self, signal: &RepositorySignal) {
        self.inner.cache.watch(signal);
    }

    /// Replaces a provider's token.
    ///
    /// Re-arms the provider's one-shot error surfacing and invalidates the
    /// cache so failures recorded under the old token are retried.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ProviderNotRegistered`] if `kind` is unknown.
    pub fn set_credential(&self, kind: ProviderKind, token: Option<String>) -> Result<(), EngineError> {
        let provider = self
            .inner
            .registry
            .get(kind)
            .ok_or(EngineError::ProviderNotRegistered(kind))?;
        provider.set_credential(token);
        provider.reset_error_state();
        self.inner.cache.invalidate_all();
        info!(provider = %kind, "Credential changed, cache invalidated");
        Ok(())
    }

    /// Fetches change-size stats for a cached merge request and swaps the
    /// enriched value into the cache.
    ///
    /// Returns the cached value untouched if it already carries stats.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnsupportedRemote`] when no provider claims the
    /// remote, [`EngineError::NotCached`] when there is no live cached merge
    /// request for `sha`, and [`EngineError::Provider`] when the stats call
    /// fails.
    #[instrument(skip(self))]
    pub async fn enrich_stats(
        &self,
        remote_url: &str,
        sha: &str,
    ) -> Result<Arc<MergeRequest>, EngineError> {
        let Target {
            provider,
            project_path,
            host_override,
        } = self
            .detect(remote_url)
            .ok_or_else(|| EngineError::UnsupportedRemote(remote_url.to_string()))?;
        let kind = provider.kind();

        let mr = self
            .inner
            .cache
            .get(kind, sha)
            .merge_request()
            .ok_or_else(|| EngineError::NotCached(sha.to_string()))?;
        if mr.stats.is_some() {
            return Ok(mr);
        }

        let stats = provider
            .fetch_stats(&project_path, mr.number, host_override.as_deref())
            .await
            .inspect_err(|e| debug!(error = %e, "Stats fetch failed"))?;

        if self.inner.cache.update_stats(kind, sha, stats.clone()) {
            if let Some(updated) = self.inner.cache.get(kind, sha).merge_request() {
                return Ok(updated);
            }
        }
        Ok(Arc::new(mr.with_stats(stats)))
    }

    /// Number of fetches currently in flight.
    pub fn in_flight_count(&self) -> usize {
        self.inner.in_flight().len()
    }

    /// Snapshot of the engine counters.
    pub fn stats(&self) -> EngineStats {
        self.inner.counters.snapshot(self.in_flight_count())
    }

    /// Aborts in-flight fetches, drops handlers and disposes the cache.
    ///
    /// Waiters of aborted fetches receive [`LookupResult::pending`].
    pub fn dispose(&self) {
        let aborted: Vec<InFlight> = self.inner.in_flight().drain().map(|(_, e)| e).collect();
        for entry in &aborted {
            entry.abort.abort();
        }
        self.inner
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.inner.cache.dispose();
        info!(aborted = aborted.len(), "Engine disposed");
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &self.inner.registry)
            .field("cache_entries", &self.inner.cache.len())
            .field("in_flight", &self.in_flight_count())
            .finish()
    }
}

enum Attached {
    Cached(LookupResult),
    Waiting(watch::Receiver<Settled>),
}

/// The remote's own web origin when it is not on the provider's configured
/// instance, e.g. a self-hosted GitLab detected by name.
fn host_override(
    provider: &dyn MergeRequestProvider,
    remote_url: &str,
    remote: &RemoteInfo,
) -> Option<String> {
    if provider.is_configured_host(&remote.host) {
        return None;
    }
    let origin = web_origin(remote_url)?;
    debug!(
        origin = %origin,
        configured = %provider.host(),
        "Remote is off the configured host, sending the configured token there"
    );
    Some(origin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mrlens_core::MrStats;
    use mrlens_fetch::ErrorKind;
    use mrlens_providers::ClientState;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    const REMOTE: &str = "git@gitlab.com:group/project.git";
    const SHA: &str = "a1b2c3d4";

    #[derive(Clone)]
    enum Outcome {
        Found(u64),
        Nothing,
        Fail(FetchError),
        Panic,
    }

    struct MockProvider {
        state: ClientState,
        outcome: Outcome,
        gate: watch::Receiver<bool>,
        calls: AtomicUsize,
        stats_calls: AtomicUsize,
    }

    impl MockProvider {
        /// Returns the provider and the sender that opens its gate.
        fn gated(outcome: Outcome, open: bool) -> (Arc<Self>, watch::Sender<bool>) {
            let (tx, rx) = watch::channel(open);
            let provider = Arc::new(Self {
                state: ClientState::new(ProviderKind::GitLab, "https://gitlab.com", Some("t".into())),
                outcome,
                gate: rx,
                calls: AtomicUsize::new(0),
                stats_calls: AtomicUsize::new(0),
            });
            (provider, tx)
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MergeRequestProvider for MockProvider {
        fn kind(&self) -> ProviderKind {
            ProviderKind::GitLab
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

        async fn resolve(
            &self,
            _project_path: &str,
            _sha: &str,
            _host_override: Option<&str>,
        ) -> Result<Option<MergeRequest>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut gate = self.gate.clone();
            let _ = gate.wait_for(|open| *open).await;

            match self.outcome.clone() {
                Outcome::Found(number) => Ok(Some(MergeRequest::new(
                    ProviderKind::GitLab,
                    number,
                    "Add feature",
                    format!("https://gitlab.com/group/project/-/merge_requests/{number}"),
                    "merged",
                ))),
                Outcome::Nothing => Ok(None),
                Outcome::Fail(error) => Err(self.state.report(error)),
                Outcome::Panic => panic!("provider exploded"),
            }
        }

        async fn fetch_stats(
            &self,
            _project_path: &str,
            _number: u64,
            _host_override: Option<&str>,
        ) -> Result<MrStats, ProviderError> {
            self.stats_calls.fetch_add(1, Ordering::SeqCst);
            Ok(MrStats::lines(10, 2, 3))
        }

        fn reset_error_state(&self) {
            self.state.reset_error_state();
        }
    }

    fn engine(provider: &Arc<MockProvider>, ttl: Duration) -> Engine {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::clone(provider) as Arc<dyn MergeRequestProvider>);
        Engine::new(registry, Arc::new(ResultCache::new(ttl)))
    }

    fn ttl() -> Duration {
        Duration::from_secs(600)
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("condition never became true");
    }

    fn spawn_lookup(engine: &Engine, token: CancellationToken) -> tokio::task::JoinHandle<LookupResult> {
        let engine = engine.clone();
        tokio::spawn(async move { engine.resolve(REMOTE, SHA, &token).await })
    }

    fn collect_errors(engine: &Engine) -> Arc<Mutex<Vec<LookupError>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        engine.on_error(move |e| sink.lock().unwrap().push(e.clone()));
        seen
    }

    #[tokio::test]
    async fn test_concurrent_lookups_share_one_fetch() {
        let (provider, gate) = MockProvider::gated(Outcome::Found(7), false);
        let engine = engine(&provider, ttl());

        let handles: Vec<_> = (0..10)
            .map(|_| spawn_lookup(&engine, CancellationToken::new()))
            .collect();
        wait_until(|| engine.stats().coalesced == 9).await;
        assert_eq!(engine.in_flight_count(), 1);

        gate.send_replace(true);
        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        assert_eq!(provider.calls(), 1);
        let first = results[0].mr.clone().unwrap();
        for result in &results {
            assert!(!result.pending);
            assert!(Arc::ptr_eq(result.mr.as_ref().unwrap(), &first));
        }
        assert_eq!(first.number, 7);
        assert_eq!(engine.in_flight_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_simultaneous_misses_share_one_fetch_across_threads() {
        const CALLERS: usize = 16;
        let (provider, gate) = MockProvider::gated(Outcome::Found(11), false);
        let engine = engine(&provider, ttl());
        let barrier = Arc::new(tokio::sync::Barrier::new(CALLERS));

        let handles: Vec<_> = (0..CALLERS)
            .map(|_| {
                let engine = engine.clone();
                let barrier = Arc::clone(&barrier);
                tokio::spawn(async move {
                    barrier.wait().await;
                    engine.resolve(REMOTE, SHA, &CancellationToken::new()).await
                })
            })
            .collect();

        wait_until(|| engine.stats().coalesced == (CALLERS - 1) as u64).await;
        gate.send_replace(true);

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        assert_eq!(provider.calls(), 1);
        assert_eq!(engine.stats().fetches, 1);
        let first = results[0].mr.clone().unwrap();
        for result in &results {
            assert!(Arc::ptr_eq(result.mr.as_ref().unwrap(), &first));
        }
        assert_eq!(engine.in_flight_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_error_handlers_run_before_resolve_returns() {
        let (provider, _gate) =
            MockProvider::gated(Outcome::Fail(FetchError::InvalidCredential { status: 401 }), true);
        let engine = engine(&provider, ttl());
        let handled = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&handled);
        engine.on_error(move |_| {
            std::thread::sleep(Duration::from_millis(50));
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let result = engine.resolve(REMOTE, SHA, &CancellationToken::new()).await;
        assert!(result.mr.is_none() && !result.pending);
        assert_eq!(handled.load(Ordering::SeqCst), 1);

        // Disposing right away cannot drop an error that was already reported.
        engine.dispose();
        assert_eq!(handled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelling_one_waiter_does_not_affect_others() {
        let (provider, gate) = MockProvider::gated(Outcome::Found(3), false);
        let engine = engine(&provider, ttl());

        let cancel_a = CancellationToken::new();
        let a = spawn_lookup(&engine, cancel_a.clone());
        let b = spawn_lookup(&engine, CancellationToken::new());
        wait_until(|| engine.stats().coalesced == 1).await;

        cancel_a.cancel();
        let a = a.await.unwrap();
        assert!(a.pending);
        assert!(a.mr.is_none());
        assert_eq!(engine.in_flight_count(), 1);

        gate.send_replace(true);
        let b = b.await.unwrap();
        assert_eq!(b.mr.unwrap().number, 3);
        assert_eq!(provider.calls(), 1);

        // The fetch populated the cache even though one waiter left.
        let c = engine.resolve(REMOTE, SHA, &CancellationToken::new()).await;
        assert!(c.from_cache);
        assert_eq!(c.mr.unwrap().number, 3);
        assert_eq!(engine.stats().cancelled, 1);
    }

    #[tokio::test]
    async fn test_cancelled_token_returns_pending_without_fetch() {
        let (provider, _gate) = MockProvider::gated(Outcome::Found(1), true);
        let engine = engine(&provider, ttl());
        let token = CancellationToken::new();
        token.cancel();

        let result = engine.resolve(REMOTE, SHA, &token).await;
        assert_eq!(result, LookupResult::pending());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_cached_reads_are_identical() {
        let (provider, _gate) = MockProvider::gated(Outcome::Found(9), true);
        let engine = engine(&provider, ttl());
        let token = CancellationToken::new();

        let first = engine.resolve(REMOTE, SHA, &token).await;
        assert!(!first.from_cache);
        let second = engine.resolve(REMOTE, SHA, &token).await;
        let third = engine.resolve(REMOTE, SHA, &token).await;

        assert!(second.from_cache);
        assert_eq!(second, third);
        assert!(Arc::ptr_eq(first.mr.as_ref().unwrap(), second.mr.as_ref().unwrap()));
        assert_eq!(provider.calls(), 1);
        assert_eq!(engine.stats().cache_hits, 2);
    }

    #[tokio::test]
    async fn test_empty_result_is_cached() {
        let (provider, _gate) = MockProvider::gated(Outcome::Nothing, true);
        let engine = engine(&provider, ttl());
        let token = CancellationToken::new();

        let first = engine.resolve(REMOTE, SHA, &token).await;
        assert_eq!(first, LookupResult::fetched(None));
        let second = engine.resolve(REMOTE, SHA, &token).await;
        assert_eq!(second, LookupResult::cached(None));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_zero_ttl_always_fetches() {
        let (provider, _gate) = MockProvider::gated(Outcome::Found(2), true);
        let engine = engine(&provider, Duration::ZERO);
        let token = CancellationToken::new();

        engine.resolve(REMOTE, SHA, &token).await;
        let second = engine.resolve(REMOTE, SHA, &token).await;

        assert!(!second.from_cache);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_unsupported_remote_is_none() {
        let (provider, _gate) = MockProvider::gated(Outcome::Found(2), true);
        let engine = engine(&provider, ttl());

        let result = engine
            .resolve("https://bitbucket.org/team/repo.git", SHA, &CancellationToken::new())
            .await;
        assert_eq!(result, LookupResult::none());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_credential_error_surfaces_once_and_is_cached() {
        let (provider, _gate) =
            MockProvider::gated(Outcome::Fail(FetchError::InvalidCredential { status: 401 }), true);
        let engine = engine(&provider, ttl());
        let seen = collect_errors(&engine);
        let token = CancellationToken::new();

        let first = engine.resolve(REMOTE, SHA, &token).await;
        let second = engine.resolve(REMOTE, SHA, &token).await;
        assert!(first.mr.is_none() && !first.pending);
        assert!(second.from_cache);
        assert_eq!(provider.calls(), 1);

        {
            let seen = seen.lock().unwrap();
            assert_eq!(seen.len(), 1);
            assert!(seen[0].should_surface);
            assert_eq!(seen[0].kind(), ErrorKind::InvalidCredential);
            assert_eq!(seen[0].sha, SHA);
        }

        // A new token clears the cache and re-arms surfacing.
        engine
            .set_credential(ProviderKind::GitLab, Some("new".to_string()))
            .unwrap();
        engine.resolve(REMOTE, SHA, &token).await;
        assert_eq!(provider.calls(), 2);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[1].should_surface);
        assert_eq!(engine.stats().errors, 2);
    }

    #[tokio::test]
    async fn test_rate_limit_is_reported_quietly() {
        let (provider, _gate) = MockProvider::gated(
            Outcome::Fail(FetchError::RateLimited { retry_after: Some(30) }),
            true,
        );
        let engine = engine(&provider, ttl());
        let seen = collect_errors(&engine);

        engine.resolve(REMOTE, SHA, &CancellationToken::new()).await;
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(!seen[0].should_surface);
        assert_eq!(seen[0].kind(), ErrorKind::RateLimited);
    }

    #[tokio::test]
    async fn test_set_credential_unknown_provider() {
        let (provider, _gate) = MockProvider::gated(Outcome::Nothing, true);
        let engine = engine(&provider, ttl());

        let err = engine.set_credential(ProviderKind::GitHub, None).unwrap_err();
        assert!(matches!(err, EngineError::ProviderNotRegistered(ProviderKind::GitHub)));
    }

    #[tokio::test]
    async fn test_fetch_settling_after_invalidation_is_not_cached() {
        let (provider, gate) = MockProvider::gated(Outcome::Found(4), false);
        let engine = engine(&provider, ttl());

        let a = spawn_lookup(&engine, CancellationToken::new());
        wait_until(|| provider.calls() == 1).await;
        engine.invalidate_all();

        gate.send_replace(true);
        let a = a.await.unwrap();
        assert_eq!(a.mr.unwrap().number, 4);
        assert!(matches!(engine.cache().get(ProviderKind::GitLab, SHA), CacheLookup::Absent));
    }

    #[tokio::test]
    async fn test_lookup_after_invalidation_starts_new_fetch() {
        let (provider, gate) = MockProvider::gated(Outcome::Found(4), false);
        let engine = engine(&provider, ttl());

        let a = spawn_lookup(&engine, CancellationToken::new());
        wait_until(|| provider.calls() == 1).await;
        engine.invalidate_all();
        let b = spawn_lookup(&engine, CancellationToken::new());
        wait_until(|| provider.calls() == 2).await;
        assert_eq!(engine.stats().coalesced, 0);

        gate.send_replace(true);
        a.await.unwrap();
        b.await.unwrap();
        assert!(engine.cache().get(ProviderKind::GitLab, SHA).is_present());
        assert_eq!(engine.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_provider_panic_settles_as_none() {
        let (provider, _gate) = MockProvider::gated(Outcome::Panic, true);
        let engine = engine(&provider, ttl());
        let seen = collect_errors(&engine);

        let result = engine.resolve(REMOTE, SHA, &CancellationToken::new()).await;
        assert_eq!(result, LookupResult::fetched(None));
        assert_eq!(engine.in_flight_count(), 0);
        assert_eq!(seen.lock().unwrap()[0].kind(), ErrorKind::Unknown);
    }

    #[tokio::test]
    async fn test_dispose_releases_waiters() {
        let (provider, _gate) = MockProvider::gated(Outcome::Found(1), false);
        let engine = engine(&provider, ttl());

        let a = spawn_lookup(&engine, CancellationToken::new());
        wait_until(|| provider.calls() == 1).await;

        engine.dispose();
        let a = a.await.unwrap();
        assert!(a.pending);
        assert_eq!(engine.in_flight_count(), 0);
        assert!(engine.cache().is_empty());
    }

    #[tokio::test]
    async fn test_enrich_stats_updates_cache_once() {
        let (provider, _gate) = MockProvider::gated(Outcome::Found(5), true);
        let engine = engine(&provider, ttl());

        let missing = engine.enrich_stats(REMOTE, SHA).await.unwrap_err();
        assert!(matches!(missing, EngineError::NotCached(_)));

        engine.resolve(REMOTE, SHA, &CancellationToken::new()).await;
        let enriched = engine.enrich_stats(REMOTE, SHA).await.unwrap();
        assert_eq!(enriched.stats, Some(MrStats::lines(10, 2, 3)));

        let again = engine.enrich_stats(REMOTE, SHA).await.unwrap();
        assert!(Arc::ptr_eq(&enriched, &again));
        assert_eq!(provider.stats_calls.load(Ordering::SeqCst), 1);

        let cached = engine.resolve(REMOTE, SHA, &CancellationToken::new()).await;
        assert!(cached.mr.unwrap().stats.is_some());
    }

    #[tokio::test]
    async fn test_enrich_stats_unsupported_remote() {
        let (provider, _gate) = MockProvider::gated(Outcome::Found(5), true);
        let engine = engine(&provider, ttl());

        let err = engine.enrich_stats("not a remote", SHA).await.unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedRemote(_)));
    }

    #[tokio::test]
    async fn test_repository_signal_invalidates() {
        let (provider, _gate) = MockProvider::gated(Outcome::Found(5), true);
        let engine = engine(&provider, ttl());
        let signal = RepositorySignal::new();
        engine.watch_repository(&signal);

        engine.resolve(REMOTE, SHA, &CancellationToken::new()).await;
        assert_eq!(engine.cache().len(), 1);

        signal.notify();
        wait_until(|| engine.cache().is_empty()).await;

        let again = engine.resolve(REMOTE, SHA, &CancellationToken::new()).await;
        assert!(!again.from_cache);
        assert_eq!(provider.calls(), 2);
    }

    #[test]
    fn test_host_override_only_for_foreign_hosts() {
        let (provider, _gate) = MockProvider::gated(Outcome::Nothing, true);
        let on_host = classify("git@gitlab.com:a/b.git").unwrap();
        let self_hosted = classify("git@gitlab.acme.io:a/b.git").unwrap();

        assert_eq!(host_override(provider.as_ref(), "git@gitlab.com:a/b.git", &on_host), None);
        assert_eq!(
            host_override(provider.as_ref(), "git@gitlab.acme.io:a/b.git", &self_hosted).as_deref(),
            Some("https://gitlab.acme.io")
        );
    }

    #[test]
    fn test_host_override_keeps_scheme_and_port() {
        let (provider, _gate) = MockProvider::gated(Outcome::Nothing, true);
        let url = "http://gitlab.acme.io:8443/g/p.git";
        let remote = classify(url).unwrap();

        assert_eq!(
            host_override(provider.as_ref(), url, &remote).as_deref(),
            Some("http://gitlab.acme.io:8443")
        );
    }
}
