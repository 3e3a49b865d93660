//! Engine construction from settings.

use std::sync::Arc;
use std::time::Duration;

use mrlens_core::ProviderKind;
use mrlens_fetch::{FetchContext, FetchSettings};
use mrlens_providers::{GitHubClient, GitLabClient, MergeRequestProvider, ProviderRegistry};
use mrlens_store::{Clock, ResultCache, Settings, SystemClock};
use tracing::debug;

use crate::engine::Engine;

/// Builds the registry described by `settings`: one client per enabled
/// provider, in registration order, with host and token applied.
pub fn registry_from_settings(settings: &Settings, ctx: &FetchContext) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    for kind in settings.enabled_providers() {
        let provider_settings = settings.provider(kind);
        let host = provider_settings.host_or_default(kind);
        let token = provider_settings.token(kind);
        debug!(provider = %kind, host = %host, has_token = token.is_some(), "Configuring provider");

        let client: Arc<dyn MergeRequestProvider> = match kind {
            ProviderKind::GitLab => Arc::new(
                GitLabClient::new(Arc::clone(&ctx.http))
                    .with_host(&host)
                    .with_token(token),
            ),
            ProviderKind::GitHub => Arc::new(
                GitHubClient::new(Arc::clone(&ctx.http))
                    .with_host(&host)
                    .with_token(token),
            ),
        };
        registry.register(client);
    }
    registry
}

// ============================================================================
// Engine Builder
// ============================================================================

/// Builder for [`Engine`].
#[derive(Default)]
pub struct EngineBuilder {
    settings: Settings,
    context: Option<FetchContext>,
    registry: Option<ProviderRegistry>,
    clock: Option<Arc<dyn Clock>>,
    cache_ttl: Option<Duration>,
}

impl EngineBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses these settings for TTL, timeout and providers.
    #[must_use]
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Uses this fetch context instead of one built from the settings.
    #[must_use]
    pub fn context(mut self, context: FetchContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Uses this registry instead of one built from the settings.
    #[must_use]
    pub fn registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Uses this clock for cache expiry.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Overrides the cache TTL from the settings.
    #[must_use]
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Builds the engine.
    pub fn build(self) -> Engine {
        let settings = self.settings;
        let registry = self.registry.unwrap_or_else(|| {
            let ctx = self.context.unwrap_or_else(|| {
                FetchContext::with_settings(
                    FetchSettings::default().with_timeout(settings.request_timeout()),
                )
            });
            registry_from_settings(&settings, &ctx)
        });

        let ttl = self.cache_ttl.unwrap_or_else(|| settings.cache_ttl());
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let cache = Arc::new(ResultCache::with_clock(ttl, clock));

        debug!(providers = ?registry.kinds(), ttl_secs = ttl.as_secs(), "Engine built");
        Engine::new(registry, cache)
    }
}
