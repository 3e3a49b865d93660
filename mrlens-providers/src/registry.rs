//! Provider registry.
//!
//! Holds the registered provider clients in registration order and maps a
//! remote URL to the client that handles it.

use std::sync::Arc;

use mrlens_core::ProviderKind;
use mrlens_fetch::FetchContext;
use tracing::debug;

use crate::github::GitHubClient;
use crate::gitlab::GitLabClient;
use crate::provider::MergeRequestProvider;

// ============================================================================
// Provider Registry
// ============================================================================

/// Registered provider clients.
///
/// Detection is a linear claims check in registration order: when two
/// providers claim the same remote, the one registered first wins.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn MergeRequestProvider>>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with GitLab and GitHub clients for the public
    /// instances, without tokens.
    pub fn with_defaults(ctx: &FetchContext) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(GitLabClient::new(Arc::clone(&ctx.http))));
        registry.register(Arc::new(GitHubClient::new(Arc::clone(&ctx.http))));
        registry
    }

    /// Registers a client. A client of the same kind is replaced in place.
    pub fn register(&mut self, provider: Arc<dyn MergeRequestProvider>) {
        let kind = provider.kind();
        if let Some(slot) = self.providers.iter_mut().find(|p| p.kind() == kind) {
            debug!(provider = %kind, "Replacing registered provider");
            *slot = provider;
        } else {
            debug!(provider = %kind, "Registering provider");
            self.providers.push(provider);
        }
    }

    /// Gets the client for a provider kind.
    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn MergeRequestProvider>> {
        self.providers.iter().find(|p| p.kind() == kind).cloned()
    }

    /// Returns the first registered client that claims the remote.
    pub fn detect(&self, remote_url: &str) -> Option<Arc<dyn MergeRequestProvider>> {
        let found = self.providers.iter().find(|p| p.claims(remote_url)).cloned();
        match &found {
            Some(p) => debug!(provider = %p.kind(), "Detected provider"),
            None => debug!("No provider claims remote"),
        }
        found
    }

    /// Returns all registered clients in registration order.
    pub fn list(&self) -> &[Arc<dyn MergeRequestProvider>] {
        &self.providers
    }

    /// Returns the registered provider kinds.
    pub fn kinds(&self) -> Vec<ProviderKind> {
        self.providers.iter().map(|p| p.kind()).collect()
    }

    /// Returns the number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Removes every registered client.
    pub fn clear(&mut self) {
        self.providers.clear();
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.kinds())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
