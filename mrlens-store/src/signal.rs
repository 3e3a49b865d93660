//! Repository state-changed signal.
//!
//! The repository watcher fires [`RepositorySignal::notify`] whenever HEAD,
//! the index or the refs change. Subscribers get a `watch` receiver whose
//! value is a change counter; only the fact of a change matters.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Broadcasts "the repository changed" to any number of subscribers.
#[derive(Debug, Clone)]
pub struct RepositorySignal {
    tx: Arc<watch::Sender<u64>>,
}

impl RepositorySignal {
    /// Creates a signal with no subscribers.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    /// Fires the signal.
    pub fn notify(&self) {
        self.tx.send_modify(|v| *v = v.wrapping_add(1));
        debug!(version = *self.tx.borrow(), "Repository changed");
    }

    /// Subscribes to future changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }

    /// Number of changes fired so far.
    pub fn version(&self) -> u64 {
        *self.tx.borrow()
    }
}

impl Default for RepositorySignal {
    fn default() -> Self {
        Self::new()
    }
}
