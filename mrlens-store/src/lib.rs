// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `MrLens` Store
//!
//! State for the `MrLens` resolution engine.
//!
//! This crate provides:
//!
//! - **ResultCache**: TTL cache of `(provider, sha)` lookups with
//!   invalidation and a stale-write guard
//! - **RepositorySignal**: "repository changed" broadcast that invalidates caches
//! - **Clock**: System and manual time sources for expiry
//! - **SettingsStore**: User preferences with persistence
//! - **Persistence**: File I/O helpers for JSON data
//!
//! ## Usage
//!
//! ```ignore
//! use mrlens_store::{RepositorySignal, ResultCache, SettingsStore};
//!
//! let settings = SettingsStore::load_default().await?.get().await;
//! let cache = Arc::new(ResultCache::new(settings.cache_ttl()));
//!
//! let signal = RepositorySignal::new();
//! cache.watch(&signal);
//!
//! // Somewhere in the repository watcher:
//! signal.notify();
//! ```

pub mod cache;
pub mod clock;
pub mod error;
pub mod persistence;
pub mod settings_store;
pub mod signal;

pub use cache::{CacheLookup, ResultCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::StoreError;
pub use persistence::{
    default_config_dir, default_settings_path, load_json, load_json_or_default, save_json,
};
pub use settings_store::{
    DEFAULT_CACHE_TTL_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, LogLevel, ProviderSettings, Settings,
    SettingsStore,
};
pub use signal::RepositorySignal;
