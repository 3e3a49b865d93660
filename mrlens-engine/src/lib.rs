// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `MrLens` Engine
//!
//! Resolves a commit to the merge request that introduced it.
//!
//! The [`Engine`] sits between callers that fire many lookups per second
//! and providers whose calls are slow and rate limited:
//!
//! ```text
//! caller -> Engine -> ResultCache (read)
//!                  -> [miss] ProviderRegistry::detect -> provider.resolve()
//!                  -> ResultCache (write) -> every waiter
//! ```
//!
//! - Concurrent lookups of one `(provider, sha)` share a single fetch.
//! - Each caller can give up through its own `CancellationToken` without
//!   affecting the fetch or the other waiters.
//! - Results, including failures, are cached until the TTL expires or the
//!   repository changes.
//!
//! ## Usage
//!
//! ```ignore
//! use mrlens_engine::Engine;
//! use tokio_util::sync::CancellationToken;
//!
//! let engine = Engine::builder().settings(settings).build();
//! engine.on_error(|e| eprintln!("{e}"));
//!
//! let result = engine
//!     .resolve("git@gitlab.com:group/project.git", sha, &CancellationToken::new())
//!     .await;
//! ```

pub mod builder;
pub mod engine;
pub mod error;
pub mod result;
pub mod stats;

pub use builder::{EngineBuilder, registry_from_settings};
pub use engine::{Engine, ErrorHandler};
pub use error::{EngineError, LookupError};
pub use result::LookupResult;
pub use stats::EngineStats;
