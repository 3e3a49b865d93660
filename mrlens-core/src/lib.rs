// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `MrLens` Core
//!
//! Core types, models, and remote URL parsing for the `MrLens` engine.
//!
//! This crate provides the foundational abstractions used across all other
//! `MrLens` crates, including:
//!
//! - Domain models (providers, merge requests, blame records)
//! - Error types
//! - The remote URL parser used for provider detection
//!
//! ## Key Types
//!
//! ### Provider Types
//! - [`ProviderKind`] - Closed set of supported hosting platforms
//!
//! ### Merge Request Types
//! - [`MergeRequest`] - A resolved merge request / pull request
//! - [`MrStats`] - Lazily fetched change-size metrics
//!
//! ### Inputs
//! - [`BlameLine`] - Per-line blame record produced by the editor
//! - [`RemoteInfo`] - Host and project path extracted from a remote URL

pub mod error;
pub mod models;
pub mod remote;

// Re-export error types
pub use error::CoreError;

// Re-export all model types
pub use models::{
    // Provider types
    ProviderKind,
    // Merge request types
    MergeRequest,
    MrStats,
    deserialize_optional_timestamp,
    parse_timestamp,
    // Blame input
    BlameLine,
};

// Re-export the parser entry points
pub use remote::{
    RemoteInfo, classify, extract_host, host_matches, looks_like_provider, web_origin,
};
