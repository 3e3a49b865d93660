//! GitHub provider.
//!
//! Talks to the REST API of github.com (`api.github.com`) or a GitHub
//! Enterprise instance (`api.` + git host).
//!
//! - [`api`] - Wire types and API base derivation
//! - [`client`] - [`GitHubClient`], the [`MergeRequestProvider`](crate::MergeRequestProvider) implementation

pub mod api;
mod client;

pub use client::GitHubClient;
