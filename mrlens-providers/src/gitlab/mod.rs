//! GitLab provider.
//!
//! Talks to the REST v4 API of gitlab.com or a self-hosted instance.
//!
//! - [`api`] - Wire types
//! - [`client`] - [`GitLabClient`], the [`MergeRequestProvider`](crate::MergeRequestProvider) implementation

pub mod api;
mod client;

pub use client::GitLabClient;
