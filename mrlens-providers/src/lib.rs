// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `MrLens` Providers
//!
//! Merge request providers for the `MrLens` resolution engine.
//!
//! Each provider implements [`MergeRequestProvider`]: it claims remotes,
//! lists the requests associated with a commit, applies the selection
//! policy and falls back to references in the commit message.
//!
//! ## Supported Providers
//!
//! | Provider | Lookup endpoint | Auth header | Fallback |
//! |----------|-----------------|-------------|----------|
//! | GitLab | `/api/v4/projects/{path}/repository/commits/{sha}/merge_requests` | `PRIVATE-TOKEN` | `See merge request group/project!N` |
//! | GitHub | `/repos/{path}/commits/{sha}/pulls` | `Authorization: token` | `(#N)`, `Merge pull request #N` |
//!
//! ## Usage
//!
//! ```ignore
//! use mrlens_providers::ProviderRegistry;
//! use mrlens_fetch::FetchContext;
//!
//! let registry = ProviderRegistry::with_defaults(&FetchContext::new());
//! let provider = registry.detect("git@gitlab.com:group/project.git").unwrap();
//! let mr = provider.resolve("group/project", sha, None).await?;
//! ```

pub mod error;
pub mod provider;
pub mod references;
pub mod registry;
pub mod selection;
pub mod state;

// Provider modules (alphabetical)
pub mod github;
pub mod gitlab;

pub use error::ProviderError;
pub use provider::MergeRequestProvider;
pub use references::{MessageReference, github_reference, gitlab_reference};
pub use registry::ProviderRegistry;
pub use selection::{Candidate, select};
pub use state::{ClientConfig, ClientState};

pub use github::GitHubClient;
pub use gitlab::GitLabClient;
