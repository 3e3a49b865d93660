// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `MrLens` Fetch
//!
//! HTTP plumbing and the error taxonomy shared by all `MrLens` providers.
//!
//! ## Host APIs
//!
//! - [`host::http`] - HTTP client with tracing and status mapping
//!
//! ## Context
//!
//! - [`context::FetchContext`] - Shared HTTP client plus settings
//!
//! ## Errors
//!
//! - [`error::FetchError`] - `NoCredential`, `InvalidCredential`,
//!   `RateLimited`, `Network`, `NotFound`, `Unknown`
//!
//! ## Example
//!
//! ```ignore
//! use mrlens_fetch::FetchContext;
//!
//! let ctx = FetchContext::builder().timeout(Duration::from_secs(10)).build();
//! let prs: Vec<Pull> = ctx.http.get_json(&url, headers).await?;
//! ```

pub mod context;
pub mod error;
pub mod host;

// Errors
pub use error::{ErrorKind, FetchError};

// Host APIs
pub use host::http::HttpClient;

// Context
pub use context::{FetchContext, FetchContextBuilder, FetchSettings};
