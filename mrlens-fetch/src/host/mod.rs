//! Host APIs for `MrLens` providers.
//!
//! - [`http`] - HTTP client with tracing and status mapping

pub mod http;

pub use http::HttpClient;
