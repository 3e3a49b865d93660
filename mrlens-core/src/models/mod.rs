//! Domain models for `MrLens`.
//!
//! ## Submodules
//!
//! - [`provider`] - Provider identity (`ProviderKind`)
//! - [`merge_request`] - Resolved merge requests and their stats
//! - [`blame`] - Blame records consumed from the editor

mod blame;
mod merge_request;
mod provider;

// Re-export everything at the models level
pub use blame::BlameLine;
pub use merge_request::{MergeRequest, MrStats, deserialize_optional_timestamp, parse_timestamp};
pub use provider::ProviderKind;
#[cfg(test)]
mod serde_tests;
