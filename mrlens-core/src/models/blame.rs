//! Blame records consumed from the editor's blame parser.

use serde::{Deserialize, Serialize};

/// One line of blame output.
///
/// The engine treats `sha` as an opaque lookup key; the remaining fields are
/// carried through for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlameLine {
    /// Commit SHA the line was last changed in.
    pub sha: String,
    /// Commit author.
    #[serde(default)]
    pub author: String,
    /// Commit date as reported by the blame tool.
    #[serde(default)]
    pub date: String,
    /// Commit summary line.
    #[serde(default)]
    pub summary: String,
}

impl BlameLine {
    /// Returns true for the synthetic all-zero SHA git uses for uncommitted lines.
    pub fn is_uncommitted(&self) -> bool {
        !self.sha.is_empty() && self.sha.bytes().all(|b| b == b'0')
    }
}
