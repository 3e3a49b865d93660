//! Merge request references embedded in commit messages.
//!
//! Used when a provider lists no request for a commit, which happens for
//! squash merges and for merge commits on some instances.

use regex::Regex;
use std::sync::OnceLock;

/// A request number found in a commit message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageReference {
    /// Project the reference points into, when the message names one.
    pub project_path: Option<String>,
    /// Request number.
    pub number: u64,
}

fn github_squash_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(#(\d+)\)").expect("Invalid regex"))
}

fn github_merge_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)merge pull request #(\d+)").expect("Invalid regex"))
}

fn gitlab_merge_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"See merge request (?:([\w.\-]+(?:/[\w.\-]+)*))?!(\d+)").expect("Invalid regex")
    })
}

/// Finds a pull request number in a GitHub commit message.
///
/// Recognizes the squash suffix `Title (#123)` and the merge commit subject
/// `Merge pull request #123 from ...`. The merge subject wins if both appear.
pub fn github_reference(message: &str) -> Option<MessageReference> {
    let captures = github_merge_re()
        .captures(message)
        .or_else(|| github_squash_re().captures(message))?;
    let number = captures.get(1)?.as_str().parse().ok()?;
    Some(MessageReference {
        project_path: None,
        number,
    })
}

/// Finds a merge request in a GitLab merge commit trailer such as
/// `See merge request group/project!123`.
pub fn gitlab_reference(message: &str) -> Option<MessageReference> {
    let captures = gitlab_merge_re().captures(message)?;
    let number = captures.get(2)?.as_str().parse().ok()?;
    Some(MessageReference {
        project_path: captures.get(1).map(|m| m.as_str().to_string()),
        number,
    })
}
