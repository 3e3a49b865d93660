//! Provider-related types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

// ============================================================================
// Provider Kind
// ============================================================================

/// Supported hosting platforms.
///
/// The lowercase identifier is the first half of every cache and in-flight
/// key, so the same SHA mirrored to two platforms never collides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// GitLab (gitlab.com or self-hosted)
    GitLab,
    /// GitHub (github.com or Enterprise)
    GitHub,
}

impl ProviderKind {
    /// Returns the stable identifier for this provider.
    pub fn id(&self) -> &'static str {
        match self {
            Self::GitLab => "gitlab",
            Self::GitHub => "github",
        }
    }

    /// Returns the display name for this provider.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::GitLab => "GitLab",
            Self::GitHub => "GitHub",
        }
    }

    /// Returns all available provider kinds, in default registration order.
    pub fn all() -> &'static [ProviderKind] {
        &[Self::GitLab, Self::GitHub]
    }

    /// Default web host for the public instance.
    pub fn default_host(&self) -> &'static str {
        match self {
            Self::GitLab => "https://gitlab.com",
            Self::GitHub => "https://github.com",
        }
    }

    /// Environment variable conventionally holding the access token.
    pub fn default_token_env(&self) -> &'static str {
        match self {
            Self::GitLab => "GITLAB_TOKEN",
            Self::GitHub => "GITHUB_TOKEN",
        }
    }

    /// What the platform calls a reviewable change.
    pub fn request_noun(&self) -> &'static str {
        match self {
            Self::GitLab => "merge request",
            Self::GitHub => "pull request",
        }
    }

    /// Prefix used when referencing a change by number (`!12` vs `#12`).
    pub fn reference_prefix(&self) -> char {
        match self {
            Self::GitLab => '!',
            Self::GitHub => '#',
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ProviderKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gitlab" => Ok(Self::GitLab),
            "github" => Ok(Self::GitHub),
            other => Err(CoreError::UnknownProvider(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_is_case_insensitive() {
        assert_eq!("GitLab".parse::<ProviderKind>().unwrap(), ProviderKind::GitLab);
        assert_eq!(" github ".parse::<ProviderKind>().unwrap(), ProviderKind::GitHub);
        assert!("bitbucket".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_display_matches_id() {
        for kind in ProviderKind::all() {
            assert_eq!(kind.to_string(), kind.id());
        }
    }
}
