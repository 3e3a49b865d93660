//! Text output formatting with colors.

use mrlens_core::{BlameLine, MergeRequest, ProviderKind, RemoteInfo};
use mrlens_engine::{EngineStats, LookupResult};
use mrlens_store::Settings;

use super::json::ProviderOutput;

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

/// Abbreviated SHA length used in blame output.
const SHORT_SHA: usize = 8;

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Formats a merge request on one or more lines.
    pub fn format_merge_request(&self, mr: &MergeRequest) -> String {
        let mut lines = vec![format!(
            "{} {}",
            self.bold(&mr.reference()),
            mr.title
        )];

        let state = if mr.is_merged() {
            self.green(&mr.state)
        } else {
            self.yellow(&mr.state)
        };
        match mr.merged_at {
            Some(at) => lines.push(format!(
                "State:   {} {}",
                state,
                self.dim(&format!("({})", at.format("%Y-%m-%d %H:%M UTC")))
            )),
            None => lines.push(format!("State:   {state}")),
        }

        lines.push(format!("URL:     {}", self.cyan(&mr.web_url)));
        if let Some(summary) = mr.stats.as_ref().and_then(|s| s.summary()) {
            lines.push(format!("Changes: {summary}"));
        }
        lines.join("\n")
    }

    /// Formats the outcome of a lookup, naming the change the way `kind` does.
    pub fn format_lookup(&self, kind: ProviderKind, sha: &str, result: &LookupResult) -> String {
        if result.pending {
            return self.yellow(&format!("Lookup for {} did not finish", short_sha(sha)));
        }
        let Some(mr) = result.mr.as_deref() else {
            return self.dim(&format!(
                "No {} found for {}",
                kind.request_noun(),
                short_sha(sha)
            ));
        };

        let mut out = self.format_merge_request(mr);
        if result.from_cache {
            out.push_str(&format!("\n{}", self.dim("(cached)")));
        }
        out
    }

    /// Formats one blame line with its merge request, if any.
    pub fn format_blame_line(&self, line: &BlameLine, result: Option<&LookupResult>) -> String {
        let sha = if line.is_uncommitted() {
            self.dim(&"-".repeat(SHORT_SHA))
        } else {
            short_sha(&line.sha).to_string()
        };

        let reference = match result.and_then(|r| r.mr.as_deref()) {
            Some(mr) => self.cyan(&format!("{:<7}", mr.reference())),
            None => self.dim(&format!("{:<7}", "-")),
        };

        let author: String = line.author.chars().take(16).collect();
        format!("{sha} {author:<16} {reference} {}", line.summary)
    }

    /// Formats the providers table header.
    pub fn format_providers_header(&self) -> String {
        format!(
            "{:<10} {:<28} {:<8} {}",
            self.bold("Provider"),
            self.bold("Host"),
            self.bold("Token"),
            self.bold("Env")
        )
    }

    /// Formats a single provider line.
    pub fn format_provider_line(&self, provider: &ProviderOutput) -> String {
        let token = if provider.has_token {
            self.green("✓")
        } else {
            self.red("✗")
        };
        let name = if provider.enabled {
            provider.name.clone()
        } else {
            self.dim(&format!("{} (off)", provider.name))
        };

        let mut line = format!(
            "{:<10} {:<28} {:<8} {}",
            name, provider.host, token, provider.token_env
        );
        if provider.claims_remote == Some(true) {
            line.push_str(&format!("  {}", self.green("← handles remote")));
        }
        line
    }

    /// Formats a parsed remote.
    pub fn format_remote(&self, remote: &RemoteInfo) -> String {
        format!(
            "Remote:  {} {}",
            self.bold(&remote.host),
            self.dim(&remote.project_path)
        )
    }

    /// Formats the settings.
    pub fn format_settings(&self, settings: &Settings) -> String {
        let mut lines = vec![self.bold("MrLens Configuration"), "─".repeat(40)];
        lines.push(format!("Cache TTL:       {}s", settings.cache_ttl_secs));
        lines.push(format!("Request timeout: {}s", settings.request_timeout_secs));
        lines.push(format!("Log level:       {}", settings.log_level));
        lines.push(String::new());
        lines.push("Providers:".to_string());
        for kind in mrlens_core::ProviderKind::all() {
            let p = settings.provider(*kind);
            let status = if p.enabled {
                self.green("enabled")
            } else {
                self.dim("disabled")
            };
            lines.push(format!(
                "  {:<8} {} {} (token from ${})",
                kind.display_name(),
                status,
                p.host_or_default(*kind),
                p.token_env_or_default(*kind)
            ));
        }
        lines.join("\n")
    }

    /// Formats engine counters, shown with `--verbose`.
    pub fn format_stats(&self, stats: &EngineStats) -> String {
        self.dim(&format!(
            "fetches={} cache_hits={} coalesced={} cancelled={} errors={}",
            stats.fetches, stats.cache_hits, stats.coalesced, stats.cancelled, stats.errors
        ))
    }

    /// Formats an error message.
    pub fn format_error(&self, provider: &str, error: &str) -> String {
        format!("{} {}: {}", self.red("✗"), self.bold(provider), error)
    }

    // ========================================================================
    // Color helpers
    // ========================================================================

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_colors {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }
}

/// First [`SHORT_SHA`] characters of a SHA.
pub fn short_sha(sha: &str) -> &str {
    sha.get(..SHORT_SHA).unwrap_or(sha)
}
