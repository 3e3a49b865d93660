// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! `MrLens` CLI - find the merge request that introduced a commit.
//!
//! # Examples
//!
//! ```bash
//! # Resolve one commit
//! mrlens lookup git@gitlab.com:group/project.git 4f2a9c1
//!
//! # Include change-size stats, as JSON
//! mrlens lookup https://github.com/owner/repo 4f2a9c1 --stats --format json
//!
//! # Annotate JSON-lines blame output
//! my-blame-tool src/main.rs | mrlens blame --remote git@gitlab.com:group/project.git
//!
//! # Which provider handles a remote?
//! mrlens providers --remote git@gitlab.acme.io:team/app.git
//!
//! # Settings
//! mrlens config show
//! ```

mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{blame, config, lookup, providers};

// ============================================================================
// CLI Definition
// ============================================================================

/// `MrLens` CLI - commit to merge request lookup.
#[derive(Parser, Debug)]
#[command(name = "mrlens")]
#[command(about = "Find the merge request or pull request that introduced a commit")]
#[command(long_about = r"
MrLens maps commits to the GitLab merge request or GitHub pull request
that introduced them.

Supported providers:
  • GitLab (gitlab)   token from $GITLAB_TOKEN
  • GitHub (github)   token from $GITHUB_TOKEN

Examples:
  mrlens lookup <remote> <sha>          # One commit
  mrlens lookup <remote> <sha> --stats  # With change-size stats
  mrlens blame --remote <remote>        # Annotate blame JSON-lines from stdin
  mrlens providers --remote <remote>    # Provider detection
")]
#[command(version)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Settings file to use instead of the default location.
    #[arg(long = "config", global = true, env = "MRLENS_CONFIG")]
    pub config_path: Option<PathBuf>,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a commit to its merge request.
    #[command(visible_alias = "l")]
    Lookup(lookup::LookupArgs),

    /// Annotate JSON-lines blame records with merge requests.
    #[command(visible_alias = "b")]
    Blame(blame::BlameArgs),

    /// List providers.
    #[command(visible_alias = "p")]
    Providers(providers::ProvidersArgs),

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// No provider handles the remote.
    UnsupportedRemote = 2,
    /// The lookup settled without a merge request.
    NotFound = 3,
    /// Timed out or interrupted before the lookup settled.
    Timeout = 4,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("mrlens=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mrlens=warn"))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Lookup(args) => lookup::run(args, &cli).await,
        Commands::Blame(args) => blame::run(args, &cli).await,
        Commands::Providers(args) => providers::run(args, &cli).await,
        Commands::Config(args) => config::run(args, &cli).await,
    };

    match result {
        Ok(ExitCode::Success) => Ok(()),
        Ok(code) => std::process::exit(code as i32),
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e:#}");
            }
            std::process::exit(ExitCode::Error as i32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_lookup() {
        let cli = Cli::parse_from([
            "mrlens", "lookup", "git@gitlab.com:g/p.git", "abc123", "--stats", "-f", "json",
        ]);
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Lookup(args) => {
                assert_eq!(args.sha, "abc123");
                assert!(args.stats);
                assert_eq!(args.timeout, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_config_enable_provider() {
        let cli = Cli::parse_from(["mrlens", "config", "enable", "github"]);
        match cli.command {
            Commands::Config(config::ConfigArgs {
                action: config::ConfigAction::Enable { provider },
            }) => assert_eq!(provider, mrlens_core::ProviderKind::GitHub),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_config_host() {
        let cli = Cli::parse_from(["mrlens", "config", "host", "gitlab", "https://gitlab.acme.io"]);
        match cli.command {
            Commands::Config(config::ConfigArgs {
                action: config::ConfigAction::Host { provider, url },
            }) => {
                assert_eq!(provider, mrlens_core::ProviderKind::GitLab);
                assert_eq!(url.as_deref(), Some("https://gitlab.acme.io"));
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let reset = Cli::parse_from(["mrlens", "config", "host", "github"]);
        assert!(matches!(
            reset.command,
            Commands::Config(config::ConfigArgs {
                action: config::ConfigAction::Host { url: None, .. },
            })
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_provider() {
        assert!(Cli::try_parse_from(["mrlens", "config", "enable", "bitbucket"]).is_err());
    }
}
