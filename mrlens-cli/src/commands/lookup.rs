//! Lookup command - resolve one commit.

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::build_engine;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the lookup command.
#[derive(Args, Debug)]
pub struct LookupArgs {
    /// Git remote URL, e.g. git@gitlab.com:group/project.git.
    pub remote: String,

    /// Commit SHA.
    pub sha: String,

    /// Also fetch change-size stats.
    #[arg(long)]
    pub stats: bool,

    /// Stop waiting after this many seconds.
    #[arg(long, short = 't')]
    pub timeout: Option<u64>,
}

/// Runs the lookup command.
pub async fn run(args: &LookupArgs, cli: &Cli) -> Result<ExitCode> {
    let engine = build_engine(cli).await?;
    let Some(provider) = engine.registry().detect(&args.remote) else {
        anyhow::bail!("No enabled provider handles remote {}", args.remote);
    };

    let cancel = CancellationToken::new();
    spawn_canceller(cancel.clone(), args.timeout);

    let mut result = engine.resolve(&args.remote, &args.sha, &cancel).await;
    let mut stats_error = None;
    if args.stats && result.is_found() {
        match engine.enrich_stats(&args.remote, &args.sha).await {
            Ok(mr) => result.mr = Some(mr),
            Err(e) => {
                warn!(error = %e, "Could not fetch stats");
                stats_error = Some(e.to_string());
            }
        }
    }
    debug!(stats = ?engine.stats(), "Lookup finished");

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_lookup(provider.kind(), &args.sha, &result));
            if cli.verbose {
                println!("{}", formatter.format_stats(&engine.stats()));
            }
        }
        OutputFormat::Json => {
            let output = JsonFormatter::lookup_output(
                &args.sha,
                Some(provider.kind().id()),
                &result,
                stats_error,
            );
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
    }

    engine.dispose();
    Ok(if result.pending {
        ExitCode::Timeout
    } else if result.is_found() {
        ExitCode::Success
    } else {
        ExitCode::NotFound
    })
}

/// Cancels on Ctrl-C or after `timeout_secs`.
pub fn spawn_canceller(cancel: CancellationToken, timeout_secs: Option<u64>) {
    tokio::spawn(async move {
        let timeout = async {
            match timeout_secs {
                Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => debug!("Interrupted"),
            () = timeout => debug!("Timed out"),
            () = cancel.cancelled() => {}
        }
        cancel.cancel();
    });
}
