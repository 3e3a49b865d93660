//! Blame command - annotate blame output with merge requests.
//!
//! Reads one JSON blame record per line (`{"sha", "author", "date",
//! "summary"}`), resolves every distinct committed SHA concurrently and
//! prints the lines in input order.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use futures::StreamExt;
use mrlens_core::BlameLine;
use mrlens_engine::LookupResult;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::build_engine;
use super::lookup::spawn_canceller;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Lookups running at once.
const MAX_CONCURRENT_LOOKUPS: usize = 8;

/// Arguments for the blame command.
#[derive(Args, Debug)]
pub struct BlameArgs {
    /// Git remote URL of the blamed repository.
    #[arg(long, short)]
    pub remote: String,

    /// JSON-lines blame file; stdin when omitted.
    pub input: Option<PathBuf>,

    /// Stop waiting after this many seconds.
    #[arg(long, short = 't')]
    pub timeout: Option<u64>,
}

/// Runs the blame command.
pub async fn run(args: &BlameArgs, cli: &Cli) -> Result<ExitCode> {
    let lines = match &args.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Cannot open {}", path.display()))?;
            read_blame(BufReader::new(file)).await?
        }
        None => read_blame(BufReader::new(tokio::io::stdin())).await?,
    };

    let engine = build_engine(cli).await?;
    if engine.registry().detect(&args.remote).is_none() {
        anyhow::bail!("No enabled provider handles remote {}", args.remote);
    }

    let shas = unique_committed(&lines);
    info!(lines = lines.len(), commits = shas.len(), "Resolving blame");

    let cancel = CancellationToken::new();
    spawn_canceller(cancel.clone(), args.timeout);

    let results: HashMap<String, LookupResult> = futures::stream::iter(shas)
        .map(|sha| {
            let engine = engine.clone();
            let cancel = cancel.clone();
            let remote = args.remote.clone();
            async move {
                let result = engine.resolve(&remote, &sha, &cancel).await;
                (sha, result)
            }
        })
        .buffer_unordered(MAX_CONCURRENT_LOOKUPS)
        .collect()
        .await;
    debug!(stats = ?engine.stats(), "Blame resolved");

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            for line in &lines {
                println!("{}", formatter.format_blame_line(line, results.get(&line.sha)));
            }
            if cli.verbose {
                println!("{}", formatter.format_stats(&engine.stats()));
            }
        }
        OutputFormat::Json => {
            let output: Vec<_> = lines
                .iter()
                .enumerate()
                .map(|(i, line)| JsonFormatter::blame_output(i, line, results.get(&line.sha)))
                .collect();
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
    }

    engine.dispose();
    Ok(if results.values().any(|r| r.pending) {
        ExitCode::Timeout
    } else {
        ExitCode::Success
    })
}

/// Parses JSON-lines blame records, skipping blank lines.
async fn read_blame<R: AsyncBufRead + Unpin>(reader: R) -> Result<Vec<BlameLine>> {
    let mut lines = reader.lines();
    let mut records = Vec::new();
    let mut number = 0usize;

    while let Some(raw) = lines.next_line().await? {
        number += 1;
        if raw.trim().is_empty() {
            continue;
        }
        let record: BlameLine = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid blame record on line {number}"))?;
        records.push(record);
    }
    Ok(records)
}

/// Distinct committed SHAs in first-seen order.
fn unique_committed(lines: &[BlameLine]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    lines
        .iter()
        .filter(|l| !l.is_uncommitted() && !l.sha.is_empty())
        .filter(|l| seen.insert(l.sha.as_str()))
        .map(|l| l.sha.clone())
        .collect()
}
