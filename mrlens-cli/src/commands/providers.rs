//! Providers command - list providers and detect which one handles a remote.

use anyhow::Result;
use clap::Args;
use mrlens_core::{ProviderKind, classify};
use mrlens_engine::registry_from_settings;
use mrlens_fetch::FetchContext;
use tracing::info;

use super::load_store;
use crate::output::{JsonFormatter, ProviderOutput, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the providers command.
#[derive(Args, Debug)]
pub struct ProvidersArgs {
    /// Show which provider handles this remote.
    #[arg(long, short)]
    pub remote: Option<String>,
}

/// Runs the providers command.
pub async fn run(args: &ProvidersArgs, cli: &Cli) -> Result<ExitCode> {
    info!("Listing providers");

    let settings = load_store(cli).await?.get().await;
    let registry = registry_from_settings(&settings, &FetchContext::new());
    let detected = args
        .remote
        .as_deref()
        .and_then(|remote| registry.detect(remote))
        .map(|p| p.kind());

    let rows: Vec<ProviderOutput> = ProviderKind::all()
        .iter()
        .map(|kind| {
            let provider_settings = settings.provider(*kind);
            let client = registry.get(*kind);
            ProviderOutput {
                id: kind.id().to_string(),
                name: kind.display_name().to_string(),
                host: client
                    .as_ref()
                    .map_or_else(|| provider_settings.host_or_default(*kind), |c| c.host()),
                enabled: client.is_some(),
                has_token: client.as_ref().is_some_and(|c| c.has_credential()),
                token_env: provider_settings.token_env_or_default(*kind),
                claims_remote: args.remote.as_ref().map(|_| detected == Some(*kind)),
            }
        })
        .collect();

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_providers_header());
            println!("{}", "─".repeat(60));
            for row in &rows {
                println!("{}", formatter.format_provider_line(row));
            }

            if let Some(remote) = &args.remote {
                println!();
                match classify(remote) {
                    Some(info) => println!("{}", formatter.format_remote(&info)),
                    None => println!("Remote:  not a recognised git remote"),
                }
                if detected.is_none() {
                    println!("No enabled provider handles this remote");
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format(&rows)?);
        }
    }

    Ok(if args.remote.is_some() && detected.is_none() {
        ExitCode::UnsupportedRemote
    } else {
        ExitCode::Success
    })
}
