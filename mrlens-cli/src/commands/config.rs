//! Config command - manage configuration.

use anyhow::Result;
use clap::{Args, Subcommand};
use mrlens_core::ProviderKind;
use mrlens_store::{Settings, default_config_dir, save_json};
use tracing::info;

use super::load_store;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration.
    Show,

    /// Show configuration paths.
    Path,

    /// Write a default settings file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Enable a provider.
    Enable {
        /// Provider id: gitlab or github.
        provider: ProviderKind,
    },

    /// Disable a provider.
    Disable {
        /// Provider id: gitlab or github.
        provider: ProviderKind,
    },

    /// Point a provider at a self-hosted instance.
    Host {
        /// Provider id: gitlab or github.
        provider: ProviderKind,

        /// Instance URL, e.g. https://gitlab.acme.io. Omit to restore the public host.
        url: Option<String>,
    },

    /// Set the cache TTL in seconds (0 disables caching).
    Ttl {
        /// Seconds.
        secs: u64,
    },
}

/// Runs the config command.
pub async fn run(args: &ConfigArgs, cli: &Cli) -> Result<ExitCode> {
    match &args.action {
        ConfigAction::Show => show_config(cli).await?,
        ConfigAction::Path => show_paths(cli).await?,
        ConfigAction::Init { force } => init_config(*force, cli).await?,
        ConfigAction::Enable { provider } => set_enabled(*provider, true, cli).await?,
        ConfigAction::Disable { provider } => set_enabled(*provider, false, cli).await?,
        ConfigAction::Host { provider, url } => set_host(*provider, url.clone(), cli).await?,
        ConfigAction::Ttl { secs } => set_ttl(*secs, cli).await?,
    }
    Ok(ExitCode::Success)
}

async fn show_config(cli: &Cli) -> Result<()> {
    let store = load_store(cli).await?;
    let settings = store.get().await;

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_settings(&settings));
        }
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format(&settings)?);
        }
    }
    Ok(())
}

async fn show_paths(cli: &Cli) -> Result<()> {
    let store = load_store(cli).await?;
    let config_dir = default_config_dir();
    let settings_path = store.path();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration Paths");
            println!("{}", "─".repeat(40));
            println!();
            println!("Config dir:    {}", config_dir.display());
            println!("Settings file: {}", settings_path.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "config_dir": config_dir.display().to_string(),
                "settings_file": settings_path.display().to_string(),
            });
            println!("{}", JsonFormatter::new(cli.pretty).format(&paths)?);
        }
    }
    Ok(())
}

async fn init_config(force: bool, cli: &Cli) -> Result<()> {
    let store = load_store(cli).await?;
    let path = store.path().to_path_buf();

    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    save_json(&path, &Settings::default()).await?;

    info!(path = %path.display(), "Settings initialised");
    println!("Wrote default settings to {}", path.display());
    Ok(())
}

async fn set_enabled(provider: ProviderKind, enabled: bool, cli: &Cli) -> Result<()> {
    let store = load_store(cli).await?;
    store.set_provider_enabled(provider, enabled).await;
    store.save().await?;

    let verb = if enabled { "Enabled" } else { "Disabled" };
    info!(provider = %provider, enabled, "Provider toggled");
    println!("{verb}: {}", provider.display_name());
    Ok(())
}

async fn set_host(provider: ProviderKind, url: Option<String>, cli: &Cli) -> Result<()> {
    let store = load_store(cli).await?;
    store.set_provider_host(provider, url).await;

    let settings = store.get().await;
    settings.validate()?;
    store.save().await?;

    let host = settings.provider(provider).host_or_default(provider);
    info!(provider = %provider, host = %host, "Provider host updated");
    println!("{} host: {host}", provider.display_name());
    Ok(())
}

async fn set_ttl(secs: u64, cli: &Cli) -> Result<()> {
    let store = load_store(cli).await?;
    store.set_cache_ttl_secs(secs).await;
    store.save().await?;

    info!(secs, "Cache TTL updated");
    println!("Cache TTL set to {secs}s");
    Ok(())
}
