//! CLI command implementations.

pub mod blame;
pub mod config;
pub mod lookup;
pub mod providers;

use std::sync::Arc;

use anyhow::Result;
use mrlens_engine::{Engine, LookupError};
use mrlens_store::SettingsStore;
use tracing::debug;

use crate::Cli;
use crate::output::TextFormatter;

/// Loads the settings store from `--config` or the default location.
pub async fn load_store(cli: &Cli) -> Result<SettingsStore> {
    let store = match &cli.config_path {
        Some(path) => SettingsStore::load(path.clone()).await?,
        None => SettingsStore::load_default().await?,
    };
    debug!(path = %store.path().display(), "Settings loaded");
    Ok(store)
}

/// Builds an engine from the stored settings.
///
/// Surfaced credential errors are printed to stderr unless `--quiet`.
pub async fn build_engine(cli: &Cli) -> Result<Engine> {
    let settings = load_store(cli).await?.get().await;
    settings.validate()?;
    let engine = Engine::builder().settings(settings).build();

    if !cli.quiet {
        let formatter = Arc::new(TextFormatter::new(!cli.no_color));
        engine.on_error(move |e: &LookupError| {
            if e.should_surface {
                eprintln!(
                    "{}",
                    formatter.format_error(e.provider.display_name(), &credential_hint(e))
                );
            }
        });
    }
    Ok(engine)
}

fn credential_hint(error: &LookupError) -> String {
    let env = error.provider.default_token_env();
    format!("{} (check ${env} or the provider's token_env setting)", error.error)
}
