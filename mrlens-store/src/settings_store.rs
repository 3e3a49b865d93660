//! User preferences store.
//!
//! Manages user settings with persistence and change notification.

use mrlens_core::ProviderKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::persistence::{default_settings_path, load_json_or_default, save_json};

/// Default cache TTL in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 600;

/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Settings Types
// ============================================================================

/// User preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// How long a lookup result stays cached. Zero disables caching.
    pub cache_ttl_secs: u64,

    /// Per-request HTTP timeout.
    pub request_timeout_secs: u64,

    /// Log level.
    pub log_level: LogLevel,

    /// Per-provider settings, in registration order.
    pub providers: BTreeMap<ProviderKind, ProviderSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            log_level: LogLevel::default(),
            providers: ProviderKind::all()
                .iter()
                .map(|kind| (*kind, ProviderSettings::default()))
                .collect(),
        }
    }
}

impl Settings {
    /// Cache TTL as a duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Request timeout as a duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Settings for one provider; missing entries use defaults.
    pub fn provider(&self, kind: ProviderKind) -> ProviderSettings {
        self.providers.get(&kind).cloned().unwrap_or_default()
    }

    /// Enabled provider kinds, in registration order.
    pub fn enabled_providers(&self) -> Vec<ProviderKind> {
        ProviderKind::all()
            .iter()
            .copied()
            .filter(|kind| self.provider(*kind).enabled)
            .collect()
    }

    /// Checks the settings for values the engine cannot use.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.request_timeout_secs == 0 {
            return Err(StoreError::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        for (kind, provider) in &self.providers {
            if let Some(host) = &provider.host {
                if host.trim().is_empty() {
                    return Err(StoreError::Config(format!("{kind}: host is empty")));
                }
            }
        }
        Ok(())
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Error level logging.
    Error,
    /// Warning level logging.
    #[default]
    Warn,
    /// Info level logging.
    Info,
    /// Debug level logging.
    Debug,
    /// Trace level logging.
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

/// Per-provider settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Whether the provider is registered at all.
    pub enabled: bool,

    /// Instance base URL; the public instance when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Environment variable holding the access token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            host: None,
            token_env: None,
        }
    }
}

impl ProviderSettings {
    /// Configured host or the provider's public instance.
    pub fn host_or_default(&self, kind: ProviderKind) -> String {
        self.host
            .clone()
            .unwrap_or_else(|| kind.default_host().to_string())
    }

    /// Configured token variable or the provider's conventional one.
    pub fn token_env_or_default(&self, kind: ProviderKind) -> String {
        self.token_env
            .clone()
            .unwrap_or_else(|| kind.default_token_env().to_string())
    }

    /// Reads the token from the environment.
    pub fn token(&self, kind: ProviderKind) -> Option<String> {
        let var = self.token_env_or_default(kind);
        std::env::var(&var).ok().filter(|t| !t.trim().is_empty())
    }
}

// ============================================================================
// Settings Store
// ============================================================================

/// Settings shared between the CLI and the engine builder, persisted as
/// JSON. Every [`SettingsStore::update`] bumps a version that subscribers
/// observe through a `watch` channel.
pub struct SettingsStore {
    settings: Arc<RwLock<Settings>>,
    path: PathBuf,
    version: watch::Sender<u64>,
}

impl SettingsStore {
    /// Creates a store holding defaults; nothing is read from `path`.
    pub fn new(path: PathBuf) -> Self {
        Self::with_settings(path, Settings::default())
    }

    fn with_settings(path: PathBuf, settings: Settings) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            settings: Arc::new(RwLock::new(settings)),
            path,
            version,
        }
    }

    /// Loads settings from the default path.
    ///
    /// # Errors
    ///
    /// See [`SettingsStore::load`].
    pub async fn load_default() -> Result<Self, StoreError> {
        Self::load(default_settings_path()).await
    }

    /// Loads settings from `path`.
    ///
    /// A missing file yields defaults. So does a corrupt one, after a
    /// warning.
    ///
    /// # Errors
    ///
    /// Never fails today.
    pub async fn load(path: PathBuf) -> Result<Self, StoreError> {
        let settings: Settings = load_json_or_default(&path).await;
        debug!(path = %path.display(), providers = settings.providers.len(), "Settings loaded");
        Ok(Self::with_settings(path, settings))
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets a copy of the current settings.
    pub async fn get(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Applies `f` and notifies subscribers.
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Settings),
    {
        f(&mut *self.settings.write().await);
        self.version.send_modify(|v| *v += 1);
    }

    /// Writes the current settings to disk.
    ///
    /// # Errors
    ///
    /// Returns error if settings cannot be written to disk.
    pub async fn save(&self) -> Result<(), StoreError> {
        let settings = self.get().await;
        save_json(&self.path, &settings).await?;
        info!(path = %self.path.display(), "Settings saved");
        Ok(())
    }

    /// Subscribes to settings changes. The value is the change count.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    // ========================================================================
    // Convenience Methods
    // ========================================================================

    /// Gets the cache TTL.
    pub async fn cache_ttl(&self) -> Duration {
        self.settings.read().await.cache_ttl()
    }

    /// Sets the cache TTL in seconds.
    pub async fn set_cache_ttl_secs(&self, secs: u64) {
        self.update(|s| s.cache_ttl_secs = secs).await;
    }

    /// Checks if a provider is enabled.
    pub async fn is_provider_enabled(&self, provider: ProviderKind) -> bool {
        self.settings.read().await.provider(provider).enabled
    }

    /// Enables or disables a provider.
    pub async fn set_provider_enabled(&self, provider: ProviderKind, enabled: bool) {
        self.update(|s| s.providers.entry(provider).or_default().enabled = enabled)
            .await;
    }

    /// Sets a provider's instance host; `None` restores the public instance.
    pub async fn set_provider_host(&self, provider: ProviderKind, host: Option<String>) {
        self.update(|s| s.providers.entry(provider).or_default().host = host)
            .await;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.cache_ttl(), Duration::from_secs(600));
        assert_eq!(settings.request_timeout(), Duration::from_secs(30));
        assert_eq!(
            settings.enabled_providers(),
            vec![ProviderKind::GitLab, ProviderKind::GitHub]
        );
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_provider_defaults() {
        let settings = Settings::default();
        let gitlab = settings.provider(ProviderKind::GitLab);
        assert_eq!(gitlab.host_or_default(ProviderKind::GitLab), "https://gitlab.com");
        assert_eq!(gitlab.token_env_or_default(ProviderKind::GitLab), "GITLAB_TOKEN");
        let github = settings.provider(ProviderKind::GitHub);
        assert_eq!(github.token_env_or_default(ProviderKind::GitHub), "GITHUB_TOKEN");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{"cache_ttl_secs": 0, "providers": {"gitlab": {"host": "https://git.corp"}}}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.cache_ttl_secs, 0);
        assert_eq!(settings.request_timeout_secs, 30);

        let gitlab = settings.provider(ProviderKind::GitLab);
        assert!(gitlab.enabled);
        assert_eq!(gitlab.host_or_default(ProviderKind::GitLab), "https://git.corp");
        // Not in the file, but still enabled by default.
        assert!(settings.provider(ProviderKind::GitHub).enabled);
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let settings = Settings {
            request_timeout_secs: 0,
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(StoreError::Config(_))));
    }

    #[test]
    fn test_token_reads_named_env_var() {
        let provider = ProviderSettings {
            token_env: Some("MRLENS_TEST_TOKEN_UNSET_VAR".to_string()),
            ..ProviderSettings::default()
        };
        assert!(provider.token(ProviderKind::GitLab).is_none());
    }

    #[tokio::test]
    async fn test_settings_store_update_notifies() {
        let store = SettingsStore::new(PathBuf::from("/tmp/mrlens_test_settings.json"));
        let mut rx = store.subscribe();

        store.set_cache_ttl_secs(5).await;

        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 1);
        assert_eq!(store.cache_ttl().await, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_provider_toggle() {
        let store = SettingsStore::new(PathBuf::from("/tmp/mrlens_test_settings.json"));

        assert!(store.is_provider_enabled(ProviderKind::GitHub).await);

        store.set_provider_enabled(ProviderKind::GitHub, false).await;
        assert!(!store.is_provider_enabled(ProviderKind::GitHub).await);
        assert_eq!(store.get().await.enabled_providers(), vec![ProviderKind::GitLab]);

        store.set_provider_enabled(ProviderKind::GitHub, true).await;
        assert!(store.is_provider_enabled(ProviderKind::GitHub).await);
    }

    #[tokio::test]
    async fn test_set_provider_host() {
        let store = SettingsStore::new(PathBuf::from("/tmp/mrlens_test_settings.json"));
        store
            .set_provider_host(ProviderKind::GitLab, Some("https://code.acme.io".to_string()))
            .await;
        let settings = store.get().await;
        assert_eq!(
            settings.provider(ProviderKind::GitLab).host.as_deref(),
            Some("https://code.acme.io")
        );

        store.set_provider_host(ProviderKind::GitLab, None).await;
        let settings = store.get().await;
        assert_eq!(
            settings.provider(ProviderKind::GitLab).host_or_default(ProviderKind::GitLab),
            "https://gitlab.com"
        );
    }
}
