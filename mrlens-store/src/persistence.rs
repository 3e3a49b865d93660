//! JSON files under the user's config directory.

use serde::{Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::StoreError;

// ============================================================================
// Default Paths
// ============================================================================

/// Returns the default configuration directory.
///
/// - macOS: `~/Library/Application Support/mrlens`
/// - Linux: `~/.config/mrlens`
/// - Windows: `%APPDATA%\mrlens`
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|c| c.join("mrlens"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the default settings file path.
pub fn default_settings_path() -> PathBuf {
    default_config_dir().join("settings.json")
}

// ============================================================================
// Permissions
// ============================================================================

/// Mode for files that may name token variables and private hosts.
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

/// Mode for directories created for those files.
#[cfg(unix)]
const DIR_MODE: u32 = 0o700;

#[cfg(unix)]
async fn restrict(path: &Path, mode: u32) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await?;
    debug!(path = %path.display(), mode = %format!("{mode:o}"), "Restricted permissions");
    Ok(())
}

// ============================================================================
// File Operations
// ============================================================================

/// Creates the parent directory of `path`. A directory created here is
/// restricted to the owner.
async fn ensure_parent(path: &Path) -> Result<(), StoreError> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    if tokio::fs::try_exists(parent).await? {
        return Ok(());
    }

    debug!(path = %parent.display(), "Creating config directory");
    tokio::fs::create_dir_all(parent).await?;
    #[cfg(unix)]
    restrict(parent, DIR_MODE).await?;
    Ok(())
}

/// Temp file next to `path`, so the final rename stays on one filesystem.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes `data` as pretty JSON.
///
/// The write is atomic (temp file, then rename) and on Unix the file ends
/// up readable by the owner only. Missing parent directories are created.
///
/// # Errors
///
/// Returns error if the data cannot be serialized or written.
pub async fn save_json<T: Serialize>(path: &Path, data: &T) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(data)?;
    ensure_parent(path).await?;

    let temp = temp_path(path);
    tokio::fs::write(&temp, json.as_bytes()).await?;
    #[cfg(unix)]
    restrict(&temp, FILE_MODE).await?;
    if let Err(e) = tokio::fs::rename(&temp, path).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(e.into());
    }

    debug!(path = %path.display(), bytes = json.len(), "Saved");
    Ok(())
}

/// Reads and parses a JSON file.
///
/// # Errors
///
/// Returns error if the file cannot be read or parsed. A missing file is
/// reported as [`StoreError::Io`]; see [`StoreError::is_not_found`].
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let content = tokio::fs::read_to_string(path).await?;
    let data = serde_json::from_str(&content)?;
    debug!(path = %path.display(), "Loaded");
    Ok(data)
}

/// Like [`load_json`], falling back to `T::default()`. Anything other than
/// a missing file is logged.
pub async fn load_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    load_json(path).await.unwrap_or_else(|e| {
        if !e.is_not_found() {
            warn!(path = %path.display(), error = %e, "Unreadable, using defaults");
        }
        T::default()
    })
}

// ============================================================================
// Tests
// ============================================================================
