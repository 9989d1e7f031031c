//! Configuration management for md4h

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::imagefile::GENERIC_STEMS;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub host: HostConfig,
    pub images: ImageConfig,
}

/// Sync thresholds are empirically chosen and deliberately tunable; no
/// relationship between them is assumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// How long an inbound update hash-matching the last outbound push is
    /// still treated as an echo, in milliseconds.
    pub echo_window_ms: u64,
    /// Debounce applied to external file-change bursts before reloading.
    pub watch_debounce_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// After this long without a workspace-check response, assume the
    /// image is in the workspace and proceed.
    pub workspace_check_timeout_ms: u64,
    /// General deadline for other host round-trips.
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Resize operations remembered per image for undo/redo.
    pub history_cap: usize,
    /// Resize backup location, relative to the workspace root.
    pub backup_dir: String,
    /// Additional original filenames treated as generic (and therefore
    /// renamed with an origin/timestamp) on top of the built-in set.
    pub generic_names: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sync: SyncConfig::default(),
            host: HostConfig::default(),
            images: ImageConfig::default(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            echo_window_ms: 2000,
            watch_debounce_ms: 250,
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            workspace_check_timeout_ms: 1500,
            request_timeout_ms: 5000,
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            history_cap: 10,
            backup_dir: ".md4h/image-backups".to_string(),
            generic_names: Vec::new(),
        }
    }
}

impl SyncConfig {
    pub fn echo_window(&self) -> Duration {
        Duration::from_millis(self.echo_window_ms)
    }
}

impl HostConfig {
    pub fn workspace_check_timeout(&self) -> Duration {
        Duration::from_millis(self.workspace_check_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl ImageConfig {
    /// The built-in generic stems plus any configured additions.
    pub fn all_generic_names(&self) -> Vec<String> {
        GENERIC_STEMS
            .iter()
            .map(|s| s.to_string())
            .chain(self.generic_names.iter().cloned())
            .collect()
    }
}

impl Config {
    /// Get the platform-specific config file path
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "md4h")
            .map(|proj_dirs| proj_dirs.config_dir().join("md4h.toml"))
    }

    /// Load configuration from file, falling back to defaults if missing
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load from a specific path (for testing)
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        // Check config file permissions (Unix only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let metadata = std::fs::metadata(path)?;
            let perms = metadata.permissions();
            if perms.mode() & 0o002 != 0 {
                anyhow::bail!(
                    "Config file {} is world-writable (insecure permissions)",
                    path.display()
                );
            }
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }
}
