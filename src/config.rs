//! Shared config utilities for loading/saving JSON config files,
//! resolving API keys from fields or environment variables, and the
//! top-level [`AppConfig`] the binary starts from.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::theme::store::BackendConfig;
use crate::vote::config::VoteConfig;

/// Directory name under the platform data dir.
pub const APP_DIR_NAME: &str = "com.catalog.engine";

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "CATALOG_ENGINE_CONFIG";

/// Generic load for any Serde config type with a `Default` implementation.
/// Falls back to `T::default()` if the file is missing or unparsable.
pub fn load_json_config<T: DeserializeOwned + Default>(path: &Path, label: &str) -> T {
    match std::fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<T>(&content) {
            Ok(config) => {
                info!("[{}] Loaded config from {}", label, path.display());
                config
            }
            Err(e) => {
                warn!(
                    "[{}] Failed to parse config {}: {}, using defaults",
                    label,
                    path.display(),
                    e
                );
                T::default()
            }
        },
        Err(_) => {
            info!(
                "[{}] No config file at {}, using defaults",
                label,
                path.display()
            );
            T::default()
        }
    }
}

/// Generic save for any Serde config type. Creates parent directories.
pub fn save_json_config<T: Serialize>(path: &Path, config: &T, label: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let json = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    std::fs::write(path, json).map_err(|e| format!("Failed to write config file: {}", e))?;
    info!("[{}] Saved config to {}", label, path.display());
    Ok(())
}

/// Resolve an API key: check the direct `api_key` field first,
/// then fall back to reading the environment variable named in `api_key_env`.
pub fn resolve_api_key(api_key: &Option<String>, api_key_env: &Option<String>) -> Option<String> {
    if let Some(ref key) = api_key {
        if !key.is_empty() {
            return Some(key.clone());
        }
    }
    if let Some(ref env_var) = api_key_env {
        if let Ok(key) = std::env::var(env_var) {
            if !key.is_empty() {
                return Some(key);
            }
        }
    }
    None
}

/// Platform data directory for this app, e.g. `~/.local/share/com.catalog.engine`.
pub fn app_data_dir() -> PathBuf {
    dirs_next::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// Where the config file lives: `$CATALOG_ENGINE_CONFIG` or `<data dir>/config.json`.
pub fn config_path() -> PathBuf {
    match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) if !path.is_empty() => PathBuf::from(path),
        _ => app_data_dir().join("config.json"),
    }
}

// ── Top-level config ───────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub vote: VoteConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub theme: ThemeSettings,
}

/// Client-side theme settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeSettings {
    /// Where the persisted mode/slug/snapshot live. Defaults to `<data dir>/theme_prefs.json`.
    #[serde(default)]
    pub prefs_path: Option<PathBuf>,
    /// Poll interval used in place of a realtime channel. 0 disables polling.
    #[serde(default = "default_poll_secs")]
    pub poll_interval_secs: u64,
}

fn default_poll_secs() -> u64 {
    30
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            prefs_path: None,
            poll_interval_secs: default_poll_secs(),
        }
    }
}

impl ThemeSettings {
    pub fn resolved_prefs_path(&self) -> PathBuf {
        self.prefs_path
            .clone()
            .unwrap_or_else(|| app_data_dir().join("theme_prefs.json"))
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Self {
        load_json_config(path, "Config")
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        save_json_config(path, self, "Config")
    }
}
