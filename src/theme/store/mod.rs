pub mod memory;
pub mod rest;

pub use memory::MemoryThemeStore;
pub use rest::RestThemeStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

use super::record::ThemeRecord;

// ── Error Types ────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("Theme not found: {0}")]
    NotFound(String),
    #[error("Backend returned {status}: {body}")]
    Backend { status: u16, body: String },
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid theme payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Backend not configured: {0}")]
    Config(String),
}

/// Change notification on the backing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThemeChange {
    Inserted(String),
    Updated(String),
    Deleted(String),
    /// Something changed but the row is unknown (e.g. detected by polling).
    Reloaded,
}

// ── Backend Config ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://project.example.co`. Unset means offline.
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub api_key_env: Option<String>,
    pub table: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            api_key_env: Some("CATALOG_BACKEND_ANON_KEY".to_string()),
            table: "themes".to_string(),
        }
    }
}

impl BackendConfig {
    pub fn resolve_api_key(&self) -> Option<String> {
        crate::config::resolve_api_key(&self.api_key, &self.api_key_env)
    }
}

// ── Store Trait ────────────────────────────────────────

/// The `themes` table. Writes are expected to notify subscribers.
#[async_trait]
pub trait ThemeStore: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<ThemeRecord>, ThemeError>;

    async fn set_active(&self, id: &str, active: bool) -> Result<(), ThemeError>;

    /// Insert a theme. An empty `id` gets a generated one. Returns the stored row.
    async fn insert(&self, theme: ThemeRecord) -> Result<ThemeRecord, ThemeError>;

    async fn update(&self, theme: &ThemeRecord) -> Result<(), ThemeError>;

    async fn delete(&self, id: &str) -> Result<(), ThemeError>;

    fn subscribe(&self) -> broadcast::Receiver<ThemeChange>;
}

pub(crate) const CHANGE_CHANNEL_CAPACITY: usize = 64;
