//! Vote endpoint configuration, stored in the `vote` section of the app config.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoteConfig {
    /// Interface to bind, e.g. "0.0.0.0".
    pub host: String,
    pub port: u16,
    /// SQLite URL for the likes table.
    pub database_url: String,
    /// CORS allow-list. Unknown origins are answered with the first entry.
    pub allowed_origins: Vec<String>,
    /// Likes one fingerprint may record inside the window.
    pub rate_limit_per_window: i64,
    pub rate_window_secs: i64,
    pub fingerprint_min_len: usize,
    pub fingerprint_max_len: usize,
    pub max_body_bytes: usize,
}

impl Default for VoteConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8787,
            database_url: "sqlite://votes.db".to_string(),
            allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:4173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
            rate_limit_per_window: 30,
            rate_window_secs: 60 * 60,
            fingerprint_min_len: 8,
            fingerprint_max_len: 128,
            max_body_bytes: 16 * 1024,
        }
    }
}
