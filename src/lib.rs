pub mod config;
pub mod particles;
pub mod seasonal;
pub mod server;
pub mod theme;
pub mod utils;
pub mod vote;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{config_path, AppConfig};
use crate::server::ThemeState;
use crate::theme::fallback::fallback_themes;
use crate::theme::{MemoryThemeStore, RestThemeStore, ThemeEngine, ThemeStore};
use crate::vote::{SqliteLikeStore, VoteEndpoint, VoteService};

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = config_path();
    let config = AppConfig::load(&config_path);
    if !config_path.exists() {
        if let Err(e) = config.save(&config_path) {
            warn!("[Config] Could not write default config: {}", e);
        }
    }

    // Votes
    let likes = SqliteLikeStore::open(&config.vote.database_url).await?;
    let votes = Arc::new(VoteEndpoint::new(VoteService::new(Arc::new(likes), config.vote.clone())));

    // Themes
    let store: Arc<dyn ThemeStore> = match RestThemeStore::new(&config.backend) {
        Ok(rest) => {
            let rest = Arc::new(rest);
            if config.theme.poll_interval_secs > 0 {
                let _poller = rest.spawn_change_poller(Duration::from_secs(config.theme.poll_interval_secs));
            }
            rest
        }
        Err(e) => {
            warn!("[Theme] No theme backend ({}), serving built-in themes", e);
            Arc::new(MemoryThemeStore::with_themes(fallback_themes()))
        }
    };
    let engine = Arc::new(ThemeEngine::new(store, Some(config.theme.resolved_prefs_path())));
    let themes = Arc::new(ThemeState::new(Arc::clone(&engine)).await);
    engine.refetch().await;
    let _watcher = engine.watch();
    if let Some(theme) = engine.active_theme().await {
        info!("[Theme] Active theme: {} ({})", theme.name, theme.slug);
    }

    let addr: SocketAddr = format!("{}:{}", config.vote.host, config.vote.port).parse()?;
    server::serve_until(addr, votes, themes, server::shutdown_signal()).await
}
