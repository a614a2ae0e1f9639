use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::particles::{particle_count, DeviceProfile};
use crate::theme::{seasonal_asset, AssetSlot, ColorMode, ParticleConfig, RootStyle, ThemeEngine, ThemeHost, ThemeMode};
use crate::vote::{vote_route, VoteEndpoint};

pub const DEFAULT_LOGO: &str = "/logo.png";
pub const DEFAULT_HOME_AVATAR: &str = "/avatar.png";
pub const DEFAULT_PREVIEW_IMAGE: &str = "/preview.png";

/// The theme engine plus the root style it keeps in sync for first paint.
pub struct ThemeState {
    pub engine: Arc<ThemeEngine>,
    host: Mutex<ThemeHost<RootStyle>>,
}

impl ThemeState {
    /// Seeds the root style from the persisted snapshot, if any.
    pub async fn new(engine: Arc<ThemeEngine>) -> Self {
        let mut host = ThemeHost::new(RootStyle::default());
        engine.restore_cached(&mut host).await;
        Self {
            engine,
            host: Mutex::new(host),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeQuery {
    #[serde(default)]
    color_mode: ColorMode,
    cores: Option<usize>,
    #[serde(default)]
    mobile: bool,
    #[serde(default)]
    save_data: bool,
    #[serde(default)]
    reduced_motion: bool,
}

impl ThemeQuery {
    fn device(&self) -> DeviceProfile {
        DeviceProfile {
            hardware_concurrency: self.cores,
            is_mobile: self.mobile,
            save_data: self.save_data,
            prefers_reduced_motion: self.reduced_motion,
        }
    }
}

/// What a page needs to render the current theme server-side.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeView {
    pub mode: ThemeMode,
    pub slug: Option<String>,
    pub class_name: String,
    pub css: String,
    pub particles: Option<ParticleConfig>,
    pub particle_count: usize,
    pub logo: String,
    pub home_avatar: String,
    pub preview_image: String,
}

async fn current_theme(query: ThemeQuery, state: Arc<ThemeState>) -> Response {
    let theme = state.engine.active_theme().await;
    let mut host = state.host.lock().await;
    state.engine.apply(&mut host, query.color_mode).await;

    let particles = theme.as_ref().and_then(|t| t.particle_config.clone());
    let view = ThemeView {
        mode: state.engine.mode().await,
        slug: host.applied().slug.clone(),
        class_name: host.target().class_attr(),
        css: host.target().to_css(),
        particle_count: particles
            .as_ref()
            .map(|p| particle_count(p, None, &query.device()))
            .unwrap_or(0),
        particles,
        logo: seasonal_asset(theme.as_ref(), AssetSlot::Logo, DEFAULT_LOGO),
        home_avatar: seasonal_asset(theme.as_ref(), AssetSlot::HomeAvatar, DEFAULT_HOME_AVATAR),
        preview_image: seasonal_asset(theme.as_ref(), AssetSlot::PreviewImage, DEFAULT_PREVIEW_IMAGE),
    };
    warp::reply::json(&view).into_response()
}

/// `GET /theme?colorMode=dark&cores=4`
pub fn theme_route(state: Arc<ThemeState>) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    warp::path("theme")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<ThemeQuery>())
        .and(warp::any().map(move || Arc::clone(&state)))
        .then(current_theme)
}

pub fn routes(
    votes: Arc<VoteEndpoint>,
    themes: Arc<ThemeState>,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    vote_route(votes).or(theme_route(themes)).unify()
}

/// Bind on an ephemeral port and serve in the background.
pub fn start(votes: Arc<VoteEndpoint>, themes: Arc<ThemeState>) -> SocketAddr {
    let (addr, fut) = warp::serve(routes(votes, themes)).bind_ephemeral(([127, 0, 0, 1], 0));
    info!("[Server] Listening on http://{}", addr);
    tokio::spawn(fut);
    addr
}

/// Serve on `addr` until `shutdown` resolves.
pub async fn serve_until(
    addr: SocketAddr,
    votes: Arc<VoteEndpoint>,
    themes: Arc<ThemeState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let (bound, fut) = warp::serve(routes(votes, themes)).try_bind_with_graceful_shutdown(addr, shutdown)?;
    info!("[Server] Listening on http://{}", bound);
    fut.await;
    info!("[Server] Shut down");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("[Server] Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("[Server] Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("[Server] Shutdown signal received");
}
