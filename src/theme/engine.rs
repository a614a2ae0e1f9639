use futures::future::try_join_all;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::apply::{StyleTarget, ThemeHost, ThemePatch};
use super::fallback::fallback_themes;
use super::prefs::ThemePrefs;
use super::record::{ColorMode, MonthDay, ThemeRecord};
use super::resolve::{resolve_active, ThemeMode};
use super::store::{ThemeError, ThemeStore};

/// Owns the loaded themes and the current mode, and keeps a document root in
/// sync with whichever theme resolves as active.
///
/// The active theme itself is never stored: every read resolves it again from
/// `themes`, `mode` and the current date.
pub struct ThemeEngine {
    store: Arc<dyn ThemeStore>,
    themes: RwLock<Vec<ThemeRecord>>,
    mode: RwLock<ThemeMode>,
    loading: AtomicBool,
    /// Bumped by every refetch; responses from older generations are dropped.
    generation: AtomicU64,
    prefs_path: Option<PathBuf>,
    prefs: Mutex<ThemePrefs>,
}

impl ThemeEngine {
    /// `prefs_path` of `None` keeps everything in memory.
    pub fn new(store: Arc<dyn ThemeStore>, prefs_path: Option<PathBuf>) -> Self {
        let prefs = prefs_path
            .as_deref()
            .map(ThemePrefs::load)
            .unwrap_or_default();

        Self {
            store,
            themes: RwLock::new(Vec::new()),
            mode: RwLock::new(prefs.mode),
            loading: AtomicBool::new(true),
            generation: AtomicU64::new(0),
            prefs_path,
            prefs: Mutex::new(prefs),
        }
    }

    pub async fn themes(&self) -> Vec<ThemeRecord> {
        self.themes.read().await.clone()
    }

    pub async fn mode(&self) -> ThemeMode {
        *self.mode.read().await
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Reload every theme. A failed read installs the built-in fallbacks.
    /// Returns `false` when a newer refetch superseded this one.
    pub async fn refetch(&self) -> bool {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self.store.fetch_all().await;

        let themes = match result {
            Ok(rows) => {
                let active = rows.iter().filter(|t| t.is_active).count();
                if active > 1 {
                    warn!(
                        "[Theme] {} themes are flagged active, the first one wins",
                        active
                    );
                }
                rows
            }
            Err(e) => {
                error!("[Theme] Failed to load themes: {}, using fallbacks", e);
                fallback_themes()
            }
        };

        let mut current = self.themes.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("[Theme] Discarding stale theme response (generation {})", generation);
            return false;
        }
        info!("[Theme] Loaded {} themes", themes.len());
        *current = themes;
        self.loading.store(false, Ordering::SeqCst);
        true
    }

    /// Make `id` the single explicitly active theme.
    pub async fn activate_theme(&self, id: &str) -> Result<(), ThemeError> {
        let rows = self.store.fetch_all().await?;
        if !rows.iter().any(|t| t.id == id) {
            return Err(ThemeError::NotFound(id.to_string()));
        }

        let others: Vec<&str> = rows
            .iter()
            .filter(|t| t.is_active && t.id != id)
            .map(|t| t.id.as_str())
            .collect();
        try_join_all(others.iter().map(|other| self.store.set_active(other, false))).await?;
        self.store.set_active(id, true).await?;

        info!("[Theme] Activated theme {}", id);
        self.refetch().await;
        Ok(())
    }

    pub async fn deactivate_theme(&self, id: &str) -> Result<(), ThemeError> {
        self.store.set_active(id, false).await?;
        info!("[Theme] Deactivated theme {}", id);
        self.refetch().await;
        Ok(())
    }

    /// Switch resolution mode immediately and remember it on this device.
    pub async fn set_theme_mode(&self, mode: ThemeMode) {
        *self.mode.write().await = mode;
        info!("[Theme] Mode set to {}", mode);
        self.persist(|prefs| prefs.mode = mode).await;
    }

    pub async fn create_theme(&self, theme: ThemeRecord) -> Result<ThemeRecord, ThemeError> {
        let stored = self.store.insert(theme).await?;
        self.refetch().await;
        Ok(stored)
    }

    pub async fn update_theme(&self, theme: &ThemeRecord) -> Result<(), ThemeError> {
        self.store.update(theme).await?;
        self.refetch().await;
        Ok(())
    }

    pub async fn delete_theme(&self, id: &str) -> Result<(), ThemeError> {
        self.store.delete(id).await?;
        self.refetch().await;
        Ok(())
    }

    pub async fn active_theme(&self) -> Option<ThemeRecord> {
        self.active_theme_on(MonthDay::today()).await
    }

    pub async fn active_theme_on(&self, today: MonthDay) -> Option<ThemeRecord> {
        let mode = self.mode().await;
        let themes = self.themes.read().await;
        resolve_active(&themes, mode, today).cloned()
    }

    /// Sync `host` with today's active theme.
    pub async fn apply<T: StyleTarget>(&self, host: &mut ThemeHost<T>, color_mode: ColorMode) -> ThemePatch {
        self.apply_on(host, color_mode, MonthDay::today()).await
    }

    pub async fn apply_on<T: StyleTarget>(
        &self,
        host: &mut ThemeHost<T>,
        color_mode: ColorMode,
        today: MonthDay,
    ) -> ThemePatch {
        let theme = self.active_theme_on(today).await;
        let patch = host.sync(theme.as_ref(), color_mode);

        if !patch.is_empty() {
            debug!(
                "[Theme] Applied {:?}: +{} -{} properties",
                host.applied().slug,
                patch.properties_to_set.len(),
                patch.properties_to_clear.len()
            );
            let snapshot = host.applied().clone();
            self.persist(move |prefs| {
                prefs.active_slug = snapshot.slug.clone();
                prefs.css_snapshot = snapshot.slug.is_some().then_some(snapshot);
            })
            .await;
        }
        patch
    }

    /// Put the last persisted snapshot on `host`. Returns whether there was one.
    pub async fn restore_cached<T: StyleTarget>(&self, host: &mut ThemeHost<T>) -> bool {
        let snapshot = self.prefs.lock().await.css_snapshot.clone();
        match snapshot {
            Some(snapshot) => {
                debug!("[Theme] Restoring cached theme {:?}", snapshot.slug);
                host.restore(snapshot);
                true
            }
            None => false,
        }
    }

    /// Refetch on every change notification from the store. Each refetch is
    /// spawned without waiting; the generation counter sorts out overlaps.
    pub fn watch(self: &Arc<Self>) -> JoinHandle<()> {
        let mut changes = self.store.subscribe();
        let engine: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => debug!("[Theme] Change notification: {:?}", change),
                    Err(RecvError::Lagged(missed)) => {
                        warn!("[Theme] Missed {} change notifications, reloading", missed)
                    }
                    Err(RecvError::Closed) => break,
                }
                let Some(engine) = engine.upgrade() else {
                    break;
                };
                tokio::spawn(async move {
                    engine.refetch().await;
                });
            }
            debug!("[Theme] Change watcher stopped");
        })
    }

    async fn persist<F>(&self, update: F)
    where
        F: FnOnce(&mut ThemePrefs) + Send,
    {
        let mut prefs = self.prefs.lock().await;
        update(&mut prefs);
        if let Some(path) = &self.prefs_path {
            if let Err(e) = prefs.save(path) {
                warn!("[Theme] Failed to persist theme preferences: {}", e);
            }
        }
    }
}
