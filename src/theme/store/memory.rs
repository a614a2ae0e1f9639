use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};

use super::{ThemeChange, ThemeError, ThemeStore, CHANGE_CHANNEL_CAPACITY};
use crate::theme::record::ThemeRecord;

/// Theme table held in process. Used offline and in tests.
pub struct MemoryThemeStore {
    rows: RwLock<Vec<ThemeRecord>>,
    changes: broadcast::Sender<ThemeChange>,
}

impl MemoryThemeStore {
    pub fn new() -> Self {
        Self::with_themes(Vec::new())
    }

    pub fn with_themes(themes: Vec<ThemeRecord>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            rows: RwLock::new(themes),
            changes,
        }
    }

    fn notify(&self, change: ThemeChange) {
        // no subscribers is fine
        let _ = self.changes.send(change);
    }
}

impl Default for MemoryThemeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ThemeStore for MemoryThemeStore {
    async fn fetch_all(&self) -> Result<Vec<ThemeRecord>, ThemeError> {
        Ok(self.rows.read().await.clone())
    }

    async fn set_active(&self, id: &str, active: bool) -> Result<(), ThemeError> {
        {
            let mut rows = self.rows.write().await;
            let row = rows
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| ThemeError::NotFound(id.to_string()))?;
            row.is_active = active;
        }
        self.notify(ThemeChange::Updated(id.to_string()));
        Ok(())
    }

    async fn insert(&self, mut theme: ThemeRecord) -> Result<ThemeRecord, ThemeError> {
        if theme.id.is_empty() {
            theme.id = uuid::Uuid::new_v4().to_string();
        }
        {
            let mut rows = self.rows.write().await;
            if rows.iter().any(|t| t.slug == theme.slug) {
                return Err(ThemeError::Backend {
                    status: 409,
                    body: format!("duplicate slug {}", theme.slug),
                });
            }
            rows.push(theme.clone());
        }
        self.notify(ThemeChange::Inserted(theme.id.clone()));
        Ok(theme)
    }

    async fn update(&self, theme: &ThemeRecord) -> Result<(), ThemeError> {
        {
            let mut rows = self.rows.write().await;
            let row = rows
                .iter_mut()
                .find(|t| t.id == theme.id)
                .ok_or_else(|| ThemeError::NotFound(theme.id.clone()))?;
            *row = theme.clone();
        }
        self.notify(ThemeChange::Updated(theme.id.clone()));
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), ThemeError> {
        {
            let mut rows = self.rows.write().await;
            let before = rows.len();
            rows.retain(|t| t.id != id);
            if rows.len() == before {
                return Err(ThemeError::NotFound(id.to_string()));
            }
        }
        self.notify(ThemeChange::Deleted(id.to_string()));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ThemeChange> {
        self.changes.subscribe()
    }
}
