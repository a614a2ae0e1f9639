//! Likes table.
//!
//! One row per `(item_id, device_fingerprint)`; the row existing means the
//! device loves the item. The fingerprint is an untrusted client-supplied
//! correlation key. It is good enough for de-duplication and rate limiting
//! and must never be treated as an identity.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use std::str::FromStr;
use tokio::sync::Mutex;
use tracing::info;

use super::error::VoteError;

/// Aggregate for one item as seen by one device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ItemVotes {
    pub count: i64,
    pub loved: bool,
}

/// A like about to be recorded, with the analytics metadata the client sent.
#[derive(Debug, Clone)]
pub struct NewLike {
    pub item_id: String,
    pub item_type: String,
    pub fingerprint: String,
    pub fingerprint_method: Option<String>,
    pub user_agent_hash: Option<String>,
    pub device_info: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Rolling rate limit applied to a toggle: at most `limit` likes by the
/// same fingerprint with `created_at` after `since`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    pub since: DateTime<Utc>,
    pub limit: i64,
}

#[async_trait]
pub trait LikeStore: Send + Sync {
    /// Remove the like if present, otherwise record it. Returns whether the
    /// item is loved afterwards. The window is checked in the same
    /// transaction as the write and fails with [`VoteError::RateLimited`].
    async fn toggle(&self, like: &NewLike, window: RateWindow) -> Result<bool, VoteError>;

    async fn item_votes(&self, item_id: &str, fingerprint: Option<&str>) -> Result<ItemVotes, VoteError>;

    /// Every item with at least one like, in a single grouped pass.
    async fn all_votes(&self, fingerprint: Option<&str>) -> Result<BTreeMap<String, ItemVotes>, VoteError>;
}

pub struct SqliteLikeStore {
    pool: SqlitePool,
    /// Serializes toggles in this process; the unique index covers other writers.
    toggle_lock: Mutex<()>,
}

impl SqliteLikeStore {
    /// Open (creating if missing) a database file such as `sqlite://votes.db`.
    pub async fn open(db_url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(db_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;
        let store = Self::from_pool(pool).await?;
        info!("[Vote] Likes database ready at {}", db_url);
        Ok(store)
    }

    /// Private in-memory database. Limited to one connection so every query
    /// sees the same database.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> anyhow::Result<Self> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS likes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                item_id TEXT NOT NULL,
                item_type TEXT NOT NULL,
                device_fingerprint TEXT NOT NULL,
                fingerprint_method TEXT,
                user_agent_hash TEXT,
                device_info TEXT,
                created_at INTEGER NOT NULL,
                UNIQUE (item_id, device_fingerprint)
            );",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_likes_fingerprint_created
             ON likes (device_fingerprint, created_at);",
        )
        .execute(&pool)
        .await?;

        Ok(Self {
            pool,
            toggle_lock: Mutex::new(()),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl LikeStore for SqliteLikeStore {
    async fn toggle(&self, like: &NewLike, window: RateWindow) -> Result<bool, VoteError> {
        let _guard = self.toggle_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let recent: i64 = sqlx::query(
            "SELECT COUNT(*) AS cnt FROM likes WHERE device_fingerprint = ? AND created_at > ?",
        )
        .bind(&like.fingerprint)
        .bind(window.since.timestamp_millis())
        .fetch_one(&mut *tx)
        .await?
        .get("cnt");
        if recent >= window.limit {
            tx.rollback().await?;
            info!(
                "[Vote] Rate limit hit: {} likes in window for fingerprint {}…",
                recent,
                like.fingerprint.chars().take(6).collect::<String>()
            );
            return Err(VoteError::RateLimited);
        }

        let removed = sqlx::query("DELETE FROM likes WHERE item_id = ? AND device_fingerprint = ?")
            .bind(&like.item_id)
            .bind(&like.fingerprint)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed == 0 {
            let device_info = like.device_info.as_ref().map(|v| v.to_string());
            sqlx::query(
                "INSERT INTO likes (item_id, item_type, device_fingerprint, fingerprint_method, user_agent_hash, device_info, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT (item_id, device_fingerprint) DO NOTHING",
            )
            .bind(&like.item_id)
            .bind(&like.item_type)
            .bind(&like.fingerprint)
            .bind(&like.fingerprint_method)
            .bind(&like.user_agent_hash)
            .bind(device_info)
            .bind(like.created_at.timestamp_millis())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(removed == 0)
    }

    async fn item_votes(&self, item_id: &str, fingerprint: Option<&str>) -> Result<ItemVotes, VoteError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS cnt, COALESCE(MAX(device_fingerprint = ?), 0) AS loved
             FROM likes WHERE item_id = ?",
        )
        .bind(fingerprint.unwrap_or(""))
        .bind(item_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(ItemVotes {
            count: row.get::<i64, _>("cnt"),
            loved: row.get::<i64, _>("loved") != 0,
        })
    }

    async fn all_votes(&self, fingerprint: Option<&str>) -> Result<BTreeMap<String, ItemVotes>, VoteError> {
        let rows = sqlx::query(
            "SELECT item_id, COUNT(*) AS cnt, COALESCE(MAX(device_fingerprint = ?), 0) AS loved
             FROM likes GROUP BY item_id",
        )
        .bind(fingerprint.unwrap_or(""))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    row.get::<String, _>("item_id"),
                    ItemVotes {
                        count: row.get::<i64, _>("cnt"),
                        loved: row.get::<i64, _>("loved") != 0,
                    },
                )
            })
            .collect())
    }
}
