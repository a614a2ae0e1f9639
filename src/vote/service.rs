use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::config::VoteConfig;
use super::error::VoteError;
use super::store::{ItemVotes, LikeStore, NewLike, RateWindow};

/// Body of `POST /vote`. Everything is optional on the wire so missing fields
/// come back as 400s instead of deserialization failures.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub item_id: Option<String>,
    pub item_type: Option<String>,
    pub fingerprint: Option<String>,
    pub fingerprint_method: Option<String>,
    pub user_agent_hash: Option<String>,
    pub device_info: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToggleOutcome {
    pub loved: bool,
}

/// Transport-independent vote logic: validation, rate limiting, toggling.
pub struct VoteService {
    store: Arc<dyn LikeStore>,
    config: VoteConfig,
}

fn required(value: Option<String>, field: &'static str) -> Result<String, VoteError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(VoteError::MissingField(field)),
    }
}

impl VoteService {
    pub fn new(store: Arc<dyn LikeStore>, config: VoteConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &VoteConfig {
        &self.config
    }

    /// Length sanity check only; fingerprints are not verified.
    pub fn validate_fingerprint(&self, fingerprint: &str) -> Result<(), VoteError> {
        let len = fingerprint.chars().count();
        if len < self.config.fingerprint_min_len || len > self.config.fingerprint_max_len {
            return Err(VoteError::InvalidFingerprint);
        }
        Ok(())
    }

    pub async fn item_votes(&self, item_id: &str, fingerprint: Option<&str>) -> Result<ItemVotes, VoteError> {
        self.store.item_votes(item_id, fingerprint).await
    }

    pub async fn all_votes(&self, fingerprint: Option<&str>) -> Result<BTreeMap<String, ItemVotes>, VoteError> {
        let votes = self.store.all_votes(fingerprint).await?;
        debug!("[Vote] Aggregated counts for {} items", votes.len());
        Ok(votes)
    }

    pub async fn toggle(&self, request: VoteRequest) -> Result<ToggleOutcome, VoteError> {
        self.toggle_at(request, Utc::now()).await
    }

    /// Toggle as of `now`. Rejects once the fingerprint already holds
    /// `rate_limit_per_window` likes newer than the window start; the store
    /// counts and writes under one lock so concurrent requests cannot overshoot.
    pub async fn toggle_at(&self, request: VoteRequest, now: DateTime<Utc>) -> Result<ToggleOutcome, VoteError> {
        let fingerprint = request.fingerprint.ok_or(VoteError::InvalidFingerprint)?;
        self.validate_fingerprint(&fingerprint)?;
        let item_id = required(request.item_id, "itemId")?;
        let item_type = required(request.item_type, "itemType")?;

        let window = RateWindow {
            since: now - Duration::seconds(self.config.rate_window_secs),
            limit: self.config.rate_limit_per_window,
        };
        let like = NewLike {
            item_id,
            item_type,
            fingerprint,
            fingerprint_method: request.fingerprint_method,
            user_agent_hash: request.user_agent_hash,
            device_info: request.device_info,
            created_at: now,
        };
        let loved = self.store.toggle(&like, window).await?;
        debug!("[Vote] {} {} -> loved={}", like.item_type, like.item_id, loved);
        Ok(ToggleOutcome { loved })
    }
}
