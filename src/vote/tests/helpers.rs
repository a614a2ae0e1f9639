use crate::vote::{vote_route, SqliteLikeStore, VoteConfig, VoteEndpoint, VoteRequest, VoteService};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use warp::hyper::body::Bytes;

pub const ORIGIN: &str = "http://localhost:5173";

static FINGERPRINT_SEQ: AtomicU64 = AtomicU64::new(1);

// ── Fingerprints ────────────────────────────────────────────

/// A fresh, valid fingerprint. Unique within the test binary.
pub fn fingerprint() -> String {
    format!("fp-test-{:08}", FINGERPRINT_SEQ.fetch_add(1, Ordering::Relaxed))
}

/// A fingerprint of exactly `len` characters.
pub fn fingerprint_of_len(len: usize) -> String {
    "f".repeat(len)
}

// ── Request builders ────────────────────────────────────────

pub fn vote_request(item_id: &str, fingerprint: &str) -> VoteRequest {
    VoteRequest {
        item_id: Some(item_id.to_string()),
        item_type: Some("anime".to_string()),
        fingerprint: Some(fingerprint.to_string()),
        fingerprint_method: Some("canvas".to_string()),
        user_agent_hash: Some("ua-hash".to_string()),
        device_info: Some(serde_json::json!({ "platform": "test" })),
    }
}

pub fn vote_body(item_id: &str, fingerprint: &str) -> String {
    serde_json::json!({
        "itemId": item_id,
        "itemType": "anime",
        "fingerprint": fingerprint,
    })
    .to_string()
}

// ── Service setup ───────────────────────────────────────────

pub async fn memory_service_with(config: VoteConfig) -> VoteService {
    let store = SqliteLikeStore::in_memory().await.expect("in-memory sqlite");
    VoteService::new(Arc::new(store), config)
}

pub async fn memory_service() -> VoteService {
    memory_service_with(VoteConfig::default()).await
}

/// Service backed by a database file in a temp dir.
pub async fn file_service() -> (VoteService, TempDir) {
    let tmp = TempDir::new().expect("failed to create temp dir");
    let url = format!("sqlite://{}", tmp.path().join("votes.db").display());
    let store = SqliteLikeStore::open(&url).await.expect("file sqlite");
    (VoteService::new(Arc::new(store), VoteConfig::default()), tmp)
}

pub async fn endpoint() -> Arc<VoteEndpoint> {
    Arc::new(VoteEndpoint::new(memory_service().await))
}

// ── warp::test helpers ──────────────────────────────────────

pub async fn post(endpoint: &Arc<VoteEndpoint>, body: impl AsRef<[u8]>) -> warp::http::Response<Bytes> {
    warp::test::request()
        .method("POST")
        .path("/vote")
        .header("origin", ORIGIN)
        .header("content-type", "application/json")
        .body(body)
        .reply(&vote_route(Arc::clone(endpoint)))
        .await
}

pub async fn get(endpoint: &Arc<VoteEndpoint>, path: &str) -> warp::http::Response<Bytes> {
    warp::test::request()
        .method("GET")
        .path(path)
        .header("origin", ORIGIN)
        .reply(&vote_route(Arc::clone(endpoint)))
        .await
}

pub fn json_body(resp: &warp::http::Response<Bytes>) -> serde_json::Value {
    serde_json::from_slice(resp.body()).expect("response body is JSON")
}
