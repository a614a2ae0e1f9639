use super::helpers::*;
use crate::vote::{SqliteLikeStore, VoteConfig, VoteEndpoint, VoteError, VoteService};
use std::sync::Arc;
use warp::http::StatusCode;

async fn closed_store_endpoint() -> Arc<VoteEndpoint> {
    let store = SqliteLikeStore::in_memory().await.unwrap();
    store.pool().close().await;
    Arc::new(VoteEndpoint::new(VoteService::new(Arc::new(store), VoteConfig::default())))
}

#[tokio::test]
async fn test_database_failure_is_500_without_details() {
    let ep = closed_store_endpoint().await;

    let resp = post(&ep, vote_body("anime-1", &fingerprint())).await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(&resp), serde_json::json!({ "error": "Internal server error" }));
    assert_eq!(resp.headers()["access-control-allow-origin"], ORIGIN);
}

#[tokio::test]
async fn test_database_failure_on_read_is_500() {
    let ep = closed_store_endpoint().await;
    let resp = get(&ep, "/vote?itemId=anime-1").await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_validation_runs_before_database() {
    // Bad input is reported as such even when the database is gone.
    let ep = closed_store_endpoint().await;
    let resp = post(&ep, vote_body("anime-1", "short")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_open_fails_when_directory_is_missing() {
    let tmp = tempfile::TempDir::new().unwrap();
    let url = format!("sqlite://{}", tmp.path().join("missing").join("votes.db").display());
    assert!(SqliteLikeStore::open(&url).await.is_err());
}

#[tokio::test]
async fn test_reopened_file_keeps_likes() {
    let tmp = tempfile::TempDir::new().unwrap();
    let url = format!("sqlite://{}", tmp.path().join("votes.db").display());
    let fp = fingerprint();

    {
        let store = SqliteLikeStore::open(&url).await.unwrap();
        let service = VoteService::new(Arc::new(store), VoteConfig::default());
        service.toggle(vote_request("kept", &fp)).await.unwrap();
    }

    let store = SqliteLikeStore::open(&url).await.unwrap();
    let service = VoteService::new(Arc::new(store), VoteConfig::default());
    let votes = service.item_votes("kept", Some(&fp)).await.unwrap();
    assert_eq!(votes.count, 1);
    assert!(votes.loved);
}

#[tokio::test]
async fn test_error_status_mapping() {
    assert_eq!(VoteError::MissingField("itemId").status(), StatusCode::BAD_REQUEST);
    assert_eq!(VoteError::PayloadTooLarge.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(VoteError::MethodNotAllowed.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(
        VoteError::Database(sqlx::Error::PoolClosed).public_message(),
        "Internal server error"
    );
}
