use futures::{Stream, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, warn};
use warp::http::header::{HeaderMap, CONTENT_LENGTH, ORIGIN};
use warp::http::{Method, StatusCode};
use warp::hyper::body::Buf;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use super::cors::CorsPolicy;
use super::error::VoteError;
use super::service::{VoteRequest, VoteService};

/// Shared state for the `/vote` route.
pub struct VoteEndpoint {
    pub service: VoteService,
    pub cors: CorsPolicy,
}

impl VoteEndpoint {
    pub fn new(service: VoteService) -> Self {
        let cors = CorsPolicy::new(service.config().allowed_origins.clone());
        Self { service, cors }
    }
}

type QueryResult = Result<HashMap<String, String>, VoteError>;

/// `/vote` for every method. Nothing after the path match rejects, so every
/// answer (405, bad query, oversized body) goes through the CORS headers.
pub fn vote_route(
    endpoint: Arc<VoteEndpoint>,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    let query = warp::query::<HashMap<String, String>>()
        .map(|q| -> QueryResult { Ok(q) })
        .or(warp::any().map(|| -> QueryResult {
            Err(VoteError::MalformedPayload("invalid query string".to_string()))
        }))
        .unify();

    warp::path("vote")
        .and(warp::path::end())
        .and(warp::method())
        .and(warp::header::headers_cloned())
        .and(query)
        .and(warp::body::stream())
        .and(warp::any().map(move || Arc::clone(&endpoint)))
        .then(handle_vote)
}

async fn handle_vote<S, B>(
    method: Method,
    headers: HeaderMap,
    query: QueryResult,
    body: S,
    endpoint: Arc<VoteEndpoint>,
) -> Response
where
    S: Stream<Item = Result<B, warp::Error>> + Send,
    B: Buf + Send,
{
    let result = match method {
        Method::OPTIONS => Ok(warp::reply::with_status("ok", StatusCode::OK).into_response()),
        Method::GET => match query {
            Ok(query) => handle_get(&endpoint.service, &query).await,
            Err(e) => Err(e),
        },
        Method::POST => handle_post(&endpoint.service, &headers, body).await,
        _ => Err(VoteError::MethodNotAllowed),
    };

    let origin = headers.get(ORIGIN).and_then(|v| v.to_str().ok());
    let mut response = result.unwrap_or_else(error_response);
    endpoint.cors.apply(response.headers_mut(), origin);
    response
}

fn non_empty<'a>(query: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    query.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

async fn handle_get(service: &VoteService, query: &HashMap<String, String>) -> Result<Response, VoteError> {
    let fingerprint = non_empty(query, "fingerprint");
    match non_empty(query, "itemId") {
        Some(item_id) => {
            let votes = service.item_votes(item_id, fingerprint).await?;
            Ok(json(&votes, StatusCode::OK))
        }
        None => {
            let votes = service.all_votes(fingerprint).await?;
            Ok(json(&votes, StatusCode::OK))
        }
    }
}

async fn handle_post<S, B>(service: &VoteService, headers: &HeaderMap, body: S) -> Result<Response, VoteError>
where
    S: Stream<Item = Result<B, warp::Error>> + Send,
    B: Buf + Send,
{
    let limit = service.config().max_body_bytes;
    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(VoteError::PayloadTooLarge);
    }

    let body = read_capped(body, limit).await?;
    let request: VoteRequest =
        serde_json::from_slice(&body).map_err(|e| VoteError::MalformedPayload(e.to_string()))?;
    let outcome = service.toggle(request).await?;
    Ok(json(&outcome, StatusCode::OK))
}

/// Collect the body, giving up as soon as it grows past `limit` bytes.
pub(crate) async fn read_capped<S, B>(body: S, limit: usize) -> Result<Vec<u8>, VoteError>
where
    S: Stream<Item = Result<B, warp::Error>>,
    B: Buf,
{
    futures::pin_mut!(body);
    let mut bytes = Vec::new();
    while let Some(chunk) = body.next().await {
        let mut chunk = chunk.map_err(|e| VoteError::MalformedPayload(e.to_string()))?;
        if bytes.len() + chunk.remaining() > limit {
            return Err(VoteError::PayloadTooLarge);
        }
        while chunk.has_remaining() {
            let part = chunk.chunk();
            bytes.extend_from_slice(part);
            let read = part.len();
            chunk.advance(read);
        }
    }
    Ok(bytes)
}

fn json<T: Serialize>(body: &T, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(body), status).into_response()
}

fn error_response(err: VoteError) -> Response {
    let status = err.status();
    if status.is_server_error() {
        error!("[Vote] Request failed: {}", err);
    } else {
        warn!("[Vote] Rejected request ({}): {}", status.as_u16(), err);
    }
    json(&serde_json::json!({ "error": err.public_message() }), status)
}
