use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{BackendConfig, ThemeChange, ThemeError, ThemeStore, CHANGE_CHANNEL_CAPACITY};
use crate::theme::record::ThemeRecord;
use crate::utils::http::{request_with_retry, RetryPolicy};

/// `themes` table behind a PostgREST-style HTTP API (`/rest/v1/<table>`).
pub struct RestThemeStore {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    retry: RetryPolicy,
    changes: broadcast::Sender<ThemeChange>,
}

impl RestThemeStore {
    pub fn new(config: &BackendConfig) -> Result<Self, ThemeError> {
        let url = config
            .url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ThemeError::Config("backend url is not set".to_string()))?;
        let api_key = config
            .resolve_api_key()
            .ok_or_else(|| ThemeError::Config("backend api key is not set".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self::with_client(client, url, &config.table, api_key))
    }

    pub fn with_client(client: reqwest::Client, url: &str, table: &str, api_key: String) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            client,
            endpoint: format!("{}/rest/v1/{}", url.trim_end_matches('/'), table),
            api_key,
            retry: RetryPolicy::default(),
            changes,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn request(&self, method: Method) -> RequestBuilder {
        self.client
            .request(method, &self.endpoint)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn row(&self, method: Method, id: &str) -> RequestBuilder {
        self.request(method).query(&[("id", format!("eq.{}", id))])
    }

    fn notify(&self, change: ThemeChange) {
        let _ = self.changes.send(change);
    }

    /// Poll the table and broadcast [`ThemeChange::Reloaded`] whenever its
    /// contents differ from the previous poll. Stands in for a realtime
    /// channel. The task ends once the store is dropped.
    pub fn spawn_change_poller(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut last_signature: Option<u64> = None;
            loop {
                let Some(store) = weak.upgrade() else {
                    debug!("[Theme] Store dropped, change poller exiting");
                    break;
                };
                match store.fetch_all().await {
                    Ok(rows) => {
                        let signature = table_signature(&rows);
                        if last_signature.is_some_and(|prev| prev != signature) {
                            info!("[Theme] Detected change on theme table");
                            store.notify(ThemeChange::Reloaded);
                        }
                        last_signature = Some(signature);
                    }
                    Err(e) => debug!("[Theme] Change poll failed: {}", e),
                }
                drop(store);
                tokio::time::sleep(interval).await;
            }
        })
    }
}

fn table_signature(rows: &[ThemeRecord]) -> u64 {
    let mut hasher = DefaultHasher::new();
    serde_json::to_string(rows).unwrap_or_default().hash(&mut hasher);
    hasher.finish()
}

/// Turn non-2xx responses into [`ThemeError::Backend`].
async fn check(response: Response) -> Result<Response, ThemeError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!("[Theme] Backend error {}: {}", status, body);
    Err(ThemeError::Backend {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl ThemeStore for RestThemeStore {
    async fn fetch_all(&self) -> Result<Vec<ThemeRecord>, ThemeError> {
        let response = request_with_retry(
            || {
                self.request(Method::GET)
                    .query(&[("select", "*"), ("order", "name.asc")])
                    .send()
            },
            self.retry,
        )
        .await?;
        let bytes = check(response).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn set_active(&self, id: &str, active: bool) -> Result<(), ThemeError> {
        let response = self
            .row(Method::PATCH, id)
            .header("Prefer", "return=minimal")
            .json(&serde_json::json!({ "is_active": active }))
            .send()
            .await?;
        check(response).await?;
        self.notify(ThemeChange::Updated(id.to_string()));
        Ok(())
    }

    async fn insert(&self, mut theme: ThemeRecord) -> Result<ThemeRecord, ThemeError> {
        if theme.id.is_empty() {
            theme.id = uuid::Uuid::new_v4().to_string();
        }
        let response = self
            .request(Method::POST)
            .header("Prefer", "return=representation")
            .json(&theme)
            .send()
            .await?;
        let bytes = check(response).await?.bytes().await?;
        let mut rows: Vec<ThemeRecord> = serde_json::from_slice(&bytes)?;
        let stored = if rows.is_empty() { theme } else { rows.remove(0) };
        self.notify(ThemeChange::Inserted(stored.id.clone()));
        Ok(stored)
    }

    async fn update(&self, theme: &ThemeRecord) -> Result<(), ThemeError> {
        let response = self
            .row(Method::PATCH, &theme.id)
            .header("Prefer", "return=minimal")
            .json(theme)
            .send()
            .await?;
        check(response).await?;
        self.notify(ThemeChange::Updated(theme.id.clone()));
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), ThemeError> {
        let response = self.row(Method::DELETE, id).send().await?;
        check(response).await?;
        self.notify(ThemeChange::Deleted(id.to_string()));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ThemeChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::fallback::fallback_themes;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Build a client that bypasses system proxies for the local mock server.
    fn store_for(server: &MockServer) -> RestThemeStore {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        RestThemeStore::with_client(client, &server.uri(), "themes", "anon-key".to_string()).with_retry(
            RetryPolicy {
                max_retries: 1,
                initial_delay: Duration::from_millis(5),
                max_delay: Duration::from_millis(10),
            },
        )
    }

    #[tokio::test]
    async fn fetch_all_sends_key_and_parses_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/themes"))
            .and(header("apikey", "anon-key"))
            .and(header("authorization", "Bearer anon-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(fallback_themes()))
            .mount(&server)
            .await;

        let rows = store_for(&server).fetch_all().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].slug, "winter-holidays");
    }

    #[tokio::test]
    async fn fetch_all_surfaces_backend_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/themes"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let err = store_for(&server).fetch_all().await.unwrap_err();
        assert!(matches!(err, ThemeError::Backend { status: 401, .. }), "got {:?}", err);
    }

    #[tokio::test]
    async fn set_active_patches_single_row_and_notifies() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/themes"))
            .and(query_param("id", "eq.abc"))
            .and(body_json(serde_json::json!({ "is_active": true })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let store = store_for(&server);
        let mut rx = store.subscribe();
        store.set_active("abc", true).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), ThemeChange::Updated("abc".into()));
    }

    #[tokio::test]
    async fn insert_returns_representation() {
        let server = MockServer::start().await;
        let mut stored = fallback_themes().remove(0);
        stored.id = "server-id".to_string();
        Mock::given(method("POST"))
            .and(path("/rest/v1/themes"))
            .and(header("prefer", "return=representation"))
            .respond_with(ResponseTemplate::new(201).set_body_json(vec![stored.clone()]))
            .mount(&server)
            .await;

        let mut draft = fallback_themes().remove(0);
        draft.id = String::new();
        let row = store_for(&server).insert(draft).await.unwrap();
        assert_eq!(row.id, "server-id");
    }

    #[tokio::test]
    async fn poller_reports_table_changes() {
        let server = MockServer::start().await;
        let mut changed = fallback_themes();
        changed[0].is_active = true;

        Mock::given(method("GET"))
            .and(path("/rest/v1/themes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(fallback_themes()))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/themes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(changed))
            .mount(&server)
            .await;

        let store = Arc::new(store_for(&server));
        let mut rx = store.subscribe();
        let poller = store.spawn_change_poller(Duration::from_millis(20));

        let change = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("no change broadcast")
            .unwrap();
        assert_eq!(change, ThemeChange::Reloaded);
        poller.abort();
    }

    #[test]
    fn missing_url_or_key_is_a_config_error() {
        let config = BackendConfig::default();
        assert!(matches!(RestThemeStore::new(&config), Err(ThemeError::Config(_))));

        let config = BackendConfig {
            url: Some("https://backend.example".to_string()),
            api_key: None,
            api_key_env: Some("CATALOG_ENGINE_TEST_NO_SUCH_KEY".to_string()),
            ..BackendConfig::default()
        };
        assert!(matches!(RestThemeStore::new(&config), Err(ThemeError::Config(_))));
    }
}
