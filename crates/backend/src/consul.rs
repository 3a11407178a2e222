//! Consul key/value adapter

use crate::cache::{CacheStats, ValueCache};
use crate::traits::{KeyValueStore, Reconnect};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use types::{BackendError, BackendResult, ConsulEndpoint};

const TOKEN_HEADER: &str = "x-consul-token";
const KV_PATH: &str = "/v1/kv/";
const LEADER_PATH: &str = "/v1/status/leader";

/// HTTP client for the Consul KV API
#[derive(Debug)]
pub struct ConsulStore {
    endpoint: ConsulEndpoint,
    client: RwLock<Client>,
    cache: ValueCache,
}

impl ConsulStore {
    pub fn new(endpoint: ConsulEndpoint) -> BackendResult<Self> {
        let parsed = reqwest::Url::parse(&endpoint.url).map_err(|e| {
            BackendError::Configuration(format!("invalid Consul URL '{}': {}", endpoint.url, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(BackendError::Configuration(format!(
                "unsupported scheme '{}' in Consul URL",
                parsed.scheme()
            )));
        }

        let client = build_client(&endpoint)?;
        let cache = ValueCache::new(endpoint.cache_capacity);
        tracing::debug!(url = %endpoint.url, cache_capacity = cache.capacity(), "Consul store created");

        Ok(Self {
            endpoint,
            client: RwLock::new(client),
            cache,
        })
    }

    /// Base URL without a trailing slash
    pub fn url_path(&self) -> &str {
        self.endpoint.url.trim_end_matches('/')
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Check that a Consul agent answers at the configured URL
    pub async fn ping(&self) -> BackendResult<()> {
        let url = format!("{}{}", self.url_path(), LEADER_PATH);
        let response = self.client().get(&url).send().await.map_err(|e| {
            if e.is_connect() {
                BackendError::ServerNotFound {
                    url: self.url_path().to_string(),
                }
            } else {
                map_send_error("ping", LEADER_PATH, e)
            }
        })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(status_error(LEADER_PATH, response.status()))
        }
    }

    fn client(&self) -> Client {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn kv_url(&self, key: &str) -> String {
        format!("{}{}{}", self.url_path(), KV_PATH, key)
    }

    async fn read_body(operation: &str, key: &str, response: Response) -> BackendResult<String> {
        response
            .text()
            .await
            .map_err(|e| BackendError::transport(operation, key, format!("error reading body: {}", e)))
    }
}

/// Normalise a key for the KV API: no leading slash, no empty segments
pub fn validate_key(key: &str) -> BackendResult<String> {
    let trimmed = key.trim();
    let mut normalized = trimmed.trim_start_matches('/').to_string();
    while normalized.contains("//") {
        normalized = normalized.replace("//", "/");
    }

    if normalized.is_empty() || normalized.chars().any(char::is_whitespace) {
        return Err(BackendError::InvalidKey {
            key: key.to_string(),
        });
    }
    Ok(normalized)
}

fn build_client(endpoint: &ConsulEndpoint) -> BackendResult<Client> {
    let mut headers = HeaderMap::new();
    if let Some(token) = endpoint.token.as_deref().filter(|t| !t.is_empty()) {
        let value = HeaderValue::from_str(token)
            .map_err(|e| BackendError::Configuration(format!("invalid Consul token: {}", e)))?;
        headers.insert(TOKEN_HEADER, value);
    }

    Client::builder()
        .timeout(Duration::from_secs(endpoint.timeout_seconds.max(1)))
        .user_agent(concat!("confsync/", env!("CARGO_PKG_VERSION")))
        .default_headers(headers)
        .build()
        .map_err(|e| BackendError::Configuration(format!("failed to create HTTP client: {}", e)))
}

fn map_send_error(operation: &str, key: &str, err: reqwest::Error) -> BackendError {
    if err.is_builder() {
        BackendError::Configuration(err.to_string())
    } else {
        BackendError::transport(operation, key, err.to_string())
    }
}

fn status_error(key: &str, status: StatusCode) -> BackendError {
    if status.is_server_error() {
        BackendError::transport("request", key, format!("server returned {}", status))
    } else {
        BackendError::Http {
            key: key.to_string(),
            status: status.as_u16(),
        }
    }
}

#[async_trait]
impl KeyValueStore for ConsulStore {
    async fn get_all_keys(&self, prefix: &str) -> BackendResult<Vec<String>> {
        let prefix = prefix.trim().trim_start_matches('/');
        let url = format!("{}?keys", self.kv_url(prefix));

        let response = self
            .client()
            .get(&url)
            .send()
            .await
            .map_err(|e| map_send_error("get_all_keys", prefix, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            status if status.is_success() => {
                let body = Self::read_body("get_all_keys", prefix, response).await?;
                serde_json::from_str(&body).map_err(|e| {
                    BackendError::transport("get_all_keys", prefix, format!("invalid key list: {}", e))
                })
            }
            status => Err(status_error(prefix, status)),
        }
    }

    async fn get_value(&self, key: &str) -> BackendResult<String> {
        let key = validate_key(key)?;
        if let Some(value) = self.cache.get(&key) {
            tracing::trace!(key = %key, "Consul cache hit");
            return Ok(value);
        }

        let url = format!("{}?raw", self.kv_url(&key));
        let response = self
            .client()
            .get(&url)
            .send()
            .await
            .map_err(|e| map_send_error("get_value", &key, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(BackendError::NotFound { key }),
            status if status.is_success() => {
                let body = Self::read_body("get_value", &key, response).await?;
                self.cache.insert(&key, &body);
                Ok(body)
            }
            status => Err(status_error(&key, status)),
        }
    }

    async fn put_value(&self, key: &str, value: &str) -> BackendResult<()> {
        let key = validate_key(key)?;
        self.cache.invalidate(&key);

        let response = self
            .client()
            .put(self.kv_url(&key))
            .body(value.to_string())
            .send()
            .await
            .map_err(|e| map_send_error("put_value", &key, e))?;

        if !response.status().is_success() {
            return Err(status_error(&key, response.status()));
        }

        // Consul answers `false` when a write was rejected
        let body = Self::read_body("put_value", &key, response).await?;
        if body.trim() == "false" {
            return Err(BackendError::transport("put_value", &key, "write rejected by server"));
        }

        tracing::debug!(key = %key, bytes = value.len(), "Stored value in Consul");
        Ok(())
    }

    async fn delete_key(&self, key: &str) -> BackendResult<()> {
        let key = validate_key(key)?;
        self.cache.invalidate(&key);

        let response = self
            .client()
            .delete(self.kv_url(&key))
            .send()
            .await
            .map_err(|e| map_send_error("delete_key", &key, e))?;

        if response.status().is_success() || response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(key = %key, "Deleted key from Consul");
            Ok(())
        } else {
            Err(status_error(&key, response.status()))
        }
    }

    fn name(&self) -> &str {
        "consul"
    }
}

impl Reconnect for ConsulStore {
    fn reconnect(&self) -> BackendResult<()> {
        let client = build_client(&self.endpoint)?;
        *self.client.write().unwrap_or_else(PoisonError::into_inner) = client;
        self.cache.clear();
        tracing::info!(url = %self.url_path(), "Recreated Consul client");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::{RetryPolicy, RetryingStore};
    use wiremock::{
        matchers::{body_string, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn endpoint(url: &str) -> ConsulEndpoint {
        ConsulEndpoint {
            url: url.to_string(),
            token: Some("secret-token".to_string()),
            timeout_seconds: 5,
            cache_capacity: 16,
        }
    }

    #[test]
    fn test_validate_key() {
        assert_eq!(validate_key("/cfg/app").unwrap(), "cfg/app");
        assert_eq!(validate_key("cfg//app").unwrap(), "cfg/app");
        assert!(validate_key("/").is_err());
        assert!(validate_key("").is_err());
        assert!(validate_key("cfg/my app").is_err());
    }

    #[test]
    fn test_invalid_url_is_configuration_error() {
        let result = ConsulStore::new(endpoint("not a url"));
        assert!(matches!(result, Err(BackendError::Configuration(_))));

        let result = ConsulStore::new(endpoint("ftp://localhost:8500"));
        assert!(matches!(result, Err(BackendError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_get_value_uses_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/kv/cfg/app"))
            .and(header("x-consul-token", "secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("app:\n  key: value\n"))
            .expect(1)
            .mount(&server)
            .await;

        let store = ConsulStore::new(endpoint(&server.uri())).unwrap();

        let first = store.get_value("/cfg/app").await.unwrap();
        let second = store.get_value("cfg/app").await.unwrap();

        assert_eq!(first, "app:\n  key: value\n");
        assert_eq!(first, second);
        assert_eq!(store.cache_stats(), CacheStats { hits: 1, misses: 1 });
    }

    #[tokio::test]
    async fn test_missing_key_and_empty_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/kv/cfg/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/kv/empty/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = ConsulStore::new(endpoint(&server.uri())).unwrap();

        assert!(matches!(
            store.get_value("/cfg/missing").await,
            Err(BackendError::NotFound { .. })
        ));
        assert!(store.get_all_keys("/empty/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_keys() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/kv/cfg/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!(["cfg/a", "cfg/b"])),
            )
            .mount(&server)
            .await;

        let store = ConsulStore::new(endpoint(&server.uri())).unwrap();
        let keys = store.get_all_keys("/cfg/").await.unwrap();

        assert_eq!(keys, vec!["cfg/a", "cfg/b"]);
    }

    #[tokio::test]
    async fn test_put_invalidates_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/kv/cfg/app"))
            .respond_with(ResponseTemplate::new(200).set_body_string("old"))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/v1/kv/cfg/app"))
            .and(body_string("new"))
            .respond_with(ResponseTemplate::new(200).set_body_string("true"))
            .expect(1)
            .mount(&server)
            .await;

        let store = ConsulStore::new(endpoint(&server.uri())).unwrap();

        store.get_value("/cfg/app").await.unwrap();
        store.put_value("/cfg/app", "new").await.unwrap();
        store.get_value("/cfg/app").await.unwrap();
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/kv/cfg/app"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let store = RetryingStore::new(
            ConsulStore::new(endpoint(&server.uri())).unwrap(),
            RetryPolicy::default(),
        );

        let result = store.delete_key("/cfg/app").await;
        assert_eq!(
            result,
            Err(BackendError::Http {
                key: "cfg/app".to_string(),
                status: 403
            })
        );
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/kv/cfg/app"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/kv/cfg/app"))
            .respond_with(ResponseTemplate::new(200).set_body_string("recovered"))
            .mount(&server)
            .await;

        let store = RetryingStore::new(
            ConsulStore::new(endpoint(&server.uri())).unwrap(),
            RetryPolicy::default(),
        );

        assert_eq!(store.get_value("/cfg/app").await.unwrap(), "recovered");
    }

    #[tokio::test]
    async fn test_ping_reports_missing_server() {
        // Nothing listens on the discard port
        let store = ConsulStore::new(endpoint("http://127.0.0.1:9")).unwrap();
        assert!(matches!(
            store.ping().await,
            Err(BackendError::ServerNotFound { .. })
        ));
    }
}
