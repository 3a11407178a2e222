//! Connection lifecycle for the shared Consul store

use crate::consul::ConsulStore;
use crate::retry::{RetryPolicy, RetryingStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use types::{BackendError, BackendResult, ConsulEndpoint, StartupPolicy};

/// Shared handle handed to managers once a connection is up
pub type SharedConsulStore = Arc<RetryingStore<ConsulStore>>;

/// Owns at most one live Consul connection. `start` and `stop` are
/// serialized, so concurrent callers observe a single connection.
#[derive(Debug)]
pub struct ConsulConnector {
    endpoint: ConsulEndpoint,
    startup: StartupPolicy,
    retry: RetryPolicy,
    store: Mutex<Option<SharedConsulStore>>,
}

impl ConsulConnector {
    pub fn new(endpoint: ConsulEndpoint, startup: StartupPolicy, retry: RetryPolicy) -> Self {
        Self {
            endpoint,
            startup,
            retry,
            store: Mutex::new(None),
        }
    }

    /// Connect, retrying per the startup policy. Returns whether a
    /// connection is available afterwards.
    pub async fn start(&self, server_id: &str) -> bool {
        let mut guard = self.store.lock().await;
        if guard.is_some() {
            tracing::debug!(server_id, "Consul connection already started");
            return true;
        }

        match self.connect(server_id).await {
            Ok(store) => {
                *guard = Some(Arc::new(RetryingStore::new(store, self.retry)));
                true
            }
            Err(e) => {
                tracing::error!(server_id, url = %self.endpoint.url, error = %e, "Unable to connect to Consul");
                false
            }
        }
    }

    /// Drop the connection. Handles already given out keep working until
    /// their holders release them.
    pub async fn stop(&self) {
        if self.store.lock().await.take().is_some() {
            tracing::info!(url = %self.endpoint.url, "Consul connection stopped");
        }
    }

    /// The live store, if `start` succeeded
    pub async fn store(&self) -> Option<SharedConsulStore> {
        self.store.lock().await.clone()
    }

    pub async fn is_started(&self) -> bool {
        self.store.lock().await.is_some()
    }

    pub fn url_path(&self) -> &str {
        self.endpoint.url.trim_end_matches('/')
    }

    async fn connect(&self, server_id: &str) -> BackendResult<ConsulStore> {
        let store = ConsulStore::new(self.endpoint.clone())?;
        let attempts = self.startup.attempts.max(1);

        let mut last_error = None;
        for attempt in 1..=attempts {
            match store.ping().await {
                Ok(()) => {
                    tracing::info!(
                        server_id,
                        url = %store.url_path(),
                        token = ?self.endpoint.masked_token(),
                        attempt,
                        "Connected to Consul"
                    );
                    return Ok(store);
                }
                Err(e @ BackendError::Configuration(_)) => return Err(e),
                Err(e) if e.is_server_not_found() && !self.startup.force_wait => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        server_id,
                        attempt,
                        max_attempts = attempts,
                        error = %e,
                        "Consul not ready, waiting"
                    );
                    last_error = Some(e);
                }
            }
            if attempt < attempts {
                tokio::time::sleep(Duration::from_millis(self.startup.backoff_ms)).await;
            }
        }

        Err(last_error.unwrap_or_else(|| BackendError::ServerNotFound {
            url: store.url_path().to_string(),
        }))
    }
}
