//! Application wiring: settings to backend to manager

use anyhow::{anyhow, bail, Context, Result};
use backend::{
    ConsulConnector, KeyValueStore, MemoryStore, RetryPolicy, RetryingStore, SdkParameterClient, SsmStore,
};
use config::{BackendKind, Settings};
use manager::{FileYamlManager, PropertyManager, RemoteSyncManager};
use serde_json::Value as JsonValue;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Identifier logged by the connector on startup
const SERVER_ID: &str = "confsync";

/// Loaded manager plus whatever backend connection it needs
pub struct Application {
    settings: Settings,
    connector: Option<ConsulConnector>,
    kv: Option<Arc<dyn KeyValueStore>>,
    manager: Box<dyn PropertyManager>,
}

impl Application {
    /// Connect to the configured backend and load every namespace
    pub async fn new(settings: Settings) -> Result<Self> {
        info!(backend = %settings.backend.kind, "Initializing property manager");

        let retry = RetryPolicy::new(settings.retry.max_attempts);
        let mut connector = None;
        let kv: Option<Arc<dyn KeyValueStore>> = match settings.backend.kind {
            BackendKind::File => None,
            BackendKind::Memory => {
                let store: Arc<dyn KeyValueStore> = Arc::new(RetryingStore::new(MemoryStore::new(), retry));
                Some(store)
            }
            BackendKind::Consul => {
                let consul = ConsulConnector::new(settings.consul_endpoint(), settings.startup_policy(), retry);
                if !consul.start(SERVER_ID).await {
                    bail!("Unable to connect to Consul at {}", consul.url_path());
                }
                let store = consul
                    .store()
                    .await
                    .ok_or_else(|| anyhow!("Consul connection closed during startup"))?;
                connector = Some(consul);
                Some(store as Arc<dyn KeyValueStore>)
            }
            BackendKind::Ssm => {
                let endpoint = settings.ssm_endpoint();
                let client = SdkParameterClient::connect(&endpoint)
                    .await
                    .context("Unable to configure the SSM client")?;
                let store: Arc<dyn KeyValueStore> = Arc::new(RetryingStore::new(
                    SsmStore::new(endpoint.application_name, client),
                    retry,
                ));
                Some(store)
            }
        };

        let mut manager = build_manager(&settings, kv.clone(), &settings.backend.prefix, &settings.file.root);
        manager.load().await.context("Failed to load configuration")?;
        info!(namespaces = manager.config().len(), "Property manager ready");

        Ok(Self {
            settings,
            connector,
            kv,
            manager,
        })
    }

    pub fn manager(&self) -> &dyn PropertyManager {
        self.manager.as_ref()
    }

    /// Materialized namespace, global tree included
    pub fn show(&self, namespace: &str) -> Result<JsonValue> {
        if !self.manager.contains(namespace) {
            bail!("Unknown namespace: {}", namespace);
        }
        Ok(self.manager.properties_json(namespace))
    }

    /// Nearest `.../default` namespace, if any
    pub async fn default_for(&self, namespace: &str) -> Option<String> {
        let found = self.manager.scan_for_default_config(namespace).await;
        (!found.is_empty()).then_some(found)
    }

    /// One property, with global fallback
    pub fn get(&self, namespace: &str, key: &str) -> Result<String> {
        self.manager
            .properties(namespace)
            .get_property_opt(key)
            .ok_or_else(|| anyhow!("Property '{}' not found in namespace '{}'", key, namespace))
    }

    /// Copy every namespace to another prefix (or directory for the file
    /// backend). Keys already under the target are removed first.
    pub async fn copy_to(&self, target: &str) -> Result<usize> {
        let root = PathBuf::from(target);
        let mut destination = build_manager(&self.settings, self.kv.clone(), target, &root);
        if self.kv.is_some() {
            destination.load().await.context("Failed to load copy target")?;
        }

        destination
            .copy(self.manager.as_ref())
            .await
            .with_context(|| format!("Failed to copy configuration to {}", target))?;

        info!(target, namespaces = destination.config().len(), "Copy complete");
        Ok(destination.config().len())
    }

    pub async fn shutdown(&self) {
        if let Some(connector) = &self.connector {
            connector.stop().await;
        }
    }
}

fn build_manager(
    settings: &Settings,
    kv: Option<Arc<dyn KeyValueStore>>,
    prefix: &str,
    root: &std::path::Path,
) -> Box<dyn PropertyManager> {
    match (settings.backend.kind, kv) {
        (BackendKind::File, _) | (_, None) => Box::new(FileYamlManager::new(root)),
        (_, Some(kv)) => Box::new(RemoteSyncManager::new(prefix, kv)),
    }
}
