//! Property manager trait

use crate::store::ConfigStore;
use crate::yaml::LOADED_KEY;
use async_trait::async_trait;
use properties::{PropertyTree, GLOBAL_KEY};
use serde_json::{Map as JsonMap, Value as JsonValue};
use types::{ManagerError, NamespacePath, Result};

/// Loads, stores and copies a [`ConfigStore`] against one backend
#[async_trait]
pub trait PropertyManager: Send + Sync {
    fn config(&self) -> &ConfigStore;

    fn config_mut(&mut self) -> &mut ConfigStore;

    /// Populate the store from the backend. Individual namespaces that fail
    /// to load are logged and skipped.
    async fn load(&mut self) -> Result<()>;

    /// Persist every loaded namespace
    async fn store_all(&mut self, path: &str) -> Result<()>;

    /// Persist namespace `name`
    async fn store(&mut self, path: &str, name: &str) -> Result<()>;

    /// Replace this manager's content with `other`'s, then persist it
    async fn copy(&mut self, other: &dyn PropertyManager) -> Result<()>;

    /// Known namespace keys under `lookup`. Backend failures yield an empty
    /// list.
    async fn get_keys(&self, lookup: &str) -> Vec<String>;

    /// Short backend name used in logs
    fn name(&self) -> &str;

    /// Insert or replace `name`, then persist it
    async fn update(&mut self, path: &str, name: &str, tree: PropertyTree) -> Result<()> {
        self.config_mut().insert(name, tree);
        self.store(path, name).await
    }

    /// Nearest existing `.../default` namespace above `namespace`, or an
    /// empty string when there is none
    async fn scan_for_default_config(&self, namespace: &str) -> String {
        for candidate in NamespacePath::from(namespace).default_candidates() {
            if !self.get_keys(&candidate).await.is_empty() {
                tracing::debug!(namespace, default = %candidate, "Found default namespace");
                return candidate;
            }
        }
        tracing::debug!(namespace, "No default namespace found");
        String::new()
    }

    fn contains(&self, name: &str) -> bool {
        self.config().contains(name)
    }

    /// Materialized tree for `name` plus its global tree, keyed by name.
    /// An unknown namespace maps to `null`.
    fn properties_json(&self, name: &str) -> JsonValue {
        let mut wrapper = JsonMap::new();
        let body = match self.config().get(name) {
            Some(tree) => {
                let mut map = tree.get_map();
                let global = tree.global().or_else(|| self.config().global());
                if let Some(global) = global {
                    map.insert(GLOBAL_KEY.to_string(), JsonValue::Object(global.read().get_map()));
                }
                JsonValue::Object(map)
            }
            None => JsonValue::Null,
        };
        wrapper.insert(name.to_string(), body);
        JsonValue::Object(wrapper)
    }

    /// Every namespace rendered as one YAML document, without load
    /// timestamps, so two managers holding the same content render equal
    fn to_yaml(&self) -> Result<String> {
        let mut document = JsonMap::new();
        for name in self.config().names() {
            if let JsonValue::Object(mut wrapper) = self.properties_json(&name) {
                if let Some(JsonValue::Object(mut body)) = wrapper.remove(&name) {
                    body.remove(LOADED_KEY);
                    document.insert(name, JsonValue::Object(body));
                }
            }
        }

        serde_yaml::to_string(&document).map_err(|e| ManagerError::Serialize {
            namespace: self.name().to_string(),
            message: e.to_string(),
        })
    }

    /// Copy of the tree for `name`, empty when unknown
    fn properties(&self, name: &str) -> PropertyTree {
        self.config().get(name).cloned().unwrap_or_default()
    }
}
