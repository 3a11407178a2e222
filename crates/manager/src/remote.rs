//! Manager synchronizing namespaces with a remote key/value backend

use crate::store::ConfigStore;
use crate::traits::PropertyManager;
use crate::yaml::{parse_document, to_document};
use async_trait::async_trait;
use backend::KeyValueStore;
use tracing::{debug, info, warn};
use types::namespace::{join_key, strip_server_prefix};
use types::{ManagerError, Result};

/// Where a [`RemoteSyncManager`] is in its load/sync cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Unloaded,
    Loading,
    Loaded,
    /// A copy or save is in flight, or failed part way through
    Syncing,
}

/// Keeps one YAML document per namespace under `prefix + name`.
///
/// `copy` deletes this manager's keys before writing the new ones; a
/// failure in between leaves the backend without those keys and the state
/// at [`SyncState::Syncing`].
pub struct RemoteSyncManager<B> {
    prefix: String,
    backend: B,
    store: ConfigStore,
    state: SyncState,
}

impl<B: KeyValueStore> RemoteSyncManager<B> {
    pub fn new(prefix: impl Into<String>, backend: B) -> Self {
        Self {
            prefix: prefix.into(),
            backend,
            store: ConfigStore::new(),
            state: SyncState::Unloaded,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Write every namespace's provenance text back to the backend
    pub async fn save(&mut self) -> Result<()> {
        info!(prefix = %self.prefix, namespaces = self.store.len(), "Saving all namespaces");
        self.state = SyncState::Syncing;

        for (name, tree) in self.store.iter() {
            let text = match tree.source() {
                Some(source) => source.to_string(),
                None => to_document(name, tree)?,
            };
            self.backend.put_value(&join_key(&self.prefix, name), &text).await?;
        }

        self.state = SyncState::Loaded;
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Vec<String> {
        match self.backend.get_all_keys(prefix).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(backend = self.backend.name(), prefix, error = %e, "Unable to list keys");
                Vec::new()
            }
        }
    }

    async fn process_key(&mut self, key: &str) {
        let value = match self.backend.get_value(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(backend = self.backend.name(), key, error = %e, "Key lookup failed");
                return;
            }
        };

        let name = strip_server_prefix(&self.prefix, key).to_string();
        debug!(namespace = %name, bytes = value.len(), "Key lookup succeeded");

        match parse_document(&name, &value) {
            Ok(tree) => {
                self.store.insert(name, tree);
            }
            Err(e) => warn!(namespace = %name, error = %e, "Skipping unparseable namespace"),
        }
    }
}

#[async_trait]
impl<B: KeyValueStore> PropertyManager for RemoteSyncManager<B> {
    fn config(&self) -> &ConfigStore {
        &self.store
    }

    fn config_mut(&mut self) -> &mut ConfigStore {
        &mut self.store
    }

    async fn load(&mut self) -> Result<()> {
        self.state = SyncState::Loading;
        let prefix = self.prefix.clone();
        let keys = self.list_keys(&prefix).await;

        for key in &keys {
            self.process_key(key).await;
        }

        info!(
            backend = self.backend.name(),
            prefix = %self.prefix,
            keys = keys.len(),
            namespaces = self.store.len(),
            "Loaded namespaces"
        );
        self.state = SyncState::Loaded;
        Ok(())
    }

    async fn store_all(&mut self, path: &str) -> Result<()> {
        for name in self.store.names() {
            self.store(path, &name).await?;
        }
        Ok(())
    }

    async fn store(&mut self, _path: &str, name: &str) -> Result<()> {
        let tree = self.store.get(name).ok_or_else(|| ManagerError::NotFound {
            namespace: name.to_string(),
        })?;
        let text = to_document(name, tree)?;

        info!(prefix = %self.prefix, namespace = name, "Storing namespace");
        self.backend.put_value(&join_key(&self.prefix, name), &text).await?;

        if let Some(tree) = self.store.get_mut(name) {
            tree.set_source(Some(text));
        }
        Ok(())
    }

    async fn copy(&mut self, other: &dyn PropertyManager) -> Result<()> {
        self.state = SyncState::Syncing;

        for name in self.store.names() {
            self.backend.delete_key(&join_key(&self.prefix, &name)).await?;
        }

        self.store.import_from(other.config());
        info!(
            prefix = %self.prefix,
            from = other.name(),
            namespaces = self.store.len(),
            "Copied namespaces"
        );
        self.save().await
    }

    async fn get_keys(&self, lookup: &str) -> Vec<String> {
        self.list_keys(&join_key(&self.prefix, lookup)).await
    }

    fn name(&self) -> &str {
        self.backend.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yaml::LOADED_KEY;
    use backend::{MemoryStore, Reconnect, RetryPolicy, RetryingStore};
    use properties::PropertyTree;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use types::{BackendError, BackendResult};

    const SERVER: &str = "server:\n  port: 8080\n  global:\n    region: eu\n";
    const CLIENT: &str = "client:\n  retries: 3\n";

    fn seeded() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::with_entries([
            ("/a/server", SERVER),
            ("/a/client", CLIENT),
            ("/b/old", "old:\n  stale: true\n"),
            ("/defaults/global/eur/default", "x: {}\n"),
            ("/defaults/global/default", "x: {}\n"),
            ("/defaults/default", "x: {}\n"),
        ]))
    }

    #[tokio::test]
    async fn test_load_strips_prefix_and_parses() {
        let mut manager = RemoteSyncManager::new("/a/", seeded());
        assert_eq!(manager.state(), SyncState::Unloaded);

        manager.load().await.unwrap();

        assert_eq!(manager.state(), SyncState::Loaded);
        assert!(manager.contains("server"));
        assert!(manager.contains("client"));
        let server = manager.properties("server");
        assert_eq!(server.get_int_property("port", 0), 8080);
        assert_eq!(server.get_property("region", ""), "eu");
        assert_eq!(server.source(), Some(SERVER));
    }

    #[tokio::test]
    async fn test_load_skips_bad_documents() {
        let backend = Arc::new(MemoryStore::with_entries([
            ("/a/good", "good:\n  k: v\n"),
            ("/a/bad", "- not\n- a mapping\n"),
        ]));
        let mut manager = RemoteSyncManager::new("/a/", backend);

        manager.load().await.unwrap();

        assert!(manager.contains("good"));
        assert!(!manager.contains("bad"));
    }

    #[tokio::test]
    async fn test_scan_for_default_config() {
        let manager = RemoteSyncManager::new("/defaults", seeded());

        assert_eq!(manager.scan_for_default_config("/global/eur/gb").await, "/global/eur/default");
        assert_eq!(manager.scan_for_default_config("/global/na/us").await, "/global/default");
        assert_eq!(manager.scan_for_default_config("/local/aus/syd").await, "/default");

        let empty = RemoteSyncManager::new("/nothing", seeded());
        assert_eq!(empty.scan_for_default_config("/global/eur/gb").await, "");
    }

    #[tokio::test]
    async fn test_store_writes_document_and_updates_source() {
        let backend = seeded();
        let mut manager = RemoteSyncManager::new("/a/", backend.clone());
        manager.load().await.unwrap();

        let mut tree = manager.properties("client");
        tree.insert("retries", 5i64);
        manager.update("", "client", tree).await.unwrap();

        let written = backend.get_value("/a/client").await.unwrap();
        let reparsed = parse_document("client", &written).unwrap();
        assert_eq!(reparsed.get_int_property("retries", 0), 5);
        assert_eq!(manager.properties("client").source(), Some(written.as_str()));

        assert!(matches!(
            manager.store("", "missing").await,
            Err(ManagerError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_copy_end_to_end() {
        let backend = seeded();
        let mut source = RemoteSyncManager::new("/a/", backend.clone());
        source.load().await.unwrap();

        let mut target = RemoteSyncManager::new("/b/", backend.clone());
        target.load().await.unwrap();
        assert!(target.contains("old"));

        target.copy(&source).await.unwrap();

        assert_eq!(target.state(), SyncState::Loaded);
        assert_eq!(target.config().names(), source.config().names());
        for name in source.config().names() {
            assert_eq!(target.properties_json(&name), source.properties_json(&name));
            assert_eq!(
                target.properties(&name).source(),
                source.properties(&name).source()
            );
        }

        let snapshot = backend.snapshot();
        assert!(!snapshot.contains_key("/b/old"));
        assert_eq!(snapshot.get("/b/server").map(String::as_str), Some(SERVER));
        assert_eq!(snapshot.get("/b/client").map(String::as_str), Some(CLIENT));

        let mut reloaded = RemoteSyncManager::new("/b/", backend);
        reloaded.load().await.unwrap();
        let server = reloaded.properties("server");
        assert_eq!(server.get_property("region", ""), "eu");
        assert!(server.get_long_property(LOADED_KEY, 0) > 0);
        assert_eq!(reloaded.to_yaml().unwrap(), source.to_yaml().unwrap());
    }

    #[tokio::test]
    async fn test_save_serializes_trees_without_source() {
        let backend = Arc::new(MemoryStore::new());
        let mut manager = RemoteSyncManager::new("/p/", backend.clone());

        let mut tree = PropertyTree::new();
        tree.insert("enabled", "enable");
        manager.config_mut().insert("feature", tree);
        manager.save().await.unwrap();

        let written = backend.get_value("/p/feature").await.unwrap();
        let reparsed = parse_document("feature", &written).unwrap();
        assert!(reparsed.get_boolean_property("enabled", false));
    }

    /// Fails the first `failures` reads with a transport error
    struct FlakyBackend {
        inner: MemoryStore,
        failures: AtomicU32,
    }

    #[async_trait]
    impl KeyValueStore for FlakyBackend {
        async fn get_all_keys(&self, prefix: &str) -> BackendResult<Vec<String>> {
            self.inner.get_all_keys(prefix).await
        }

        async fn get_value(&self, key: &str) -> BackendResult<String> {
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(BackendError::transport("get_value", key, "connection reset"));
            }
            self.inner.get_value(key).await
        }

        async fn put_value(&self, key: &str, value: &str) -> BackendResult<()> {
            self.inner.put_value(key, value).await
        }

        async fn delete_key(&self, key: &str) -> BackendResult<()> {
            self.inner.delete_key(key).await
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    impl Reconnect for FlakyBackend {
        fn reconnect(&self) -> BackendResult<()> {
            Ok(())
        }
    }

    fn flaky(failures: u32) -> RetryingStore<FlakyBackend> {
        RetryingStore::new(
            FlakyBackend {
                inner: MemoryStore::with_entries([("/a/server", SERVER)]),
                failures: AtomicU32::new(failures),
            },
            RetryPolicy::default(),
        )
    }

    /// Accepts reads and deletes but rejects every write
    struct RejectingWrites {
        inner: Arc<MemoryStore>,
    }

    #[async_trait]
    impl KeyValueStore for RejectingWrites {
        async fn get_all_keys(&self, prefix: &str) -> BackendResult<Vec<String>> {
            self.inner.get_all_keys(prefix).await
        }

        async fn get_value(&self, key: &str) -> BackendResult<String> {
            self.inner.get_value(key).await
        }

        async fn put_value(&self, key: &str, _value: &str) -> BackendResult<()> {
            Err(BackendError::Http {
                key: key.to_string(),
                status: 403,
            })
        }

        async fn delete_key(&self, key: &str) -> BackendResult<()> {
            self.inner.delete_key(key).await
        }

        fn name(&self) -> &str {
            "rejecting"
        }
    }

    #[tokio::test]
    async fn test_interrupted_copy_surfaces_error_and_stays_syncing() {
        let backend = seeded();
        let mut source = RemoteSyncManager::new("/a/", backend.clone());
        source.load().await.unwrap();

        let mut target = RemoteSyncManager::new(
            "/b/",
            RejectingWrites {
                inner: backend.clone(),
            },
        );
        target.load().await.unwrap();
        assert!(target.contains("old"));

        let result = target.copy(&source).await;

        assert!(matches!(
            result,
            Err(ManagerError::Backend(BackendError::Http { status: 403, .. }))
        ));
        assert_eq!(target.state(), SyncState::Syncing);

        let snapshot = backend.snapshot();
        assert!(!snapshot.contains_key("/b/old"));
        assert!(!snapshot.contains_key("/b/server"));
        assert!(!snapshot.contains_key("/b/client"));
        assert!(snapshot.contains_key("/a/server"));
    }

    #[tokio::test]
    async fn test_flaky_backend_recovers() {
        let mut manager = RemoteSyncManager::new("/a/", flaky(2));
        manager.load().await.unwrap();
        assert_eq!(manager.properties("server").get_int_property("port", 0), 8080);
    }

    #[tokio::test]
    async fn test_flaky_backend_exhausts_retries() {
        let backend = flaky(3);
        assert!(backend.get_value("/a/server").await.is_err());

        let mut manager = RemoteSyncManager::new("/a/", flaky(3));
        manager.load().await.unwrap();
        assert!(!manager.contains("server"));
    }
}
