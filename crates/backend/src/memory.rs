//! In-memory key/value store

use crate::traits::{KeyValueStore, Reconnect};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use types::{BackendError, BackendResult};

/// Process-local store, used for dry runs and as a test double
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with initial entries
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: Mutex::new(entries),
        }
    }

    /// Copy of everything currently stored
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get_all_keys(&self, prefix: &str) -> BackendResult<Vec<String>> {
        Ok(self
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn get_value(&self, key: &str) -> BackendResult<String> {
        self.lock()
            .get(key)
            .cloned()
            .ok_or_else(|| BackendError::NotFound { key: key.to_string() })
    }

    async fn put_value(&self, key: &str, value: &str) -> BackendResult<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete_key(&self, key: &str) -> BackendResult<()> {
        self.lock().remove(key);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

impl Reconnect for MemoryStore {
    fn reconnect(&self) -> BackendResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prefix_listing_and_missing_key() {
        let store = MemoryStore::with_entries([("/cfg/a", "1"), ("/cfg/b", "2"), ("/other", "3")]);

        let keys = store.get_all_keys("/cfg/").await.unwrap();
        assert_eq!(keys, vec!["/cfg/a", "/cfg/b"]);

        assert_eq!(store.get_value("/cfg/a").await.unwrap(), "1");
        assert!(matches!(
            store.get_value("/cfg/zzz").await,
            Err(BackendError::NotFound { .. })
        ));
    }

    #[test]
    fn test_put_and_delete() {
        let store = MemoryStore::new();
        tokio_test::block_on(store.put_value("k", "v")).unwrap();
        assert_eq!(store.len(), 1);
        tokio_test::block_on(store.delete_key("k")).unwrap();
        assert!(store.is_empty());
    }
}
