//! Backend adapter traits

use async_trait::async_trait;
use std::sync::Arc;
use types::BackendResult;

/// The four operations a manager needs from a key/value backend
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// All keys that start with `prefix`
    async fn get_all_keys(&self, prefix: &str) -> BackendResult<Vec<String>>;

    /// Value stored under `key`; a missing key is an error
    async fn get_value(&self, key: &str) -> BackendResult<String>;

    /// Create or overwrite `key`
    async fn put_value(&self, key: &str, value: &str) -> BackendResult<()>;

    /// Remove `key`
    async fn delete_key(&self, key: &str) -> BackendResult<()>;

    /// Short adapter name used in logs
    fn name(&self) -> &str;
}

/// Adapters facing an unreliable transport recreate their client here
pub trait Reconnect: Send + Sync {
    fn reconnect(&self) -> BackendResult<()>;
}

#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    async fn get_all_keys(&self, prefix: &str) -> BackendResult<Vec<String>> {
        (**self).get_all_keys(prefix).await
    }

    async fn get_value(&self, key: &str) -> BackendResult<String> {
        (**self).get_value(key).await
    }

    async fn put_value(&self, key: &str, value: &str) -> BackendResult<()> {
        (**self).put_value(key, value).await
    }

    async fn delete_key(&self, key: &str) -> BackendResult<()> {
        (**self).delete_key(key).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
