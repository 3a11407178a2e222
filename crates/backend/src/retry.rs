//! Reconnect-and-retry policy for unreliable backends

use crate::traits::{KeyValueStore, Reconnect};
use async_trait::async_trait;
use std::future::Future;
use tracing::warn;
use types::{BackendError, BackendResult};

/// Total attempts per operation, including the first one
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Bounded retry policy. A failed attempt whose error passes the
/// recoverability predicate triggers a reconnect before the next attempt;
/// the last error is returned once attempts run out.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    is_recoverable: fn(&BackendError) -> bool,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            is_recoverable: BackendError::is_recoverable,
        }
    }

    /// Override which errors are worth retrying
    pub fn with_predicate(mut self, is_recoverable: fn(&BackendError) -> bool) -> Self {
        self.is_recoverable = is_recoverable;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `op`, calling `reconnect` between recoverable failures
    pub async fn run<T, Op, Fut, R>(
        &self,
        operation: &str,
        key: &str,
        mut op: Op,
        mut reconnect: R,
    ) -> BackendResult<T>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = BackendResult<T>>,
        R: FnMut() -> BackendResult<()>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if (self.is_recoverable)(&err) && attempt < self.max_attempts => {
                    warn!(
                        operation,
                        key,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "Recoverable backend failure, reconnecting"
                    );
                    reconnect()?;
                    attempt += 1;
                }
                Err(err) => {
                    if attempt > 1 {
                        warn!(operation, key, attempts = attempt, error = %err, "Backend operation failed after retries");
                    }
                    return Err(err);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

/// Wraps an adapter so every operation runs under a [`RetryPolicy`]
#[derive(Debug)]
pub struct RetryingStore<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S> RetryingStore<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<S: KeyValueStore + Reconnect> KeyValueStore for RetryingStore<S> {
    async fn get_all_keys(&self, prefix: &str) -> BackendResult<Vec<String>> {
        self.policy
            .run(
                "get_all_keys",
                prefix,
                || self.inner.get_all_keys(prefix),
                || self.inner.reconnect(),
            )
            .await
    }

    async fn get_value(&self, key: &str) -> BackendResult<String> {
        self.policy
            .run("get_value", key, || self.inner.get_value(key), || self.inner.reconnect())
            .await
    }

    async fn put_value(&self, key: &str, value: &str) -> BackendResult<()> {
        self.policy
            .run(
                "put_value",
                key,
                || self.inner.put_value(key, value),
                || self.inner.reconnect(),
            )
            .await
    }

    async fn delete_key(&self, key: &str) -> BackendResult<()> {
        self.policy
            .run("delete_key", key, || self.inner.delete_key(key), || self.inner.reconnect())
            .await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
