//! Backend endpoint descriptions shared by the settings and backend crates

use crate::utils::sanitize_for_logging;
use serde::{Deserialize, Serialize};

/// Where and how to reach a Consul key/value service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsulEndpoint {
    /// Base URL, e.g. `http://127.0.0.1:8500`
    pub url: String,
    /// Value sent as `X-Consul-Token`
    pub token: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
    /// Fetched-value cache capacity, 0 disables the cache
    pub cache_capacity: usize,
}

impl ConsulEndpoint {
    /// Token shortened for log output
    pub fn masked_token(&self) -> Option<String> {
        self.token.as_deref().map(sanitize_for_logging)
    }
}

/// Where and how to reach AWS Systems Manager Parameter Store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsmEndpoint {
    pub region: String,
    /// Root path every parameter lives under
    pub application_name: String,
    /// Static credentials; the default AWS chain is used when both are unset
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    /// Override for local stacks such as LocalStack
    pub endpoint_url: Option<String>,
}

impl SsmEndpoint {
    pub fn masked_access_key(&self) -> Option<String> {
        self.access_key.as_deref().map(sanitize_for_logging)
    }
}

/// Bounded retry loop used when establishing the first connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupPolicy {
    /// Total connection attempts
    pub attempts: u32,
    /// Fixed delay between attempts in milliseconds
    pub backoff_ms: u64,
    /// Keep retrying even when the server refuses connections
    pub force_wait: bool,
}

impl Default for StartupPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            backoff_ms: 1000,
            force_wait: false,
        }
    }
}
