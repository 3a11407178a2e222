//! Settings schema definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use types::{ConsulEndpoint, SsmEndpoint, StartupPolicy};

/// Main settings structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Which backend the managers talk to
    #[serde(default)]
    pub backend: BackendSettings,
    /// Consul connection settings
    #[serde(default)]
    pub consul: ConsulSettings,
    /// AWS Parameter Store settings
    #[serde(default)]
    pub ssm: SsmSettings,
    /// File backend settings
    #[serde(default)]
    pub file: FileSettings,
    /// Reconnect-and-retry settings
    #[serde(default)]
    pub retry: RetrySettings,
    /// Fetched-value cache settings
    #[serde(default)]
    pub cache: CacheSettings,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// AWS Systems Manager Parameter Store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SsmSettings {
    #[serde(default = "default_ssm_region")]
    pub region: String,
    /// Root path for every parameter, e.g. `myapp`
    #[serde(default)]
    pub application_name: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    /// Custom endpoint, for LocalStack and similar
    pub endpoint_url: Option<String>,
}

/// Backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    File,
    Consul,
    Ssm,
    Memory,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BackendKind::File => "file",
            BackendKind::Consul => "consul",
            BackendKind::Ssm => "ssm",
            BackendKind::Memory => "memory",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    #[serde(default)]
    pub kind: BackendKind,
    /// Key prefix every namespace is stored under
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

/// Consul connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsulSettings {
    /// Agent URL
    #[serde(default = "default_consul_url")]
    pub url: String,
    /// ACL token sent with every request
    pub token: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Connection attempts on startup
    #[serde(default = "default_startup_attempts")]
    pub startup_attempts: u32,
    /// Delay between startup attempts in milliseconds
    #[serde(default = "default_startup_backoff_ms")]
    pub startup_backoff_ms: u64,
    /// Keep waiting when the agent refuses connections
    #[serde(default)]
    pub force_wait: bool,
}

/// File backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSettings {
    /// Directory holding one YAML document per namespace
    #[serde(default = "default_file_root")]
    pub root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts per backend operation
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Fetched-value cache capacity, 0 disables the cache
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Settings {
    /// Consul endpoint assembled from the consul and cache sections
    pub fn consul_endpoint(&self) -> ConsulEndpoint {
        ConsulEndpoint {
            url: self.consul.url.clone(),
            token: self.consul.token.clone().filter(|t| !t.is_empty()),
            timeout_seconds: self.consul.timeout_seconds,
            cache_capacity: self.cache.capacity,
        }
    }

    pub fn ssm_endpoint(&self) -> SsmEndpoint {
        let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());
        SsmEndpoint {
            region: self.ssm.region.clone(),
            application_name: self.ssm.application_name.clone(),
            access_key: non_empty(&self.ssm.access_key),
            secret_key: non_empty(&self.ssm.secret_key),
            endpoint_url: non_empty(&self.ssm.endpoint_url),
        }
    }

    pub fn startup_policy(&self) -> StartupPolicy {
        StartupPolicy {
            attempts: self.consul.startup_attempts,
            backoff_ms: self.consul.startup_backoff_ms,
            force_wait: self.consul.force_wait,
        }
    }
}

// Default value functions
fn default_prefix() -> String {
    "/config".to_string()
}

fn default_consul_url() -> String {
    "http://127.0.0.1:8500".to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

fn default_startup_attempts() -> u32 {
    StartupPolicy::default().attempts
}

fn default_startup_backoff_ms() -> u64 {
    StartupPolicy::default().backoff_ms
}

fn default_ssm_region() -> String {
    "us-east-1".to_string()
}

fn default_file_root() -> PathBuf {
    PathBuf::from("./config")
}

fn default_max_attempts() -> u32 {
    3
}

fn default_cache_capacity() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            prefix: default_prefix(),
        }
    }
}

impl Default for ConsulSettings {
    fn default() -> Self {
        Self {
            url: default_consul_url(),
            token: None,
            timeout_seconds: default_timeout_seconds(),
            startup_attempts: default_startup_attempts(),
            startup_backoff_ms: default_startup_backoff_ms(),
            force_wait: false,
        }
    }
}

impl Default for SsmSettings {
    fn default() -> Self {
        Self {
            region: default_ssm_region(),
            application_name: String::new(),
            access_key: None,
            secret_key: None,
            endpoint_url: None,
        }
    }
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            root: default_file_root(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.backend.kind, BackendKind::File);
        assert_eq!(settings.backend.prefix, "/config");
        assert_eq!(settings.retry.max_attempts, 3);
        assert_eq!(settings.logging.format, "pretty");
    }

    #[test]
    fn test_consul_endpoint_conversion() {
        let mut settings = Settings::default();
        settings.consul.token = Some(String::new());
        settings.cache.capacity = 0;

        let endpoint = settings.consul_endpoint();
        assert_eq!(endpoint.url, "http://127.0.0.1:8500");
        assert_eq!(endpoint.token, None);
        assert_eq!(endpoint.cache_capacity, 0);

        let startup = settings.startup_policy();
        assert_eq!(startup, StartupPolicy::default());
    }

    #[test]
    fn test_ssm_endpoint_conversion() {
        let mut settings = Settings::default();
        settings.ssm.application_name = "maps".to_string();
        settings.ssm.access_key = Some("AKIAEXAMPLE".to_string());
        settings.ssm.secret_key = Some(String::new());

        let endpoint = settings.ssm_endpoint();
        assert_eq!(endpoint.region, "us-east-1");
        assert_eq!(endpoint.application_name, "maps");
        assert_eq!(endpoint.access_key.as_deref(), Some("AKIAEXAMPLE"));
        assert_eq!(endpoint.secret_key, None);
        assert_eq!(endpoint.endpoint_url, None);
    }
}
