//! Settings loader implementation

use crate::schema::Settings;
use crate::validation::SettingsValidator;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use std::path::Path;
use types::ConfigError;

/// Prefix for environment overrides, e.g. `CONFSYNC_CONSUL__URL`
pub const ENV_PREFIX: &str = "CONFSYNC_";

/// Settings loader that handles YAML files and environment variables
pub struct SettingsLoader;

impl SettingsLoader {
    /// Load settings from file and environment variables
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Settings> {
        let config_path = config_path.as_ref();

        if !config_path.exists() {
            return Err(ConfigError::FileNotFound {
                path: config_path.display().to_string(),
            }
            .into());
        }

        let settings: Settings = Figment::new()
            .merge(Yaml::file(config_path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to parse configuration")?;

        Self::validate(&settings)?;

        Ok(settings)
    }

    /// Defaults overridden by the environment only
    pub fn load_from_env() -> Result<Settings> {
        let settings: Settings = Figment::new()
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to parse configuration from environment")?;

        Self::validate(&settings)?;
        Ok(settings)
    }

    /// Load settings from string (for testing)
    pub fn load_from_str(yaml_content: &str) -> Result<Settings> {
        let settings: Settings = Figment::new()
            .merge(Yaml::string(yaml_content))
            .extract()
            .context("Failed to parse configuration from string")?;

        Self::validate(&settings)?;
        Ok(settings)
    }

    /// Reject settings with validation errors; warnings are logged
    fn validate(settings: &Settings) -> Result<()> {
        let report = SettingsValidator::validate(settings);

        for warning in &report.warnings {
            tracing::warn!(field = %warning.field, "{}", warning.message);
        }

        if let Some(issue) = report.errors.first() {
            return Err(ConfigError::ValidationError {
                field: issue.field.clone(),
                message: issue.message.clone(),
            }
            .into());
        }

        Ok(())
    }

    /// Get default settings
    pub fn default() -> Settings {
        Settings::default()
    }

    /// Create example configuration file
    pub fn create_example<P: AsRef<Path>>(path: P) -> Result<()> {
        let settings = Self::default();
        let yaml_content = serde_yaml::to_string(&settings)
            .context("Failed to serialize default configuration")?;

        std::fs::write(path.as_ref(), yaml_content)
            .context("Failed to write example configuration file")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::BackendKind;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_default_settings() {
        let settings = SettingsLoader::default();
        assert_eq!(settings.backend.kind, BackendKind::File);
        assert_eq!(settings.consul.url, "http://127.0.0.1:8500");
        assert_eq!(settings.cache.capacity, 1024);
    }

    #[test]
    fn test_load_from_string() {
        let yaml_content = r#"
backend:
  kind: consul
  prefix: "/apps/"
consul:
  url: "http://consul.internal:8500"
  token: "abc"
  startup_attempts: 2
retry:
  max_attempts: 5
"#;

        let settings = SettingsLoader::load_from_str(yaml_content).unwrap();
        assert_eq!(settings.backend.kind, BackendKind::Consul);
        assert_eq!(settings.backend.prefix, "/apps/");
        assert_eq!(settings.consul.token.as_deref(), Some("abc"));
        assert_eq!(settings.consul.startup_attempts, 2);
        assert_eq!(settings.consul.startup_backoff_ms, 1000);
        assert_eq!(settings.retry.max_attempts, 5);
    }

    #[test]
    fn test_validation_errors() {
        let yaml_content = r#"
consul:
  url: "consul.internal:8500"
backend:
  kind: consul
"#;
        assert!(SettingsLoader::load_from_str(yaml_content).is_err());

        let yaml_content = r#"
retry:
  max_attempts: 0
"#;
        assert!(SettingsLoader::load_from_str(yaml_content).is_err());

        let yaml_content = r#"
backend:
  kind: etcd
"#;
        assert!(SettingsLoader::load_from_str(yaml_content).is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = SettingsLoader::load("/definitely/not/here.yaml");
        assert!(result.is_err());
    }

    #[test]
    fn test_create_example_round_trips() {
        let temp_file = NamedTempFile::new().unwrap();
        SettingsLoader::create_example(temp_file.path()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("backend:"));
        assert!(content.contains("consul:"));

        let settings = SettingsLoader::load(temp_file.path()).unwrap();
        assert_eq!(settings.backend.prefix, "/config");
    }
}
