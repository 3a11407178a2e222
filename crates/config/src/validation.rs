//! Settings validation utilities

use crate::schema::{BackendKind, Settings};

/// Settings validator
pub struct SettingsValidator;

impl SettingsValidator {
    /// Validate complete settings
    pub fn validate(settings: &Settings) -> ValidationReport {
        let mut report = ValidationReport::new();

        Self::validate_backend(settings, &mut report);
        Self::validate_consul(settings, &mut report);
        Self::validate_ssm(settings, &mut report);
        Self::validate_file(settings, &mut report);
        Self::validate_retry(settings, &mut report);
        Self::validate_logging(settings, &mut report);

        report
    }

    fn validate_backend(settings: &Settings, report: &mut ValidationReport) {
        let prefix = settings.backend.prefix.trim();
        if prefix.chars().any(char::is_whitespace) {
            report.add_error("backend.prefix", "Prefix cannot contain whitespace");
        }

        if settings.backend.kind != BackendKind::File && prefix.ends_with('/') {
            report.add_warning(
                "backend.prefix",
                &format!("Prefix '{}' ends with '/', rooted namespaces will produce '//' keys", prefix),
            );
        }

        if settings.backend.kind == BackendKind::Memory {
            report.add_warning("backend.kind", "Memory backend does not persist anything");
        }
    }

    fn validate_consul(settings: &Settings, report: &mut ValidationReport) {
        let consul = &settings.consul;
        let in_use = settings.backend.kind == BackendKind::Consul;

        if !consul.url.starts_with("http://") && !consul.url.starts_with("https://") {
            if in_use {
                report.add_error("consul.url", "Consul URL must start with http:// or https://");
            } else {
                report.add_warning("consul.url", "Consul URL is not an http(s) URL");
            }
        }

        if consul.timeout_seconds == 0 {
            report.add_error("consul.timeout_seconds", "Timeout cannot be zero");
        } else if consul.timeout_seconds > 300 {
            report.add_warning("consul.timeout_seconds", &format!("Timeout is very high ({}s)", consul.timeout_seconds));
        }

        if consul.startup_attempts == 0 {
            report.add_error("consul.startup_attempts", "At least one startup attempt is required");
        }

        if in_use && consul.force_wait && consul.startup_backoff_ms == 0 {
            report.add_warning("consul.startup_backoff_ms", "force_wait without a backoff retries in a tight loop");
        }

        if in_use && consul.token.is_none() {
            report.add_warning("consul.token", "No ACL token configured");
        }
    }

    fn validate_ssm(settings: &Settings, report: &mut ValidationReport) {
        if settings.backend.kind != BackendKind::Ssm {
            return;
        }

        let endpoint = settings.ssm_endpoint();
        if endpoint.region.trim().is_empty() {
            report.add_error("ssm.region", "Region is required for the ssm backend");
        }

        if endpoint.access_key.is_some() != endpoint.secret_key.is_some() {
            report.add_error("ssm.access_key", "Access key and secret key must be set together");
        } else if endpoint.access_key.is_none() {
            report.add_warning("ssm.access_key", "No static credentials, using the default AWS chain");
        }

        if endpoint.application_name.trim_matches('/').is_empty() {
            report.add_warning("ssm.application_name", "No application name, parameters are read from the root");
        }
    }

    fn validate_file(settings: &Settings, report: &mut ValidationReport) {
        if settings.backend.kind != BackendKind::File {
            return;
        }

        if settings.file.root.as_os_str().is_empty() {
            report.add_error("file.root", "File backend root cannot be empty");
        } else if !settings.file.root.exists() {
            report.add_warning("file.root", "File backend root does not exist yet");
        }
    }

    fn validate_retry(settings: &Settings, report: &mut ValidationReport) {
        if settings.retry.max_attempts == 0 {
            report.add_error("retry.max_attempts", "Max attempts cannot be 0");
        } else if settings.retry.max_attempts > 10 {
            report.add_warning("retry.max_attempts", &format!("Max attempts is very high ({})", settings.retry.max_attempts));
        }
    }

    fn validate_logging(settings: &Settings, report: &mut ValidationReport) {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&settings.logging.level.as_str()) {
            report.add_error("logging.level", &format!("Invalid log level: {}. Valid levels: {:?}", settings.logging.level, valid_levels));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&settings.logging.format.as_str()) {
            report.add_error("logging.format", &format!("Invalid log format: {}. Valid formats: {:?}", settings.logging.format, valid_formats));
        }
    }
}

/// Validation report containing errors and warnings
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

/// A validation issue (error or warning)
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        self.errors.push(ValidationIssue {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    pub fn summary(&self) -> String {
        format!("Validation: {} errors, {} warnings", self.errors.len(), self.warnings.len())
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}
