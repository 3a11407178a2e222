//! Error types for the confsync workspace

use thiserror::Error;

/// Main error type for property manager operations
#[derive(Error, Debug)]
pub enum ManagerError {
    /// Backend communication errors
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// A stored document could not be parsed
    #[error("Parse error in namespace {namespace}: {message}")]
    Parse { namespace: String, message: String },

    /// A stored document parsed but does not have the expected shape
    #[error("Invalid document for namespace {namespace}: {message}")]
    InvalidDocument { namespace: String, message: String },

    /// A tree could not be serialized
    #[error("Serialization error for namespace {namespace}: {message}")]
    Serialize { namespace: String, message: String },

    /// Namespace is not loaded
    #[error("Namespace not found: {namespace}")]
    NotFound { namespace: String },

    /// Local filesystem errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for manager operations
pub type Result<T> = std::result::Result<T, ManagerError>;

/// Key/value backend errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Transient transport failure; the connection may be recreated and the
    /// operation retried
    #[error("Transport error during {operation} on {key}: {message}")]
    Transport {
        operation: String,
        key: String,
        message: String,
    },

    /// The key does not exist
    #[error("Key not found: {key}")]
    NotFound { key: String },

    /// Non-retryable HTTP status from the backend
    #[error("HTTP error {status} for key {key}")]
    Http { key: String, status: u16 },

    /// Key rejected before reaching the backend
    #[error("Invalid key: {key}")]
    InvalidKey { key: String },

    /// The backend server refused the connection
    #[error("Server not found: {url}")]
    ServerNotFound { url: String },

    /// The adapter is misconfigured
    #[error("Backend configuration error: {0}")]
    Configuration(String),

    /// Local IO failures inside an adapter
    #[error("Backend IO error: {0}")]
    Io(String),
}

/// Result type alias for backend operations
pub type BackendResult<T> = std::result::Result<T, BackendError>;

impl BackendError {
    /// Create a transport error
    pub fn transport(operation: &str, key: &str, message: impl Into<String>) -> Self {
        BackendError::Transport {
            operation: operation.to_string(),
            key: key.to_string(),
            message: message.into(),
        }
    }

    /// Whether the failure is transient and worth a reconnect-and-retry
    pub fn is_recoverable(&self) -> bool {
        matches!(self, BackendError::Transport { .. })
    }

    /// Whether the failure means there is no server to talk to at all
    pub fn is_server_not_found(&self) -> bool {
        matches!(self, BackendError::ServerNotFound { .. })
    }
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::Io(err.to_string())
    }
}

/// Scalar coercion errors, recovered by the typed getters
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoercionError {
    /// Value type cannot be read as a number
    #[error("Unknown number format detected [{value}]")]
    UnknownFormat { value: String },

    /// String looked numeric but did not parse
    #[error("Invalid number [{value}]: {reason}")]
    InvalidNumber { value: String, reason: String },

    /// Result does not fit the target type
    #[error("Number out of range [{value}]")]
    Overflow { value: String },
}

/// Settings specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// Validation error
    #[error("Configuration validation error: {field}: {message}")]
    ValidationError { field: String, message: String },
}
