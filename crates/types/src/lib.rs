//! Shared types for the confsync workspace
//!
//! This crate contains the error taxonomy and the namespace helpers used
//! across the property tree, backend and manager crates.

pub mod endpoint;
pub mod error;
pub mod namespace;
pub mod utils;

// Re-export commonly used types
pub use endpoint::{ConsulEndpoint, SsmEndpoint, StartupPolicy};
pub use error::{BackendError, BackendResult, CoercionError, ConfigError, ManagerError, Result};
pub use namespace::NamespacePath;
