//! Settings management for confsync
//!
//! This crate handles parsing, validation, and management of settings
//! from YAML files and environment variables.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::SettingsLoader;
pub use schema::*;
pub use validation::*;
