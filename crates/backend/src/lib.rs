//! Key/value backend adapters
//!
//! This crate defines the four-operation [`KeyValueStore`] contract the
//! managers consume, a reusable reconnect-and-retry policy, a bounded
//! fetched-value cache, and the Consul, Parameter Store and in-memory
//! adapters.

pub mod cache;
pub mod connector;
pub mod consul;
pub mod memory;
pub mod retry;
pub mod ssm;
pub mod traits;

pub use cache::*;
pub use connector::*;
pub use consul::*;
pub use memory::*;
pub use retry::*;
pub use ssm::*;
pub use traits::*;
