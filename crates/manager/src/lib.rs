//! Property managers
//!
//! A manager owns a [`ConfigStore`] of namespace trees and keeps it in sync
//! with a backend: YAML files on disk or any [`backend::KeyValueStore`].

pub mod file;
pub mod remote;
pub mod store;
pub mod traits;
pub mod yaml;

pub use file::FileYamlManager;
pub use remote::{RemoteSyncManager, SyncState};
pub use store::ConfigStore;
pub use traits::PropertyManager;
