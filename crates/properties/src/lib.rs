//! Layered, type-coercing property trees
//!
//! This crate holds the configuration data model: the [`Value`] variant,
//! the [`PropertyTree`] with its shared global fallback, and the coercion
//! grammar used by the typed getters.

pub mod coercion;
pub mod translate;
pub mod tree;
pub mod value;

pub use translate::{IdentityTranslator, PathTranslator, TokenTranslator};
pub use tree::{PropertyTree, SharedTree, GLOBAL_KEY};
pub use value::{Scalar, Value};
