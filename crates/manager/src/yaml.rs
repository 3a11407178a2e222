//! YAML document codec for namespace trees
//!
//! A stored document looks like
//!
//! ```yaml
//! server:
//!   port: 8080
//!   global:
//!     region: eu
//! ```
//!
//! The reserved `global` key becomes the tree's shared fallback, and the
//! entry named after the namespace gets a `loaded` timestamp on every parse.

use properties::{PropertyTree, SharedTree, GLOBAL_KEY};
use serde_json::{Map as JsonMap, Value as JsonValue};
use types::utils::now_millis;
use types::{ManagerError, Result};

/// Key stamped with the parse time in epoch milliseconds
pub const LOADED_KEY: &str = "loaded";

/// Top-level section names of a document, in order. Anything that is not a
/// mapping has none.
pub fn section_names(text: &str) -> Vec<String> {
    match serde_yaml::from_str::<JsonValue>(text) {
        Ok(JsonValue::Object(document)) => document.keys().cloned().collect(),
        _ => Vec::new(),
    }
}

/// Parse a stored document into the tree for namespace `name`
pub fn parse_document(name: &str, text: &str) -> Result<PropertyTree> {
    let document: JsonValue = serde_yaml::from_str(text).map_err(|e| ManagerError::Parse {
        namespace: name.to_string(),
        message: e.to_string(),
    })?;

    let JsonValue::Object(mut document) = document else {
        return Err(ManagerError::InvalidDocument {
            namespace: name.to_string(),
            message: "top level is not a mapping".to_string(),
        });
    };

    if let Some(JsonValue::Object(root)) = document.get_mut(name) {
        root.insert(LOADED_KEY.to_string(), JsonValue::from(now_millis()));
    }

    let mut tree = PropertyTree::new();
    for (section, content) in document {
        let JsonValue::Object(mut entries) = content else {
            return Err(ManagerError::InvalidDocument {
                namespace: name.to_string(),
                message: format!("section '{}' is not a mapping", section),
            });
        };

        match entries.remove(GLOBAL_KEY) {
            Some(JsonValue::Object(global)) => {
                tree.set_global(Some(SharedTree::new(PropertyTree::from_map(global))));
            }
            Some(JsonValue::Null) | None => {}
            Some(_) => {
                return Err(ManagerError::InvalidDocument {
                    namespace: name.to_string(),
                    message: format!("'{}' in section '{}' is not a mapping", GLOBAL_KEY, section),
                });
            }
        }
        tree.put_all(entries);
    }

    tree.set_source(Some(text.to_string()));
    Ok(tree)
}

/// Serialize `tree` as the document for namespace `name`, global included
pub fn to_document(name: &str, tree: &PropertyTree) -> Result<String> {
    let mut root = tree.get_map();
    if let Some(global) = tree.global() {
        root.insert(GLOBAL_KEY.to_string(), JsonValue::Object(global.read().get_map()));
    }

    let mut document = JsonMap::new();
    document.insert(name.to_string(), JsonValue::Object(root));

    serde_yaml::to_string(&document).map_err(|e| ManagerError::Serialize {
        namespace: name.to_string(),
        message: e.to_string(),
    })
}
