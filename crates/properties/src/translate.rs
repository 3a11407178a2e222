//! Path translation and token substitution hooks
//!
//! String properties whose key mentions a file, directory or path are run
//! through [`PathTranslator::translate_path`]; every string property is run
//! through [`PathTranslator::substitute`]. Hosts plug in their own
//! environment handling; the tree only knows this trait.

use std::collections::HashMap;

/// Key fragments that mark a property as a filesystem location
const PATH_KEY_MARKERS: [&str; 3] = ["file", "directory", "path"];

pub trait PathTranslator: Send + Sync {
    /// Rewrite a filesystem location
    fn translate_path(&self, value: &str) -> String;

    /// Replace non-standard substitution tokens
    fn substitute(&self, value: &str) -> String {
        value.to_string()
    }
}

/// Whether a property key names a filesystem location
pub fn is_path_key(key: &str) -> bool {
    let key = key.to_lowercase();
    PATH_KEY_MARKERS.iter().any(|marker| key.contains(marker))
}

/// Leaves every value untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTranslator;

impl PathTranslator for IdentityTranslator {
    fn translate_path(&self, value: &str) -> String {
        value.to_string()
    }
}

/// Replaces `{{name}}` tokens from a fixed table
#[derive(Debug, Clone, Default)]
pub struct TokenTranslator {
    tokens: HashMap<String, String>,
}

impl TokenTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tokens.insert(name.into(), value.into());
        self
    }

    fn replace_tokens(&self, value: &str) -> String {
        let mut result = value.to_string();
        for (name, replacement) in &self.tokens {
            result = result.replace(&format!("{{{{{}}}}}", name), replacement);
        }
        result
    }
}

impl PathTranslator for TokenTranslator {
    fn translate_path(&self, value: &str) -> String {
        let replaced = self.replace_tokens(value);
        if std::path::MAIN_SEPARATOR == '/' {
            replaced
        } else {
            replaced.replace('/', std::path::MAIN_SEPARATOR_STR)
        }
    }

    fn substitute(&self, value: &str) -> String {
        self.replace_tokens(value)
    }
}
