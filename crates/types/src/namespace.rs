//! Namespace path helpers
//!
//! A namespace is a "/"-delimited path such as `/global/eur/gb` that names
//! one configuration tree and, for remote backends, the suffix of the
//! external key under the manager's server prefix.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Suffix probed when looking for the nearest default namespace
pub const DEFAULT_SEGMENT: &str = "default";

/// A "/"-delimited namespace path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamespacePath(String);

impl NamespacePath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Candidate `.../default` namespaces, nearest first.
    ///
    /// `/global/eur/gb` yields `/global/eur/gb/default`, `/global/eur/default`,
    /// `/global/default` and `/default`. A path without a leading slash stops
    /// at its first segment.
    pub fn default_candidates(&self) -> Vec<String> {
        let mut candidates = Vec::new();
        let mut current = self.0.clone();
        if !current.ends_with('/') {
            current.push('/');
        }

        while current.contains('/') {
            candidates.push(format!("{}{}", current, DEFAULT_SEGMENT));

            current.pop();
            match current.rfind('/') {
                Some(idx) if current.len() > 1 => current.truncate(idx + 1),
                _ => break,
            }
        }
        candidates
    }
}

impl fmt::Display for NamespacePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NamespacePath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NamespacePath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Concatenate a server prefix and a namespace name
pub fn join_key(prefix: &str, name: &str) -> String {
    format!("{}{}", prefix.trim(), name.trim())
}

/// Recover the namespace name from a raw backend key.
///
/// Backends disagree about leading slashes: a prefix of `/config/` may come
/// back as `config/app`. When the raw key lacks the prefix's leading slash,
/// one less character is stripped.
pub fn strip_server_prefix<'a>(prefix: &str, key: &'a str) -> &'a str {
    if let Some(rest) = key.strip_prefix(prefix) {
        return rest;
    }
    if let Some(unslashed) = prefix.strip_prefix('/') {
        if let Some(rest) = key.strip_prefix(unslashed) {
            return rest;
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_candidates_rooted() {
        let path = NamespacePath::from("/global/eur/gb");
        assert_eq!(
            path.default_candidates(),
            vec![
                "/global/eur/gb/default",
                "/global/eur/default",
                "/global/default",
                "/default",
            ]
        );
    }

    #[test]
    fn test_default_candidates_edge_cases() {
        assert_eq!(NamespacePath::from("/").default_candidates(), vec!["/default"]);
        assert_eq!(NamespacePath::from("").default_candidates(), vec!["/default"]);
        assert_eq!(
            NamespacePath::from("global/eur").default_candidates(),
            vec!["global/eur/default", "global/default"]
        );
        assert_eq!(
            NamespacePath::from("/global/").default_candidates(),
            vec!["/global/default", "/default"]
        );
    }

    #[test]
    fn test_strip_server_prefix() {
        assert_eq!(strip_server_prefix("/config/", "/config/app"), "app");
        assert_eq!(strip_server_prefix("/config/", "config/app"), "app");
        assert_eq!(strip_server_prefix("/config", "config/app"), "/app");
        assert_eq!(strip_server_prefix("/other/", "config/app"), "config/app");
    }

    #[test]
    fn test_join_key_trims() {
        assert_eq!(join_key(" /config ", " /app "), "/config/app");
    }
}
