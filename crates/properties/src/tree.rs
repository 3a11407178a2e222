//! Property tree with global fallback

use crate::coercion;
use crate::translate::{is_path_key, IdentityTranslator, PathTranslator};
use crate::value::{entries_to_map, Scalar, Value};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};
use types::utils::available_processors;

/// Reserved document key holding the shared fallback tree
pub const GLOBAL_KEY: &str = "global";

const SMART_QUOTE_OPEN: char = '\u{201C}';
const SMART_QUOTE_CLOSE: char = '\u{201D}';

/// A global tree shared by reference between many property trees
#[derive(Clone, Default)]
pub struct SharedTree(Arc<RwLock<PropertyTree>>);

impl SharedTree {
    pub fn new(tree: PropertyTree) -> Self {
        Self(Arc::new(RwLock::new(tree)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, PropertyTree> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, PropertyTree> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether both handles point at the same tree
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Owned copy of the current contents
    pub fn snapshot(&self) -> PropertyTree {
        self.read().clone()
    }
}

impl fmt::Debug for SharedTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedTree").field(&*self.read()).finish()
    }
}

impl PartialEq for SharedTree {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.read() == *other.read()
    }
}

/// An ordered, nested key/value store with an optional global fallback.
///
/// Lookups that miss locally are delegated to the global tree. The
/// `source` string keeps the raw text the tree was last parsed from or
/// written as, so it can be re-persisted verbatim.
#[derive(Debug, Clone, Default)]
pub struct PropertyTree {
    entries: Vec<(String, Value)>,
    global: Option<SharedTree>,
    source: Option<String>,
}

impl PropertyTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from raw structured data
    pub fn from_map(map: JsonMap<String, JsonValue>) -> Self {
        Self::from_map_with_global(map, None)
    }

    /// Build a tree whose children all share `global`
    pub fn from_map_with_global(map: JsonMap<String, JsonValue>, global: Option<SharedTree>) -> Self {
        let mut tree = Self {
            entries: Vec::with_capacity(map.len()),
            global,
            source: None,
        };
        tree.put_all(map);
        tree
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    /// Local value only, no fallback
    pub fn get_local(&self, key: &str) -> Option<&Value> {
        self.position(key).map(|idx| &self.entries[idx].1)
    }

    /// Local lookup, then the global tree
    pub fn get(&self, key: &str) -> Option<Value> {
        match self.get_local(key) {
            Some(value) if !value.is_null() => Some(value.clone()),
            _ => self.global.as_ref().and_then(|global| global.read().get(key)),
        }
    }

    /// Lookup with diagnostics and smart-quote normalisation
    fn resolve(&self, key: &str) -> Option<Value> {
        let found = match self.get_local(key) {
            Some(value) if !value.is_null() => Some((value.clone(), "main")),
            _ => self
                .global
                .as_ref()
                .and_then(|global| global.read().get(key))
                .map(|value| (value, "global")),
        };

        match found {
            Some((value, origin)) => {
                debug!(key, origin, "Property lookup succeeded");
                Some(normalize_smart_quotes(key, value))
            }
            None => {
                debug!(key, "Property lookup failed, using default");
                None
            }
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        match self.get_local(key) {
            Some(value) if !value.is_null() => true,
            _ => self
                .global
                .as_ref()
                .map(|global| global.read().contains_key(key))
                .unwrap_or(false),
        }
    }

    /// String form of a property, or `None` when absent everywhere
    pub fn get_property_opt(&self, key: &str) -> Option<String> {
        self.get_property_with(key, None, &IdentityTranslator)
    }

    /// String form of a property, falling back to `default`
    pub fn get_property(&self, key: &str, default: &str) -> String {
        self.get_property_with(key, Some(default), &IdentityTranslator)
            .unwrap_or_else(|| default.to_string())
    }

    /// String form of a property run through a host translator. Keys that
    /// mention a file, directory or path get path translation first.
    pub fn get_property_with(
        &self,
        key: &str,
        default: Option<&str>,
        translator: &dyn PathTranslator,
    ) -> Option<String> {
        let raw = match self.resolve(key) {
            Some(value) => value.to_string(),
            None => default?.to_string(),
        };

        let translated = if is_path_key(key) {
            translator.translate_path(&raw)
        } else {
            raw
        };
        Some(translator.substitute(&translated))
    }

    pub fn get_boolean_property(&self, key: &str, default: bool) -> bool {
        self.resolve(key)
            .map(|value| coercion::as_bool(&value))
            .unwrap_or(default)
    }

    pub fn get_long_property(&self, key: &str, default: i64) -> i64 {
        match self.resolve(key) {
            Some(value) => coercion::as_long(&value).unwrap_or_else(|err| {
                debug!(key, error = %err, "Property is not a number, using default");
                default
            }),
            None => default,
        }
    }

    /// Narrowing read; values outside `i32` wrap like a plain cast
    pub fn get_int_property(&self, key: &str, default: i32) -> i32 {
        match self.resolve(key) {
            Some(value) => coercion::as_long(&value)
                .map(|v| v as i32)
                .unwrap_or_else(|err| {
                    debug!(key, error = %err, "Property is not a number, using default");
                    default
                }),
            None => default,
        }
    }

    pub fn get_float_property(&self, key: &str, default: f32) -> f32 {
        match self.resolve(key) {
            Some(value) => coercion::as_double(&value)
                .map(|v| v as f32)
                .unwrap_or(default),
            None => default,
        }
    }

    pub fn get_double_property(&self, key: &str, default: f64) -> f64 {
        match self.resolve(key) {
            Some(value) => coercion::as_double(&value).unwrap_or(default),
            None => default,
        }
    }

    /// Thread count, optionally relative to the processor count
    pub fn get_thread_count(&self, key: &str, default: i32) -> i32 {
        let expression = self.get_property(key, &default.to_string());
        coercion::thread_count(&expression, available_processors()).unwrap_or_else(|err| {
            debug!(key, error = %err, "Invalid thread count, using default");
            default
        })
    }

    /// Store raw data, wrapping mappings into child trees that inherit this
    /// tree's current global reference
    pub fn put(&mut self, key: impl Into<String>, raw: JsonValue) {
        let value = Value::from_json(raw, self.global.as_ref());
        self.insert(key, value);
    }

    pub fn put_all(&mut self, map: JsonMap<String, JsonValue>) {
        for (key, raw) in map {
            self.put(key, raw);
        }
    }

    /// Store an already-typed value; an existing key keeps its position
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.position(&key) {
            Some(idx) => Some(std::mem::replace(&mut self.entries[idx].1, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Replace an existing entry with a tree. Returns whether it was present.
    pub fn replace(&mut self, key: &str, tree: PropertyTree) -> bool {
        match self.position(key) {
            Some(idx) => {
                self.entries[idx].1 = Value::Node(tree);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.position(key).map(|idx| self.entries.remove(idx).1)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn global(&self) -> Option<&SharedTree> {
        self.global.as_ref()
    }

    pub fn set_global(&mut self, global: Option<SharedTree>) {
        self.global = global;
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn set_source(&mut self, source: Option<String>) {
        self.source = source;
    }

    /// Materialized copy with every child tree unwrapped
    pub fn get_map(&self) -> JsonMap<String, JsonValue> {
        entries_to_map(self.entries.iter().map(|(k, v)| (k, v)))
    }

    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(self.get_map())
    }
}

fn normalize_smart_quotes(key: &str, value: Value) -> Value {
    if let Value::Scalar(Scalar::String(s)) = &value {
        let unquoted = s
            .strip_prefix(SMART_QUOTE_OPEN)
            .and_then(|rest| rest.strip_suffix(SMART_QUOTE_CLOSE));
        if let Some(fixed) = unquoted {
            warn!(key, original = %s, fixed, "Smart quotes detected in property value");
            return Value::from(fixed);
        }
    }
    value
}

impl PartialEq for PropertyTree {
    fn eq(&self, other: &Self) -> bool {
        let same_entries = self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .all(|(key, value)| other.get_local(key) == Some(value));

        let same_global = match (&self.global, &other.global) {
            (None, None) => true,
            (Some(a), Some(b)) => a == b,
            _ => false,
        };

        same_entries && same_global
    }
}

impl Hash for PropertyTree {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Entry order does not take part in equality, so it must not here
        let mut combined: u64 = 0;
        for (key, value) in &self.entries {
            let mut hasher = DefaultHasher::new();
            key.hash(&mut hasher);
            value.hash(&mut hasher);
            combined = combined.wrapping_add(hasher.finish());
        }
        combined.hash(state);

        if let Some(global) = &self.global {
            global.read().hash(state);
        }
    }
}

impl fmt::Display for PropertyTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())?;
        if let Some(global) = &self.global {
            write!(f, " {}", *global.read())?;
        }
        Ok(())
    }
}
