//! Stored property values

use crate::tree::{PropertyTree, SharedTree};
use serde_json::{Map as JsonMap, Number, Value as JsonValue};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A leaf value as it came out of the document
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

/// A value stored in a [`PropertyTree`]
///
/// Mappings are always wrapped into [`Value::Node`] when they enter a tree,
/// so readers never see raw structured data.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    Node(PropertyTree),
    List(Vec<Value>),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    fn from_json(json: &JsonValue) -> Option<Self> {
        match json {
            JsonValue::Null => Some(Scalar::Null),
            JsonValue::Bool(b) => Some(Scalar::Bool(*b)),
            JsonValue::Number(n) => Some(match n.as_i64() {
                Some(i) => Scalar::Integer(i),
                None => Scalar::Float(n.as_f64().unwrap_or(f64::NAN)),
            }),
            JsonValue::String(s) => Some(Scalar::String(s.clone())),
            JsonValue::Array(_) | JsonValue::Object(_) => None,
        }
    }

    fn to_json(&self) -> JsonValue {
        match self {
            Scalar::Null => JsonValue::Null,
            Scalar::Bool(b) => JsonValue::Bool(*b),
            Scalar::Integer(i) => JsonValue::Number((*i).into()),
            Scalar::Float(f) => Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Scalar::String(s) => JsonValue::String(s.clone()),
        }
    }
}

impl Value {
    /// Wrap raw structured data. Mappings become child trees that share
    /// `global`; list elements are wrapped the same way.
    pub fn from_json(json: JsonValue, global: Option<&SharedTree>) -> Self {
        match json {
            JsonValue::Object(map) => Value::Node(PropertyTree::from_map_with_global(map, global.cloned())),
            JsonValue::Array(items) => Value::List(
                items
                    .into_iter()
                    .map(|item| Value::from_json(item, global))
                    .collect(),
            ),
            other => match Scalar::from_json(&other) {
                Some(scalar) => Value::Scalar(scalar),
                None => Value::Scalar(Scalar::Null),
            },
        }
    }

    /// Materialize back into plain nested mapping/list/scalar data
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Scalar(scalar) => scalar.to_json(),
            Value::Node(tree) => JsonValue::Object(tree.get_map()),
            Value::List(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Scalar(Scalar::Null))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&PropertyTree> {
        match self {
            Value::Node(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Integer(i) => write!(f, "{}", i),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::String(s) => f.write_str(s),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(scalar) => scalar.fmt(f),
            Value::Node(tree) => tree.fmt(f),
            Value::List(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl Hash for Scalar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Scalar::Null => {}
            Scalar::Bool(b) => b.hash(state),
            Scalar::Integer(i) => i.hash(state),
            // -0.0 compares equal to 0.0
            Scalar::Float(v) => {
                let v = if *v == 0.0 { 0.0f64 } else { *v };
                v.to_bits().hash(state)
            }
            Scalar::String(s) => s.hash(state),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Scalar(scalar) => scalar.hash(state),
            Value::Node(tree) => tree.hash(state),
            Value::List(items) => items.hash(state),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(Scalar::String(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Scalar(Scalar::String(s))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Scalar(Scalar::Bool(b))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Scalar(Scalar::Integer(i))
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Scalar(Scalar::Integer(i64::from(i)))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Scalar(Scalar::Float(v))
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Scalar(Scalar::Float(f64::from(v)))
    }
}

impl From<PropertyTree> for Value {
    fn from(tree: PropertyTree) -> Self {
        Value::Node(tree)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

/// Materialize a slice of entries into an ordered JSON map
pub(crate) fn entries_to_map<'a, I>(entries: I) -> JsonMap<String, JsonValue>
where
    I: IntoIterator<Item = (&'a String, &'a Value)>,
{
    entries
        .into_iter()
        .map(|(key, value)| (key.clone(), value.to_json()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mapping_becomes_node() {
        let value = Value::from_json(json!({"a": 1, "b": {"c": "x"}}), None);
        let node = value.as_node().unwrap();
        assert_eq!(node.len(), 2);
        assert!(node.get_local("b").unwrap().as_node().is_some());
    }

    #[test]
    fn test_list_keeps_scalars_and_wraps_mappings() {
        let value = Value::from_json(json!(["a", {"k": "v"}, 3]), None);
        let items = value.as_list().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_str(), Some("a"));
        assert!(items[1].as_node().is_some());
        assert_eq!(items[2], Value::from(3i64));
    }

    fn hash_of(value: &Value) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_signed_zero_hashes_like_zero() {
        let positive = Value::Scalar(Scalar::Float(0.0));
        let negative = Value::Scalar(Scalar::Float(-0.0));
        assert_eq!(positive, negative);
        assert_eq!(hash_of(&positive), hash_of(&negative));
        assert_ne!(hash_of(&positive), hash_of(&Value::Scalar(Scalar::Float(1.5))));
    }

    #[test]
    fn test_materialize_restores_json() {
        let raw = json!({"a": [1, {"b": true}], "c": 2.5, "d": null});
        let value = Value::from_json(raw.clone(), None);
        assert_eq!(value.to_json(), raw);
    }

    #[test]
    fn test_scalar_display() {
        assert_eq!(Value::from("text").to_string(), "text");
        assert_eq!(Value::from(10i64).to_string(), "10");
        assert_eq!(Value::from(10.5).to_string(), "10.5");
        assert_eq!(Value::from(true).to_string(), "true");
    }
}
