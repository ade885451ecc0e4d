//! Attribute values and their encoding rules.
//!
//! Every attribute value is classified once, when it is set, into one of the
//! [`AttributeType`]s. Structured values are canonicalized (sorted keys,
//! sequences joined into a single string) so that two semantically equal
//! records intern to the same dictionary id.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};

use crate::schema::{AttributeType, KeySchema};

/// Separator used when a sequence inside a structured value is flattened.
pub const LIST_SEPARATOR: &str = " ";

/// A numeric attribute value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            // Debug keeps the trailing ".0" of integral floats
            Number::Float(x) => write!(f, "{:?}", x),
        }
    }
}

/// Handle to a record stored in a global attribute table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GlobalRef {
    pub(crate) name: String,
    pub(crate) id: u32,
}

impl GlobalRef {
    /// Name of the global attribute.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Id of the record in its table.
    pub fn id(&self) -> u32 {
        self.id
    }
}

/// A raw attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Text(String),
    Number(Number),
    Labels(IndexSet<String>),
    Structured(Map<String, Value>),
    Reference(GlobalRef),
}

impl AttributeValue {
    /// Encoding type this value is classified as.
    pub fn attribute_type(&self) -> AttributeType {
        match self {
            AttributeValue::Text(_) => AttributeType::Text,
            AttributeValue::Number(_) => AttributeType::Number,
            AttributeValue::Labels(_) => AttributeType::Labels,
            AttributeValue::Structured(_) => AttributeType::Dict,
            AttributeValue::Reference(_) => AttributeType::Ref,
        }
    }

    /// Text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Number(Number::Int(value))
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Number(Number::Int(value.into()))
    }
}

impl From<u32> for AttributeValue {
    fn from(value: u32) -> Self {
        AttributeValue::Number(Number::Int(value.into()))
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(Number::Float(value))
    }
}

/// Booleans are stored as the numbers 0 and 1.
impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Number(Number::Int(i64::from(value)))
    }
}

impl From<Vec<&str>> for AttributeValue {
    fn from(value: Vec<&str>) -> Self {
        AttributeValue::Labels(value.into_iter().map(String::from).collect())
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(value: Vec<String>) -> Self {
        AttributeValue::Labels(value.into_iter().collect())
    }
}

impl<const N: usize> From<[&str; N]> for AttributeValue {
    fn from(value: [&str; N]) -> Self {
        AttributeValue::Labels(value.into_iter().map(String::from).collect())
    }
}

impl From<IndexSet<String>> for AttributeValue {
    fn from(value: IndexSet<String>) -> Self {
        AttributeValue::Labels(value)
    }
}

impl From<BTreeSet<String>> for AttributeValue {
    fn from(value: BTreeSet<String>) -> Self {
        AttributeValue::Labels(value.into_iter().collect())
    }
}

impl From<Map<String, Value>> for AttributeValue {
    fn from(value: Map<String, Value>) -> Self {
        AttributeValue::Structured(value)
    }
}

impl From<GlobalRef> for AttributeValue {
    fn from(value: GlobalRef) -> Self {
        AttributeValue::Reference(value)
    }
}

impl From<&GlobalRef> for AttributeValue {
    fn from(value: &GlobalRef) -> Self {
        AttributeValue::Reference(value.clone())
    }
}

/// Classify an arbitrary JSON value: arrays become labels, objects become
/// structured values, numbers and booleans become numbers, anything else text.
impl From<Value> for AttributeValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => {
                AttributeValue::Labels(items.iter().map(scalar_to_string).collect())
            }
            Value::Object(map) => AttributeValue::Structured(map),
            Value::Number(n) => match n.as_i64() {
                Some(i) => AttributeValue::Number(Number::Int(i)),
                None => AttributeValue::Number(Number::Float(n.as_f64().unwrap_or(f64::NAN))),
            },
            Value::Bool(b) => b.into(),
            Value::String(s) => AttributeValue::Text(s),
            Value::Null => AttributeValue::Text(String::new()),
        }
    }
}

/// Render a JSON scalar without the quotes `to_string` would add to strings.
fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Object(map) => canonical_json(&canonicalize(map.clone())),
        other => other.to_string(),
    }
}

/// Canonicalize a structured value: keys are sorted, nested objects are
/// canonicalized recursively and sequences are joined into a single string.
pub fn canonicalize(map: Map<String, Value>) -> Map<String, Value> {
    let sorted: BTreeMap<String, Value> = map.into_iter().collect();
    sorted
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::Array(items) => Value::String(
                    items
                        .iter()
                        .map(scalar_to_string)
                        .collect::<Vec<_>>()
                        .join(LIST_SEPARATOR),
                ),
                Value::Object(nested) => Value::Object(canonicalize(nested)),
                other => other,
            };
            (key, value)
        })
        .collect()
}

/// Serialize an already canonical structured value.
pub fn canonical_json(map: &Map<String, Value>) -> String {
    // Serializing a map of JSON values cannot fail
    serde_json::to_string(map).unwrap_or_else(|_| String::from("{}"))
}

/// Canonical JSON of the empty structured value.
pub fn empty_structured() -> String {
    canonical_json(&Map::new())
}

/// Extend an accreted key schema with the keys of one canonical structured value.
///
/// The first occurrence of a key fixes its subtype; nested objects merge their keys.
pub fn accrete_keys(keys: &mut IndexMap<String, KeySchema>, map: &Map<String, Value>) {
    for (key, value) in map {
        match value {
            Value::Object(nested) => {
                let entry = keys
                    .entry(key.clone())
                    .or_insert_with(|| KeySchema {
                        key_type: AttributeType::Dict,
                        keys: Some(IndexMap::new()),
                    });
                if let Some(nested_keys) = entry.keys.as_mut() {
                    accrete_keys(nested_keys, nested);
                }
            }
            Value::Number(_) | Value::Bool(_) => {
                keys.entry(key.clone())
                    .or_insert_with(|| KeySchema::scalar(AttributeType::Number));
            }
            _ => {
                keys.entry(key.clone())
                    .or_insert_with(|| KeySchema::scalar(AttributeType::Text));
            }
        }
    }
}

/// Escape a value for inclusion in a full-text-search vector token.
pub fn escape_fts(value: &str) -> String {
    value.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_classification() {
        assert_eq!(AttributeValue::from("x").attribute_type(), AttributeType::Text);
        assert_eq!(AttributeValue::from(3).attribute_type(), AttributeType::Number);
        assert_eq!(AttributeValue::from(true).attribute_type(), AttributeType::Number);
        assert_eq!(
            AttributeValue::from(vec!["a", "b"]).attribute_type(),
            AttributeType::Labels
        );
        assert_eq!(
            AttributeValue::from(json!({"a": 1})).attribute_type(),
            AttributeType::Dict
        );
        assert_eq!(AttributeValue::from(json!(null)), AttributeValue::Text(String::new()));
    }

    #[test]
    fn test_number_display() {
        assert_eq!(Number::Int(3).to_string(), "3");
        assert_eq!(Number::Float(3.0).to_string(), "3.0");
        assert_eq!(Number::Float(0.25).to_string(), "0.25");
        assert_eq!(AttributeValue::from(false), AttributeValue::Number(Number::Int(0)));
    }

    #[test]
    fn test_canonical_form_sorts_keys_and_joins_lists() {
        let a = canonicalize(object(json!({"number": "sg", "gender": "NA", "morphemes": ["wor", "ld"]})));
        let b = canonicalize(object(json!({"morphemes": ["wor", "ld"], "gender": "NA", "number": "sg"})));
        assert_eq!(canonical_json(&a), canonical_json(&b));
        assert_eq!(
            canonical_json(&a),
            r#"{"gender":"NA","morphemes":"wor ld","number":"sg"}"#
        );
    }

    #[test]
    fn test_canonicalize_nested() {
        let map = canonicalize(object(json!({"b": {"z": [1, 2], "y": true}, "a": []})));
        assert_eq!(canonical_json(&map), r#"{"a":"","b":{"y":true,"z":"1 2"}}"#);
        assert_eq!(empty_structured(), "{}");
    }

    #[test]
    fn test_accrete_keys_merges_records() {
        let mut keys = IndexMap::new();
        accrete_keys(&mut keys, &canonicalize(object(json!({"age": 35, "name": "Jane"}))));
        accrete_keys(&mut keys, &canonicalize(object(json!({"age": "unknown", "origin": {"city": "Bern"}}))));

        assert_eq!(keys["age"].key_type, AttributeType::Number);
        assert_eq!(keys["name"].key_type, AttributeType::Text);
        assert_eq!(keys["origin"].key_type, AttributeType::Dict);
        let nested = keys["origin"].keys.as_ref().unwrap();
        assert_eq!(nested["city"].key_type, AttributeType::Text);
    }

    #[test]
    fn test_labels_keep_first_seen_order() {
        let value = AttributeValue::from(vec!["b", "a", "b"]);
        match value {
            AttributeValue::Labels(set) => {
                assert_eq!(set.iter().collect::<Vec<_>>(), vec!["b", "a"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_escape_fts() {
        assert_eq!(escape_fts("l'homme"), "l''homme");
    }
}
