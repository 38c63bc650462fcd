//! Case- and underscore-insensitive view over a decoded JSON object.
//!
//! # Design
//! A `DynamicRecord` holds two copies of the same object. `payload` is the
//! object exactly as the server sent it (key casing and order intact) and is
//! never touched after construction. `fields` is the working copy keyed by
//! `normalize_key`, used for every read, write and iteration, so
//! `MessageID`, `messageId` and `message_id` all address one slot.
//!
//! When two payload keys normalize to the same slot, the later value wins and
//! the slot keeps the position of the first.

use std::ops::Index;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

static NULL: Value = Value::Null;

/// Lower-case `key` and strip underscores.
pub fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// The universal return type of every API call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicRecord {
    payload: Map<String, Value>,
    fields: Map<String, Value>,
}

impl DynamicRecord {
    pub fn new(payload: Map<String, Value>) -> Self {
        let mut fields = Map::with_capacity(payload.len());
        for (key, value) in &payload {
            fields.insert(normalize_key(key), value.clone());
        }
        Self { payload, fields }
    }

    /// Build from any JSON value. Objects are used as-is, `null` becomes an
    /// empty record, anything else is wrapped under the key `Value`.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::new(map),
            Value::Null => Self::default(),
            other => {
                let mut map = Map::new();
                map.insert("Value".to_string(), other);
                Self::new(map)
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(&normalize_key(key))
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.fields.get_mut(&normalize_key(key))
    }

    /// Write through the normalized view, returning the previous value.
    /// The original payload is unaffected.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(normalize_key(key), value.into())
    }

    /// Remove a field, preserving the order of the remaining ones.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.shift_remove(&normalize_key(key))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(&normalize_key(key))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Normalized keys and their values, in insertion order.
    pub fn iter(&self) -> serde_json::map::Iter<'_> {
        self.fields.iter()
    }

    pub fn keys(&self) -> serde_json::map::Keys<'_> {
        self.fields.keys()
    }

    /// Deserialize a single field. Missing fields and explicit `null` yield
    /// `Ok(None)`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, serde_json::Error> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => T::deserialize(value).map(Some),
        }
    }

    /// A nested object field as its own record.
    pub fn record(&self, key: &str) -> Option<DynamicRecord> {
        match self.get(key)? {
            Value::Object(map) => Some(DynamicRecord::new(map.clone())),
            _ => None,
        }
    }

    /// The object elements of an array field as records. Non-object
    /// elements are skipped.
    pub fn records(&self, key: &str) -> Vec<DynamicRecord> {
        match self.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_object().cloned().map(DynamicRecord::new))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// The object exactly as decoded from the response body.
    pub fn original_payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub fn into_payload(self) -> Map<String, Value> {
        self.payload
    }
}

impl Index<&str> for DynamicRecord {
    type Output = Value;

    /// Missing fields index to `null`, like `serde_json::Value`.
    fn index(&self, key: &str) -> &Value {
        self.get(key).unwrap_or(&NULL)
    }
}

impl<'a> IntoIterator for &'a DynamicRecord {
    type Item = (&'a String, &'a Value);
    type IntoIter = serde_json::map::Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl From<Map<String, Value>> for DynamicRecord {
    fn from(payload: Map<String, Value>) -> Self {
        Self::new(payload)
    }
}
