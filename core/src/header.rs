//! Custom e-mail headers in the vendor's canonical `[{"Name", "Value"}]` form.
//!
//! Header names are not guaranteed to be valid or unique object keys, and
//! their order can matter, so they always travel as an ordered list of pairs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single `(name, value)` header. The value is a JSON scalar or `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value", default)]
    pub value: Value,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Ordered header pairs. Duplicate names are allowed; empty names are dropped
/// on every construction path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Header>", into = "Vec<Header>")]
pub struct HeaderList(Vec<Header>);

impl HeaderList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header, ignoring it when `name` is empty.
    pub fn push(&mut self, header: Header) {
        if !header.name.is_empty() {
            self.0.push(header);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Header> {
        self.0.iter()
    }

    /// Promote a JSON object: each key becomes a header name, in object order.
    /// Returns `None` if any value is an object or array.
    pub fn from_map(map: &Map<String, Value>) -> Option<Self> {
        map.iter()
            .map(|(k, v)| scalar_value(v).map(|v| Header::new(k.as_str(), v)))
            .collect()
    }

    /// Interpret a loosely-typed JSON header value.
    ///
    /// Accepts an object (keys become names) or an array whose elements are
    /// either `{"Name": .., "Value": ..}` objects or `[name, value]` pairs.
    /// Header values must be scalars or `null`. Returns `None` for any other
    /// shape.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(map) => Self::from_map(map),
            Value::Array(items) => {
                let mut list = HeaderList::new();
                for item in items {
                    list.push(pair_from_value(item)?);
                }
                Some(list)
            }
            _ => None,
        }
    }
}

fn pair_from_value(item: &Value) -> Option<Header> {
    match item {
        Value::Object(map) => {
            let name = scalar_name(map.get("Name")?)?;
            let value = match map.get("Value") {
                Some(value) => scalar_value(value)?,
                None => Value::Null,
            };
            Some(Header { name, value })
        }
        Value::Array(pair) if pair.len() == 2 => Some(Header {
            name: scalar_name(&pair[0])?,
            value: scalar_value(&pair[1])?,
        }),
        _ => None,
    }
}

fn scalar_value(value: &Value) -> Option<Value> {
    match value {
        Value::Object(_) | Value::Array(_) => None,
        scalar => Some(scalar.clone()),
    }
}

/// Header names given as numbers (e.g. positional map keys) keep their text form.
fn scalar_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl<K, V> FromIterator<(K, V)> for HeaderList
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut list = HeaderList::new();
        for (name, value) in iter {
            list.push(Header::new(name, value));
        }
        list
    }
}

impl FromIterator<Header> for HeaderList {
    fn from_iter<I: IntoIterator<Item = Header>>(iter: I) -> Self {
        let mut list = HeaderList::new();
        for header in iter {
            list.push(header);
        }
        list
    }
}

impl From<Vec<Header>> for HeaderList {
    fn from(headers: Vec<Header>) -> Self {
        headers.into_iter().collect()
    }
}

impl From<HeaderList> for Vec<Header> {
    fn from(list: HeaderList) -> Self {
        list.0
    }
}

impl<'a> IntoIterator for &'a HeaderList {
    type Item = &'a Header;
    type IntoIter = std::slice::Iter<'a, Header>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
