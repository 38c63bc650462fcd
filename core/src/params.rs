//! Loosely-typed request parameters with an explicit "unset" state.
//!
//! # Design
//! Once a value reaches a generic container, "not passed" and "passed as
//! `false`/`0`/`""`" are indistinguishable, so absence is a variant of its
//! own (`Field::Unset`) rather than something inferred from the value. Only
//! `Unset` fields are dropped from the wire payload.

use serde::Serialize;
use serde_json::Value;

use crate::header::HeaderList;

/// A single parameter slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// Never set by the caller; omitted from the wire payload.
    Unset,
    /// An explicit value, including `null`, `false`, `0` and `""`.
    Value(Value),
    /// Rendered as `[{"Name": .., "Value": ..}, ..]`.
    Headers(HeaderList),
    /// Nested parameter sets rendered as a JSON array, e.g. a wrapped batch.
    List(Vec<Params>),
}

impl Field {
    pub fn is_unset(&self) -> bool {
        matches!(self, Field::Unset)
    }
}

/// Ordered mapping of field name to `Field`.
///
/// Assigning the same name twice replaces the earlier value in place, along
/// with any serialization failure recorded for it.
#[derive(Debug, Default)]
pub struct Params {
    fields: Vec<(String, Field)>,
    encode_errors: Vec<(String, serde_json::Error)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to an explicit value.
    pub fn set(mut self, name: impl Into<String>, value: impl Serialize) -> Self {
        let name = name.into();
        match serde_json::to_value(value) {
            Ok(value) => self.insert(name, Field::Value(value)),
            Err(e) => {
                self.insert(name.clone(), Field::Unset);
                self.encode_errors.push((name, e));
            }
        }
        self
    }

    /// Set `name` when `value` is `Some`, otherwise leave it unset.
    pub fn set_opt<T: Serialize>(self, name: impl Into<String>, value: Option<T>) -> Self {
        match value {
            Some(value) => self.set(name, value),
            None => self.unset(name),
        }
    }

    /// Reserve `name` as unset, keeping its position for a later assignment.
    pub fn unset(mut self, name: impl Into<String>) -> Self {
        self.insert(name.into(), Field::Unset);
        self
    }

    pub fn headers(mut self, name: impl Into<String>, headers: impl Into<HeaderList>) -> Self {
        self.insert(name.into(), Field::Headers(headers.into()));
        self
    }

    pub fn list(mut self, name: impl Into<String>, items: Vec<Params>) -> Self {
        self.insert(name.into(), Field::List(items));
        self
    }

    /// Insert or replace a field.
    pub fn insert(&mut self, name: String, field: Field) {
        self.encode_errors.retain(|(failed, _)| *failed != name);
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some((_, slot)) => *slot = field,
            None => self.fields.push((name, field)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, f)| f)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(k, f)| (k.as_str(), f))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// First field whose current value failed to serialize.
    pub(crate) fn encode_error(&self) -> Option<&(String, serde_json::Error)> {
        self.encode_errors.first()
    }
}

impl PartialEq for Params {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl Clone for Params {
    /// Clones the fields. Pending serialization errors are not cloneable and
    /// are re-reported as their messages.
    fn clone(&self) -> Self {
        let encode_errors = self
            .encode_errors
            .iter()
            .map(|(name, e)| {
                (name.clone(), <serde_json::Error as serde::ser::Error>::custom(e.to_string()))
            })
            .collect();
        Self {
            fields: self.fields.clone(),
            encode_errors,
        }
    }
}

/// Everything a resource method can hand to the pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    #[default]
    Empty,
    Fields(Params),
    /// A top-level JSON array of message objects.
    Batch(Vec<Params>),
}

impl From<Params> for Payload {
    fn from(params: Params) -> Self {
        Payload::Fields(params)
    }
}

impl From<Vec<Params>> for Payload {
    fn from(batch: Vec<Params>) -> Self {
        Payload::Batch(batch)
    }
}

impl From<()> for Payload {
    fn from(_: ()) -> Self {
        Payload::Empty
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;

    #[test]
    fn set_opt_none_is_unset_not_null() {
        let params = Params::new().set_opt::<bool>("TrackOpens", None);
        assert_eq!(params.get("TrackOpens"), Some(&Field::Unset));
    }

    #[test]
    fn falsy_values_are_present() {
        let params = Params::new()
            .set("TrackOpens", false)
            .set("Count", 0)
            .set("Tag", "");
        assert_eq!(params.get("TrackOpens"), Some(&Field::Value(json!(false))));
        assert_eq!(params.get("Count"), Some(&Field::Value(json!(0))));
        assert_eq!(params.get("Tag"), Some(&Field::Value(json!(""))));
    }

    #[test]
    fn reassignment_keeps_original_position() {
        let params = Params::new()
            .unset("A")
            .set("B", 1)
            .set("A", 2);
        let names: Vec<&str> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["A", "B"]);
        assert_eq!(params.get("A"), Some(&Field::Value(json!(2))));
    }

    #[test]
    fn serialization_failure_is_retained() {
        // Non-string map keys cannot become JSON object keys.
        let mut bad = HashMap::new();
        bad.insert(vec![1u8], "x");
        let params = Params::new().set("Metadata", bad).set("From", "a@b.c");
        let (name, _) = params.encode_error().unwrap();
        assert_eq!(name, "Metadata");
        assert_eq!(params.get("Metadata"), Some(&Field::Unset));
        assert!(params.clone().encode_error().is_some());
    }

    fn unserializable() -> HashMap<Vec<u8>, &'static str> {
        HashMap::from([(vec![1u8], "x")])
    }

    #[test]
    fn replacing_a_failed_field_clears_its_error() {
        let params = Params::new()
            .set("Metadata", unserializable())
            .set("Metadata", json!({"k": "v"}));
        assert!(params.encode_error().is_none());
        assert_eq!(params.get("Metadata"), Some(&Field::Value(json!({"k": "v"}))));

        let params = Params::new().set("Metadata", unserializable()).unset("Metadata");
        assert!(params.encode_error().is_none());
    }

    #[test]
    fn other_failures_survive_a_replacement() {
        let params = Params::new()
            .set("Metadata", unserializable())
            .set("Extra", unserializable())
            .set("Metadata", "fixed");
        let (name, _) = params.encode_error().unwrap();
        assert_eq!(name, "Extra");
    }

    #[test]
    fn payload_conversions() {
        assert_eq!(Payload::from(()), Payload::Empty);
        assert!(matches!(Payload::from(Params::new()), Payload::Fields(_)));
        assert!(matches!(Payload::from(vec![Params::new()]), Payload::Batch(_)));
    }
}
