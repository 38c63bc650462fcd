//! Normalizes `Params` into the JSON structure sent on the wire.
//!
//! Rules:
//! - `Field::Unset` is removed; the remaining fields keep their order.
//! - Header fields become `[{"Name", "Value"}, ..]`. A raw object or pair
//!   array under a field named `headers` (any case) is promoted the same way.
//!   An empty or `null` header field is omitted.
//! - Any other value, including nested value objects that serialized
//!   themselves, passes through untouched.
//! - A batch is a bare array of normalized messages. Wrapping it under a
//!   named field is the caller's choice (`Params::list`).

use serde_json::{Map, Value};

use crate::error::PostmarkError;
use crate::header::HeaderList;
use crate::params::{Field, Params, Payload};

/// Normalize a payload. `Payload::Empty` yields `None`.
pub fn normalize_payload(payload: &Payload) -> Result<Option<Value>, PostmarkError> {
    match payload {
        Payload::Empty => Ok(None),
        Payload::Fields(params) => normalize(params).map(|map| Some(Value::Object(map))),
        Payload::Batch(items) => normalize_list(items).map(|list| Some(Value::Array(list))),
    }
}

/// Normalize one parameter set into a JSON object.
pub fn normalize(params: &Params) -> Result<Map<String, Value>, PostmarkError> {
    if let Some((name, e)) = params.encode_error() {
        return Err(PostmarkError::encoding(
            format!("field `{name}`"),
            e.to_string(),
        ));
    }

    let mut out = Map::new();
    for (name, field) in params.iter() {
        let value = match field {
            Field::Unset => continue,
            Field::Headers(headers) => match header_value(headers)? {
                Some(value) => value,
                None => continue,
            },
            Field::Value(value) if is_headers_key(name) => match promote_headers(name, value)? {
                Some(value) => value,
                None => continue,
            },
            Field::Value(value) => value.clone(),
            Field::List(items) => Value::Array(normalize_list(items)?),
        };
        out.insert(name.to_string(), value);
    }
    Ok(out)
}

fn normalize_list(items: &[Params]) -> Result<Vec<Value>, PostmarkError> {
    items
        .iter()
        .map(|item| normalize(item).map(Value::Object))
        .collect()
}

fn is_headers_key(name: &str) -> bool {
    name.eq_ignore_ascii_case("headers")
}

fn promote_headers(name: &str, value: &Value) -> Result<Option<Value>, PostmarkError> {
    if value.is_null() {
        return Ok(None);
    }
    let headers = HeaderList::from_value(value).ok_or_else(|| {
        PostmarkError::encoding(
            format!("field `{name}`"),
            "headers must be an object or a list of name/value pairs with scalar values",
        )
    })?;
    header_value(&headers)
}

fn header_value(headers: &HeaderList) -> Result<Option<Value>, PostmarkError> {
    if headers.is_empty() {
        return Ok(None);
    }
    serde_json::to_value(headers)
        .map(Some)
        .map_err(|e| PostmarkError::encoding("headers", e))
}

#[cfg(test)]
mod tests {
    use serde::Serialize;
    use serde_json::json;

    use super::*;
    use crate::header::Header;

    #[derive(Serialize)]
    struct BounceTrigger {
        #[serde(rename = "Enabled")]
        enabled: bool,
        #[serde(rename = "IncludeContent")]
        include_content: bool,
    }

    fn send_email_params(track_opens: Option<bool>, track_links: Option<&str>) -> Params {
        Params::new()
            .set("From", "sender@example.com")
            .set("To", "receiver@example.com")
            .set_opt::<&str>("Cc", None)
            .set("Subject", "Hello")
            .set_opt("TrackOpens", track_opens)
            .set_opt("TrackLinks", track_links)
    }

    #[test]
    fn unset_fields_are_dropped_and_falsy_kept() {
        let body = normalize(&send_email_params(Some(false), None)).unwrap();
        assert_eq!(body.get("TrackOpens"), Some(&json!(false)));
        assert!(!body.contains_key("TrackLinks"));
        assert!(!body.contains_key("Cc"));
    }

    #[test]
    fn field_order_is_preserved() {
        let body = normalize(&send_email_params(Some(true), Some("HtmlOnly"))).unwrap();
        let keys: Vec<&str> = body.keys().map(String::as_str).collect();
        assert_eq!(keys, ["From", "To", "Subject", "TrackOpens", "TrackLinks"]);
    }

    #[test]
    fn zero_empty_string_and_null_are_present() {
        let params = Params::new()
            .set("InboundSpamThreshold", 0)
            .set("Tag", "")
            .set("Color", Value::Null);
        let body = normalize(&params).unwrap();
        assert_eq!(Value::Object(body), json!({"InboundSpamThreshold": 0, "Tag": "", "Color": null}));
    }

    #[test]
    fn header_list_renders_as_pairs() {
        let headers: HeaderList = [("X-A", "1"), ("", "dropped"), ("X-B", "2")].into_iter().collect();
        let body = normalize(&Params::new().headers("Headers", headers)).unwrap();
        assert_eq!(
            body["Headers"],
            json!([{"Name": "X-A", "Value": "1"}, {"Name": "X-B", "Value": "2"}])
        );
    }

    #[test]
    fn raw_header_mapping_is_promoted() {
        let params = Params::new().set("headers", json!({"X-Custom": "yes", "X-Null": null}));
        let body = normalize(&params).unwrap();
        assert_eq!(
            body["headers"],
            json!([{"Name": "X-Custom", "Value": "yes"}, {"Name": "X-Null", "Value": null}])
        );
    }

    #[test]
    fn empty_or_null_headers_are_omitted() {
        let params = Params::new()
            .headers("Headers", HeaderList::new())
            .set("From", "a@b.c");
        assert!(!normalize(&params).unwrap().contains_key("Headers"));

        let params = Params::new().set("Headers", Value::Null);
        assert!(normalize(&params).unwrap().is_empty());
    }

    #[test]
    fn malformed_headers_are_an_encoding_failure() {
        let params = Params::new().set("Headers", "X-Foo: bar");
        let err = normalize(&params).unwrap_err();
        assert!(matches!(err, PostmarkError::RequestEncoding { .. }));
    }

    #[test]
    fn nested_header_value_is_an_encoding_failure() {
        let params = Params::new().set("Headers", json!({"X-Obj": {"a": 1}}));
        match normalize(&params).unwrap_err() {
            PostmarkError::RequestEncoding { context, .. } => assert_eq!(context, "field `Headers`"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn value_objects_pass_through_unchanged() {
        let trigger = BounceTrigger { enabled: true, include_content: false };
        let params = Params::new().set("Bounce", trigger);
        let body = normalize(&params).unwrap();
        assert_eq!(body["Bounce"], json!({"Enabled": true, "IncludeContent": false}));
    }

    #[test]
    fn batch_is_a_bare_array_with_normalized_headers() {
        let message = |to: &str| {
            Params::new()
                .set("To", to)
                .set_opt::<&str>("Tag", None)
                .set("Headers", json!({"X-Batch": to}))
        };
        let payload = Payload::Batch(vec![message("a@x.io"), message("b@x.io")]);
        let value = normalize_payload(&payload).unwrap().unwrap();
        assert_eq!(
            value,
            json!([
                {"To": "a@x.io", "Headers": [{"Name": "X-Batch", "Value": "a@x.io"}]},
                {"To": "b@x.io", "Headers": [{"Name": "X-Batch", "Value": "b@x.io"}]}
            ])
        );
    }

    #[test]
    fn wrapped_batch_is_explicit() {
        let messages = vec![Params::new().set("TemplateId", 7).headers("Headers", vec![Header::new("X", 1)])];
        let payload = Payload::from(Params::new().list("Messages", messages));
        let value = normalize_payload(&payload).unwrap().unwrap();
        assert_eq!(
            value,
            json!({"Messages": [{"TemplateId": 7, "Headers": [{"Name": "X", "Value": 1}]}]})
        );
    }

    #[test]
    fn empty_payload_has_no_body() {
        assert_eq!(normalize_payload(&Payload::Empty).unwrap(), None);
    }

    #[test]
    fn pending_serialization_error_surfaces() {
        let mut bad = std::collections::HashMap::new();
        bad.insert((1, 2), "x");
        let err = normalize(&Params::new().set("Metadata", bad)).unwrap_err();
        match err {
            PostmarkError::RequestEncoding { context, .. } => assert_eq!(context, "field `Metadata`"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn reassigned_field_encodes_cleanly() {
        let bad = std::collections::HashMap::from([((1, 2), "x")]);
        let params = Params::new()
            .set("Metadata", bad)
            .set("Metadata", json!({"k": "v"}));
        let body = normalize(&params).unwrap();
        assert_eq!(Value::Object(body), json!({"Metadata": {"k": "v"}}));
    }
}
