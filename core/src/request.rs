//! Turns `(method, path, payload)` into a complete `HttpRequest`.
//!
//! GET and DELETE carry their parameters in the query string; every other
//! method sends them as a JSON body. All requests get `Accept`,
//! `User-Agent` and the credential header.

use std::sync::Arc;

use serde_json::{Map, Value};
use url::Url;

use crate::auth::Credentials;
use crate::codec;
use crate::discovery::{RequestFactory, ResolvedTransport, StreamFactory, UriFactory};
use crate::error::PostmarkError;
use crate::http::{HttpMethod, HttpRequest};
use crate::params::Payload;

pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Clone)]
pub struct RequestBuilder {
    base_url: String,
    user_agent: String,
    credentials: Credentials,
    request_factory: Arc<dyn RequestFactory>,
    stream_factory: Arc<dyn StreamFactory>,
    uri_factory: Arc<dyn UriFactory>,
}

impl RequestBuilder {
    pub fn new(
        base_url: &str,
        user_agent: impl Into<String>,
        credentials: Credentials,
        resolved: &ResolvedTransport,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent: user_agent.into(),
            credentials,
            request_factory: Arc::clone(&resolved.request_factory),
            stream_factory: Arc::clone(&resolved.stream_factory),
            uri_factory: Arc::clone(&resolved.uri_factory),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn build(
        &self,
        method: HttpMethod,
        path: &str,
        payload: &Payload,
    ) -> Result<HttpRequest, PostmarkError> {
        let normalized = codec::normalize_payload(payload)?;

        // Existing percent-escapes in `path` are left as they are by the parser.
        let target = join(&self.base_url, path);
        let mut uri = self
            .uri_factory
            .create_uri(&target)
            .map_err(|e| PostmarkError::encoding(format!("URI `{target}`"), e))?;

        let body = if method.uses_query() {
            if let Some(value) = normalized {
                append_query(&mut uri, method, &value)?;
            }
            None
        } else {
            let value = normalized.unwrap_or_else(|| Value::Object(Map::new()));
            let text = serde_json::to_string(&value)
                .map_err(|e| PostmarkError::encoding("request body", e))?;
            Some(self.stream_factory.create_stream(text))
        };

        let mut request = self.request_factory.create_request(method, &uri);
        request
            .headers
            .push(("Accept".to_string(), JSON_CONTENT_TYPE.to_string()));
        if body.is_some() {
            request
                .headers
                .push(("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string()));
        }
        request
            .headers
            .push(("User-Agent".to_string(), self.user_agent.clone()));
        request.headers.push((
            self.credentials.header_name().to_string(),
            self.credentials.token().to_string(),
        ));
        request.body = body;
        Ok(request)
    }
}

impl std::fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

fn join(base: &str, path: &str) -> String {
    if path.is_empty() || path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

/// Append query parameters. `null` values are skipped, arrays repeat the key,
/// nested objects are sent as JSON text.
fn append_query(uri: &mut Url, method: HttpMethod, value: &Value) -> Result<(), PostmarkError> {
    let Value::Object(fields) = value else {
        return Err(PostmarkError::encoding(
            "query string",
            format!("{method} parameters must be named fields, not a batch"),
        ));
    };

    let mut pairs = Vec::new();
    for (name, value) in fields {
        match value {
            Value::Array(items) => {
                pairs.extend(items.iter().filter_map(query_scalar).map(|v| (name, v)));
            }
            other => pairs.extend(query_scalar(other).map(|v| (name, v))),
        }
    }

    if !pairs.is_empty() {
        let mut query = uri.query_pairs_mut();
        for (name, value) in pairs {
            query.append_pair(name, &value);
        }
    }
    Ok(())
}

fn query_scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::discovery::{resolve, DefaultDiscovery, HttpTransport};
    use crate::error::TransportError;
    use crate::header::HeaderList;
    use crate::http::HttpResponse;
    use crate::params::Params;

    struct Unused;

    impl HttpTransport for Unused {
        fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            unreachable!("request builder tests never send")
        }
    }

    fn builder(credentials: Credentials) -> RequestBuilder {
        let resolved = resolve(&DefaultDiscovery, Some(Arc::new(Unused))).unwrap();
        RequestBuilder::new("https://api.example.com/", "postmark-core/test", credentials, &resolved)
    }

    fn server_builder() -> RequestBuilder {
        builder(Credentials::server("server-token"))
    }

    fn body_json(req: &HttpRequest) -> Value {
        serde_json::from_slice(req.body.as_deref().unwrap()).unwrap()
    }

    #[test]
    fn post_encodes_json_body_with_headers() {
        let params = Params::new()
            .set("From", "a@example.com")
            .set("TrackOpens", false)
            .set_opt::<&str>("TrackLinks", None);
        let req = server_builder()
            .build(HttpMethod::Post, "/email", &params.into())
            .unwrap();

        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "https://api.example.com/email");
        assert_eq!(
            req.headers,
            vec![
                ("Accept".to_string(), "application/json".to_string()),
                ("Content-Type".to_string(), "application/json".to_string()),
                ("User-Agent".to_string(), "postmark-core/test".to_string()),
                ("X-Postmark-Server-Token".to_string(), "server-token".to_string()),
            ]
        );
        assert_eq!(body_json(&req), json!({"From": "a@example.com", "TrackOpens": false}));
    }

    #[test]
    fn get_renders_query_and_skips_nulls() {
        let params = Params::new()
            .set("count", 100)
            .set("offset", 0)
            .set("name", Value::Null)
            .set_opt::<&str>("tag", None)
            .set("inactive", true);
        let req = builder(Credentials::account("acct"))
            .build(HttpMethod::Get, "/servers/", &params.into())
            .unwrap();

        assert_eq!(req.url, "https://api.example.com/servers/?count=100&offset=0&inactive=true");
        assert!(req.body.is_none());
        assert_eq!(req.header("content-type"), None);
        assert_eq!(req.header("X-Postmark-Account-Token"), Some("acct"));
        assert_eq!(req.header("X-Postmark-Server-Token"), None);
    }

    #[test]
    fn query_values_are_escaped_and_arrays_repeat() {
        let params = Params::new()
            .set("recipient", "a b&c@example.com")
            .set("status", json!(["sent", "queued"]));
        let req = server_builder()
            .build(HttpMethod::Get, "/messages/outbound", &params.into())
            .unwrap();
        assert_eq!(
            req.url,
            "https://api.example.com/messages/outbound?recipient=a+b%26c%40example.com&status=sent&status=queued"
        );
    }

    #[test]
    fn delete_without_params_has_no_query_or_body() {
        let req = builder(Credentials::account("acct"))
            .build(HttpMethod::Delete, "/servers/42", &Payload::Empty)
            .unwrap();
        assert_eq!(req.url, "https://api.example.com/servers/42");
        assert!(req.body.is_none());
    }

    #[test]
    fn empty_payload_on_body_method_sends_empty_object() {
        let req = builder(Credentials::account("acct"))
            .build(HttpMethod::Post, "/domains/7/verifyspf", &Payload::Empty)
            .unwrap();
        assert_eq!(req.body_str(), Some("{}"));
    }

    #[test]
    fn percent_encoded_path_is_not_double_encoded() {
        let req = server_builder()
            .build(HttpMethod::Get, "/templates/welcome%20email", &Payload::Empty)
            .unwrap();
        assert_eq!(req.url, "https://api.example.com/templates/welcome%20email");
    }

    #[test]
    fn relative_path_is_joined_with_slash() {
        let req = server_builder()
            .build(HttpMethod::Get, "server", &Payload::Empty)
            .unwrap();
        assert_eq!(req.url, "https://api.example.com/server");
    }

    #[test]
    fn batch_is_sent_as_bare_array() {
        let headers: HeaderList = [("X-Id", "1")].into_iter().collect();
        let batch = vec![
            Params::new().set("To", "a@x.io").headers("Headers", headers),
            Params::new().set("To", "b@x.io").set_opt::<bool>("TrackOpens", None),
        ];
        let req = server_builder()
            .build(HttpMethod::Post, "/email/batch", &batch.into())
            .unwrap();
        assert_eq!(
            body_json(&req),
            json!([
                {"To": "a@x.io", "Headers": [{"Name": "X-Id", "Value": "1"}]},
                {"To": "b@x.io"}
            ])
        );
    }

    #[test]
    fn batch_on_get_is_an_encoding_failure() {
        let err = server_builder()
            .build(HttpMethod::Get, "/email", &vec![Params::new()].into())
            .unwrap_err();
        assert!(matches!(err, PostmarkError::RequestEncoding { .. }));
    }

    #[test]
    fn invalid_base_url_is_an_encoding_failure() {
        let resolved = resolve(&DefaultDiscovery, Some(Arc::new(Unused))).unwrap();
        let builder = RequestBuilder::new("not a url", "ua", Credentials::server("t"), &resolved);
        let err = builder.build(HttpMethod::Get, "/server", &Payload::Empty).unwrap_err();
        assert!(matches!(err, PostmarkError::RequestEncoding { .. }));
    }
}
