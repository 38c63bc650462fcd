use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const SERVER_TOKEN_HEADER: &str = "x-postmark-server-token";
pub const ACCOUNT_TOKEN_HEADER: &str = "x-postmark-account-token";

/// A request as the mock saw it, kept so tests can assert on the wire shape.
#[derive(Clone, Debug)]
pub struct Received {
    pub method: String,
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Received {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Clone, Default)]
pub struct MockState {
    received: Arc<RwLock<Vec<Received>>>,
    servers: Arc<RwLock<HashMap<u64, Map<String, Value>>>>,
}

impl MockState {
    /// State seeded with a single server, ID 1.
    pub fn new() -> Self {
        let mut server = Map::new();
        server.insert("ID".into(), json!(1));
        server.insert("Name".into(), json!("Production"));
        server.insert("Color".into(), json!("red"));
        server.insert("TrackOpens".into(), json!(false));
        server.insert("InboundHookUrl".into(), json!(""));
        Self {
            received: Arc::default(),
            servers: Arc::new(RwLock::new(HashMap::from([(1, server)]))),
        }
    }

    pub async fn received(&self) -> Vec<Received> {
        self.received.read().await.clone()
    }

    pub async fn last_received(&self) -> Option<Received> {
        self.received.read().await.last().cloned()
    }

    async fn record(&self, method: &Method, uri: &Uri, headers: &HeaderMap, body: Option<Value>) {
        let headers = headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        self.received.write().await.push(Received {
            method: method.to_string(),
            uri: uri.to_string(),
            headers,
            body,
        });
    }
}

pub fn app() -> Router {
    app_with_state(MockState::new())
}

pub fn app_with_state(state: MockState) -> Router {
    Router::new()
        .route("/email", post(send_email))
        .route("/email/batch", post(send_batch))
        .route("/email/batchWithTemplates", post(send_batch_with_templates))
        .route("/server", get(get_server).put(edit_server))
        .route("/servers", get(list_servers))
        .route("/servers/", get(list_servers))
        .route("/servers/{id}", delete(delete_server))
        .route("/outage", get(outage))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, MockState::new()).await
}

pub async fn run_with_state(listener: TcpListener, state: MockState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

fn api_error(status: StatusCode, code: i64, message: &str) -> Response {
    (status, Json(json!({"ErrorCode": code, "Message": message}))).into_response()
}

fn unauthorized() -> Response {
    api_error(
        StatusCode::UNAUTHORIZED,
        10,
        "No Account or Server API tokens were supplied in the HTTP headers.",
    )
}

fn has_token(headers: &HeaderMap, name: &str) -> bool {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| !v.is_empty())
}

/// Validate one outbound message and produce its send result.
fn accept_message(message: &Value) -> Result<Value, Response> {
    let Some(fields) = message.as_object() else {
        return Err(api_error(StatusCode::UNPROCESSABLE_ENTITY, 402, "Invalid JSON"));
    };
    if !fields.get("From").is_some_and(Value::is_string) {
        return Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            300,
            "Invalid email request: no 'From' address.",
        ));
    }
    if let Some(headers) = fields.get("Headers") {
        let well_formed = headers.as_array().is_some_and(|items| {
            items
                .iter()
                .all(|h| h.get("Name").is_some_and(Value::is_string) && h.get("Value").is_some())
        });
        if !well_formed {
            return Err(api_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                300,
                "Invalid email request: Headers must be a list of Name/Value pairs.",
            ));
        }
    }
    Ok(json!({
        "To": fields.get("To").cloned().unwrap_or(Value::Null),
        "SubmittedAt": "2024-01-01T00:00:00.0000000-05:00",
        "MessageID": Uuid::new_v4(),
        "ErrorCode": 0,
        "Message": "OK"
    }))
}

async fn send_email(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record(&method, &uri, &headers, Some(body.clone())).await;
    if !has_token(&headers, SERVER_TOKEN_HEADER) {
        return unauthorized();
    }
    match accept_message(&body) {
        Ok(result) => Json(result).into_response(),
        Err(rejection) => rejection,
    }
}

async fn send_batch(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record(&method, &uri, &headers, Some(body.clone())).await;
    if !has_token(&headers, SERVER_TOKEN_HEADER) {
        return unauthorized();
    }
    let Some(messages) = body.as_array() else {
        return api_error(StatusCode::UNPROCESSABLE_ENTITY, 402, "Batch must be a JSON array.");
    };
    Json(batch_results(messages)).into_response()
}

async fn send_batch_with_templates(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record(&method, &uri, &headers, Some(body.clone())).await;
    if !has_token(&headers, SERVER_TOKEN_HEADER) {
        return unauthorized();
    }
    let Some(messages) = body.get("Messages").and_then(Value::as_array) else {
        return api_error(StatusCode::UNPROCESSABLE_ENTITY, 402, "Messages must be a JSON array.");
    };
    Json(batch_results(messages)).into_response()
}

/// Per-message results; rejected messages report their error inline.
fn batch_results(messages: &[Value]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| match accept_message(message) {
            Ok(result) => result,
            Err(_) => json!({"ErrorCode": 300, "Message": "Invalid email request"}),
        })
        .collect()
}

async fn get_server(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    state.record(&method, &uri, &headers, None).await;
    if !has_token(&headers, SERVER_TOKEN_HEADER) {
        return unauthorized();
    }
    match state.servers.read().await.get(&1) {
        Some(server) => Json(server.clone()).into_response(),
        None => api_error(StatusCode::UNPROCESSABLE_ENTITY, 600, "Server not found."),
    }
}

async fn edit_server(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record(&method, &uri, &headers, Some(body.clone())).await;
    if !has_token(&headers, SERVER_TOKEN_HEADER) {
        return unauthorized();
    }
    let Some(changes) = body.as_object() else {
        return api_error(StatusCode::UNPROCESSABLE_ENTITY, 402, "Invalid JSON");
    };
    let mut servers = state.servers.write().await;
    let Some(server) = servers.get_mut(&1) else {
        return api_error(StatusCode::UNPROCESSABLE_ENTITY, 600, "Server not found.");
    };
    for (key, value) in changes {
        server.insert(key.clone(), value.clone());
    }
    Json(server.clone()).into_response()
}

async fn list_servers(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.record(&method, &uri, &headers, None).await;
    if !has_token(&headers, ACCOUNT_TOKEN_HEADER) {
        return unauthorized();
    }
    let count: usize = query.get("count").and_then(|c| c.parse().ok()).unwrap_or(100);
    let offset: usize = query.get("offset").and_then(|o| o.parse().ok()).unwrap_or(0);
    let name = query.get("name");

    let servers = state.servers.read().await;
    let mut matching: Vec<&Map<String, Value>> = servers
        .values()
        .filter(|s| match name {
            Some(name) => s.get("Name").and_then(Value::as_str) == Some(name.as_str()),
            None => true,
        })
        .collect();
    matching.sort_by_key(|s| s.get("ID").and_then(Value::as_u64));
    let page: Vec<&Map<String, Value>> = matching.iter().skip(offset).take(count).copied().collect();
    Json(json!({"TotalCount": matching.len(), "Servers": page})).into_response()
}

async fn delete_server(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response {
    state.record(&method, &uri, &headers, None).await;
    if !has_token(&headers, ACCOUNT_TOKEN_HEADER) {
        return unauthorized();
    }
    match state.servers.write().await.remove(&id) {
        Some(_) => Json(json!({"ErrorCode": 0, "Message": format!("Server {id} removed.")})).into_response(),
        None => api_error(StatusCode::UNPROCESSABLE_ENTITY, 600, "Server not found."),
    }
}

/// Always fails with a plain-text 503, like an upstream load balancer would.
async fn outage(State(state): State<MockState>, method: Method, uri: Uri, headers: HeaderMap) -> Response {
    state.record(&method, &uri, &headers, None).await;
    (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_without_from_is_rejected() {
        let err = accept_message(&json!({"To": "a@example.com"})).unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn message_with_bare_header_object_is_rejected() {
        let message = json!({"From": "s@example.com", "Headers": {"X-Foo": "bar"}});
        assert!(accept_message(&message).is_err());
    }

    #[test]
    fn well_formed_message_is_accepted() {
        let message = json!({
            "From": "s@example.com",
            "To": "r@example.com",
            "Headers": [{"Name": "X-Foo", "Value": null}]
        });
        let result = accept_message(&message).unwrap();
        assert_eq!(result["To"], "r@example.com");
        assert_eq!(result["ErrorCode"], 0);
        assert!(result["MessageID"].is_string());
    }

    #[test]
    fn batch_results_report_failures_inline() {
        let results = batch_results(&[json!({"From": "s@example.com"}), json!({"To": "x"})]);
        assert_eq!(results[0]["ErrorCode"], 0);
        assert_eq!(results[1]["ErrorCode"], 300);
    }

    #[test]
    fn new_state_is_seeded_with_one_server() {
        let state = MockState::new();
        let servers = state.servers.try_read().unwrap();
        assert_eq!(servers.get(&1).unwrap()["Name"], "Production");
    }
}
