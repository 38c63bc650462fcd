//! The shared request pipeline behind every resource method.
//!
//! # Design
//! `PostmarkClient` resolves its transport and message factories once, in
//! `ClientBuilder::build`, and keeps them behind an `Arc` so clones share the
//! same resolved capabilities. Each call is independent:
//! `build_request` → transport `send` → `parse_response`. No state crosses
//! calls and nothing is retried.
//!
//! `build_request` and `parse_response` are public on their own, so a caller
//! that wants to drive the HTTP round-trip itself can do so.

use std::sync::Arc;

use tracing::debug;

use crate::auth::Credentials;
use crate::discovery::{self, DefaultDiscovery, Discovery, HttpTransport, ResolvedTransport};
use crate::error::PostmarkError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::params::Payload;
use crate::record::DynamicRecord;
use crate::request::RequestBuilder;
use crate::response;

pub const DEFAULT_BASE_URL: &str = "https://api.postmarkapp.com";

/// Default `User-Agent`: crate name and version.
pub fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone)]
pub struct PostmarkClient {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    resolved: ResolvedTransport,
    requests: RequestBuilder,
}

impl PostmarkClient {
    /// Client for `credentials` against the default base URL, using the
    /// default discovery strategy.
    pub fn new(credentials: Credentials) -> Result<Self, PostmarkError> {
        Self::builder(credentials).build()
    }

    pub fn builder(credentials: Credentials) -> ClientBuilder {
        ClientBuilder::new(credentials)
    }

    pub fn base_url(&self) -> &str {
        self.inner.requests.base_url()
    }

    pub fn credentials(&self) -> &Credentials {
        self.inner.requests.credentials()
    }

    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        payload: impl Into<Payload>,
    ) -> Result<HttpRequest, PostmarkError> {
        self.inner.requests.build(method, path, &payload.into())
    }

    pub fn parse_response(&self, response: HttpResponse) -> Result<DynamicRecord, PostmarkError> {
        response::parse_response(response)
    }

    /// Build, send and parse one request.
    pub fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        payload: impl Into<Payload>,
    ) -> Result<DynamicRecord, PostmarkError> {
        let request = self.build_request(method, path, payload)?;
        debug!(%method, url = %request.url, "sending request");
        let response = self.inner.resolved.client.send(request)?;
        self.parse_response(response)
    }

    pub fn get(&self, path: &str, payload: impl Into<Payload>) -> Result<DynamicRecord, PostmarkError> {
        self.execute(HttpMethod::Get, path, payload)
    }

    pub fn post(&self, path: &str, payload: impl Into<Payload>) -> Result<DynamicRecord, PostmarkError> {
        self.execute(HttpMethod::Post, path, payload)
    }

    pub fn put(&self, path: &str, payload: impl Into<Payload>) -> Result<DynamicRecord, PostmarkError> {
        self.execute(HttpMethod::Put, path, payload)
    }

    pub fn delete(&self, path: &str, payload: impl Into<Payload>) -> Result<DynamicRecord, PostmarkError> {
        self.execute(HttpMethod::Delete, path, payload)
    }
}

/// Configures and resolves a `PostmarkClient`.
pub struct ClientBuilder {
    credentials: Credentials,
    base_url: String,
    user_agent: String,
    transport: Option<Arc<dyn HttpTransport>>,
    discovery: Arc<dyn Discovery>,
}

impl ClientBuilder {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: default_user_agent(),
            transport: None,
            discovery: Arc::new(DefaultDiscovery),
        }
    }

    /// Trailing slashes are stripped.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Use this transport unconditionally; client discovery is skipped.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn discovery(mut self, discovery: Arc<dyn Discovery>) -> Self {
        self.discovery = discovery;
        self
    }

    pub fn build(self) -> Result<PostmarkClient, PostmarkError> {
        let resolved = discovery::resolve(self.discovery.as_ref(), self.transport)?;
        let requests = RequestBuilder::new(&self.base_url, self.user_agent, self.credentials, &resolved);
        Ok(PostmarkClient {
            inner: Arc::new(Inner { resolved, requests }),
        })
    }
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("credentials", &self.credentials)
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .field("transport", &self.transport.is_some())
            .finish_non_exhaustive()
    }
}
