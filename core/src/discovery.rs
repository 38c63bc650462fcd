//! Resolution of the HTTP transport and the message factories.
//!
//! # Design
//! A client needs four capabilities: a transport that executes requests and
//! three factories that construct URIs, requests and request bodies. An
//! injected transport always wins. Everything else is looked up through a
//! `Discovery` strategy, and each capability is resolved independently: a
//! failure for any one of them is fatal and reported with the capability's
//! name. Resolution happens once, when the client is built.

use std::sync::Arc;

use tracing::trace;
use url::Url;

use crate::error::{BoxError, Capability, PostmarkError, TransportError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one request. Implementations must be safe to share across
/// threads; the pipeline adds no locking of its own.
pub trait HttpTransport: Send + Sync {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Produces a bare request for a method and absolute URI.
pub trait RequestFactory: Send + Sync {
    fn create_request(&self, method: HttpMethod, uri: &Url) -> HttpRequest;
}

/// Turns encoded body text into the bytes sent on the wire.
pub trait StreamFactory: Send + Sync {
    fn create_stream(&self, content: String) -> Vec<u8>;
}

/// Parses an absolute URI string.
pub trait UriFactory: Send + Sync {
    fn create_uri(&self, uri: &str) -> Result<Url, url::ParseError>;
}

/// Strategy used to find each capability when it is not injected.
pub trait Discovery: Send + Sync {
    fn find_client(&self) -> Result<Arc<dyn HttpTransport>, BoxError>;
    fn find_request_factory(&self) -> Result<Arc<dyn RequestFactory>, BoxError>;
    fn find_stream_factory(&self) -> Result<Arc<dyn StreamFactory>, BoxError>;
    fn find_uri_factory(&self) -> Result<Arc<dyn UriFactory>, BoxError>;
}

/// Factories backed by the `url` crate and plain byte buffers.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFactory;

impl RequestFactory for StandardFactory {
    fn create_request(&self, method: HttpMethod, uri: &Url) -> HttpRequest {
        HttpRequest {
            method,
            url: uri.to_string(),
            headers: Vec::new(),
            body: None,
        }
    }
}

impl StreamFactory for StandardFactory {
    fn create_stream(&self, content: String) -> Vec<u8> {
        content.into_bytes()
    }
}

impl UriFactory for StandardFactory {
    fn create_uri(&self, uri: &str) -> Result<Url, url::ParseError> {
        Url::parse(uri)
    }
}

/// The built-in strategy: `StandardFactory` for the factories and, when the
/// `ureq` feature is enabled, `UreqTransport` for the client.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDiscovery;

impl Discovery for DefaultDiscovery {
    #[cfg(feature = "ureq")]
    fn find_client(&self) -> Result<Arc<dyn HttpTransport>, BoxError> {
        Ok(Arc::new(crate::transport::UreqTransport::new()))
    }

    #[cfg(not(feature = "ureq"))]
    fn find_client(&self) -> Result<Arc<dyn HttpTransport>, BoxError> {
        Err("no HTTP transport is compiled in; enable the `ureq` feature or inject a transport".into())
    }

    fn find_request_factory(&self) -> Result<Arc<dyn RequestFactory>, BoxError> {
        Ok(Arc::new(StandardFactory))
    }

    fn find_stream_factory(&self) -> Result<Arc<dyn StreamFactory>, BoxError> {
        Ok(Arc::new(StandardFactory))
    }

    fn find_uri_factory(&self) -> Result<Arc<dyn UriFactory>, BoxError> {
        Ok(Arc::new(StandardFactory))
    }
}

/// The four resolved capabilities, cached for the lifetime of a client.
#[derive(Clone)]
pub struct ResolvedTransport {
    pub client: Arc<dyn HttpTransport>,
    pub request_factory: Arc<dyn RequestFactory>,
    pub stream_factory: Arc<dyn StreamFactory>,
    pub uri_factory: Arc<dyn UriFactory>,
}

impl std::fmt::Debug for ResolvedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedTransport").finish_non_exhaustive()
    }
}

/// Resolve every capability, preferring `override_client` for the transport.
pub fn resolve(
    discovery: &dyn Discovery,
    override_client: Option<Arc<dyn HttpTransport>>,
) -> Result<ResolvedTransport, PostmarkError> {
    let client = match override_client {
        Some(client) => {
            trace!("using injected HTTP transport");
            client
        }
        None => discovery.find_client().map_err(discovery_failed(Capability::Client))?,
    };
    let request_factory = discovery
        .find_request_factory()
        .map_err(discovery_failed(Capability::RequestFactory))?;
    let stream_factory = discovery
        .find_stream_factory()
        .map_err(discovery_failed(Capability::StreamFactory))?;
    let uri_factory = discovery
        .find_uri_factory()
        .map_err(discovery_failed(Capability::UriFactory))?;
    trace!("resolved transport and message factories");

    Ok(ResolvedTransport {
        client,
        request_factory,
        stream_factory,
        uri_factory,
    })
}

fn discovery_failed(capability: Capability) -> impl FnOnce(BoxError) -> PostmarkError {
    move |source| PostmarkError::Discovery { capability, source }
}
