//! Blocking `HttpTransport` backed by `ureq`.
//!
//! Failure statuses are returned as data (`http_status_as_error(false)`) so
//! the response parser, not the transport, decides what a 4xx or 5xx means.
//! Timeouts, TLS and proxy settings belong to the `ureq::Agent`; pass a
//! configured one to `UreqTransport::with_agent` to change them.

use std::io::ErrorKind;

use tracing::trace;
use ureq::Agent;

use crate::discovery::HttpTransport;
use crate::error::{BoxError, TransportError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self::with_agent(agent)
    }

    /// Use a caller-configured agent. It should be built with
    /// `http_status_as_error(false)`, otherwise failure statuses surface as
    /// transport errors instead of typed HTTP failures.
    pub fn with_agent(agent: Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport for UreqTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;
        trace!(%method, %url, "ureq dispatch");

        let result = match method {
            HttpMethod::Get => with_headers(self.agent.get(&url), &headers).call(),
            HttpMethod::Delete => with_headers(self.agent.delete(&url), &headers).call(),
            HttpMethod::Post => {
                let builder = with_headers(self.agent.post(&url), &headers);
                match body {
                    Some(body) => builder.send(&body[..]),
                    None => builder.send_empty(),
                }
            }
            HttpMethod::Put => {
                let builder = with_headers(self.agent.put(&url), &headers);
                match body {
                    Some(body) => builder.send(&body[..]),
                    None => builder.send_empty(),
                }
            }
        };
        let mut response = result.map_err(classify)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let bytes = response.body_mut().read_to_vec().map_err(classify)?;

        Ok(HttpResponse {
            status,
            headers,
            body: bytes,
        })
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn classify(err: ureq::Error) -> TransportError {
    let wrap: fn(BoxError) -> TransportError = match &err {
        ureq::Error::Timeout(_) => TransportError::Timeout,
        ureq::Error::HostNotFound | ureq::Error::ConnectionFailed => TransportError::Connection,
        ureq::Error::Tls(_) => TransportError::Tls,
        ureq::Error::Io(io) => match io.kind() {
            ErrorKind::TimedOut => TransportError::Timeout,
            ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::AddrNotAvailable => TransportError::Connection,
            _ => TransportError::Io,
        },
        _ => TransportError::Other,
    };
    wrap(Box::new(err))
}
