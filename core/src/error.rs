//! Error taxonomy for the request pipeline.
//!
//! # Design
//! Callers need to tell three situations apart: the request never reached the
//! server (`Discovery`, `RequestEncoding`, `Transport`), the server rejected
//! it (`Client`, `Server`, `UnexpectedStatus`), or the server accepted it but
//! answered with something unusable (`MalformedResponse`). Nothing in the
//! pipeline retries or swallows these; they surface to the immediate caller.

use std::fmt;

use thiserror::Error;

/// Boxed cause carried by discovery and transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which capability the `TransportResolver` failed to discover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Client,
    RequestFactory,
    StreamFactory,
    UriFactory,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Client => "HTTP client",
            Capability::RequestFactory => "request factory",
            Capability::StreamFactory => "stream factory",
            Capability::UriFactory => "URI factory",
        };
        f.write_str(name)
    }
}

/// Failure raised by an `HttpTransport` while executing a request.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(#[source] BoxError),
    #[error("connection failed: {0}")]
    Connection(#[source] BoxError),
    #[error("TLS failure: {0}")]
    Tls(#[source] BoxError),
    #[error("I/O failure: {0}")]
    Io(#[source] BoxError),
    #[error("transport failure: {0}")]
    Other(#[source] BoxError),
}

/// A non-2xx response, with the server's error code and message when the body
/// decoded as a JSON object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpFailure {
    pub status: u16,
    pub error_code: Option<i64>,
    pub message: Option<String>,
    pub body: String,
}

impl HttpFailure {
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    fn canonical_reason(&self) -> Option<&'static str> {
        match self.status {
            401 => Some("unauthorized: missing or incorrect API token"),
            404 => Some("not found"),
            422 => Some("unprocessable entity"),
            500 => Some("internal server error"),
            503 => Some("service unavailable"),
            _ => None,
        }
    }
}

impl fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(code) = self.error_code {
            write!(f, " (error code {code})")?;
        }
        match (&self.message, self.body.trim()) {
            (Some(message), _) => write!(f, ": {message}"),
            (None, "") => match self.canonical_reason() {
                Some(reason) => write!(f, ": {reason}"),
                None => Ok(()),
            },
            (None, body) => write!(f, ": {body}"),
        }
    }
}

/// Every failure the pipeline can surface.
#[derive(Debug, Error)]
pub enum PostmarkError {
    /// A transport or message factory could not be resolved.
    #[error("{capability} discovery failed: {source}")]
    Discovery {
        capability: Capability,
        #[source]
        source: BoxError,
    },

    /// A parameter, URI or body could not be encoded into a request.
    #[error("failed to encode {context}: {source}")]
    RequestEncoding {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server rejected the request (4xx).
    #[error("client error: {0}")]
    Client(HttpFailure),

    /// The server failed to handle the request (5xx).
    #[error("server error: {0}")]
    Server(HttpFailure),

    /// Any other status outside 2xx, 4xx and 5xx.
    #[error("unexpected status: {0}")]
    UnexpectedStatus(HttpFailure),

    /// A 2xx response whose body is not valid JSON.
    #[error("malformed response body (HTTP {status}): {source}")]
    MalformedResponse {
        status: u16,
        body: String,
        #[source]
        source: serde_json::Error,
    },
}

impl PostmarkError {
    pub(crate) fn encoding(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        PostmarkError::RequestEncoding {
            context: context.into(),
            source: source.into(),
        }
    }

    /// The HTTP failure details for `Client`, `Server` and `UnexpectedStatus`.
    pub fn http_failure(&self) -> Option<&HttpFailure> {
        match self {
            PostmarkError::Client(failure)
            | PostmarkError::Server(failure)
            | PostmarkError::UnexpectedStatus(failure) => Some(failure),
            _ => None,
        }
    }

    /// HTTP status code for failures that carry one.
    pub fn status(&self) -> Option<u16> {
        match self {
            PostmarkError::MalformedResponse { status, .. } => Some(*status),
            other => other.http_failure().map(|f| f.status),
        }
    }

    /// Server-defined `ErrorCode`, when the failure body carried one.
    pub fn error_code(&self) -> Option<i64> {
        self.http_failure().and_then(|f| f.error_code)
    }

    /// True when the request never got a response from the server.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            PostmarkError::Discovery { .. }
                | PostmarkError::RequestEncoding { .. }
                | PostmarkError::Transport(_)
        )
    }
}
