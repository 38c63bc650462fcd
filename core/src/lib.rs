//! Request pipeline and dynamic response model for the Postmark REST API.
//!
//! # Overview
//! Every API call has the same shape: assemble a parameter set, send one
//! JSON request, and get back either a `DynamicRecord` or a typed
//! `PostmarkError`. This crate is that shared pipeline; resource methods
//! ("send email", "edit server", ...) are thin call sites on top of it.
//!
//! ```no_run
//! use postmark_core::{Credentials, Params, PostmarkClient};
//!
//! # fn main() -> Result<(), postmark_core::PostmarkError> {
//! let client = PostmarkClient::new(Credentials::server("server-token"))?;
//! let sent = client.post(
//!     "/email",
//!     Params::new()
//!         .set("From", "sender@example.com")
//!         .set("To", "receiver@example.com")
//!         .set("Subject", "Hello")
//!         .set("TrackOpens", false)
//!         .set_opt::<&str>("TrackLinks", None),
//! )?;
//! println!("{}", sent["message_id"]);
//! # Ok(())
//! # }
//! ```
//!
//! # Design
//! - `Params` tracks "unset" separately from falsy values; only unset fields
//!   are left off the wire.
//! - The transport and message factories are resolved once per client
//!   (`discovery`), either injected or found through a `Discovery` strategy.
//! - `DynamicRecord` answers reads and writes regardless of key casing or
//!   underscores while keeping the server payload verbatim.
//! - There is no retry, caching or timeout policy here; those belong to the
//!   underlying HTTP client.

pub mod auth;
pub mod client;
pub mod codec;
pub mod discovery;
pub mod error;
pub mod header;
pub mod http;
pub mod params;
pub mod record;
pub mod request;
pub mod response;
#[cfg(feature = "ureq")]
pub mod transport;

pub use auth::{CredentialScope, Credentials};
pub use client::{ClientBuilder, PostmarkClient};
pub use discovery::{DefaultDiscovery, Discovery, HttpTransport};
pub use error::{Capability, HttpFailure, PostmarkError, TransportError};
pub use header::{Header, HeaderList};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use params::{Field, Params, Payload};
pub use record::DynamicRecord;
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
