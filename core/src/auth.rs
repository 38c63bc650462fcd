//! API token credentials.
//!
//! A client holds exactly one token, sent under the header that matches its
//! scope: server tokens for sending and per-server resources, account tokens
//! for administering servers, domains and sender signatures.

use std::fmt;

pub const SERVER_TOKEN_HEADER: &str = "X-Postmark-Server-Token";
pub const ACCOUNT_TOKEN_HEADER: &str = "X-Postmark-Account-Token";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialScope {
    Account,
    Server,
}

impl CredentialScope {
    pub fn header_name(self) -> &'static str {
        match self {
            CredentialScope::Account => ACCOUNT_TOKEN_HEADER,
            CredentialScope::Server => SERVER_TOKEN_HEADER,
        }
    }
}

/// An opaque token bound to its scope. Immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    scope: CredentialScope,
    token: String,
}

impl Credentials {
    pub fn server(token: impl Into<String>) -> Self {
        Self {
            scope: CredentialScope::Server,
            token: token.into(),
        }
    }

    pub fn account(token: impl Into<String>) -> Self {
        Self {
            scope: CredentialScope::Account,
            token: token.into(),
        }
    }

    pub fn scope(&self) -> CredentialScope {
        self.scope
    }

    pub fn header_name(&self) -> &'static str {
        self.scope.header_name()
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("scope", &self.scope)
            .field("token", &"<redacted>")
            .finish()
    }
}
