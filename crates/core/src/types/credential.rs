//! Bearer credential type.
//!
//! The credential is the opaque token the remote API issues at login. Its
//! expiry is never tracked locally: a rejected request is the only signal.

use secrecy::{ExposeSecret, SecretString};

/// Opaque bearer token proving identity to the remote API.
///
/// `Debug` output is redacted so credentials never reach logs. Two
/// credentials are equal when their token strings are equal.
#[derive(Clone)]
pub struct Credential(SecretString);

impl Credential {
    /// Wrap a token string, rejecting blank values.
    ///
    /// Storage, cookies and query strings report a missing token as an empty
    /// string often enough that blank input is treated as "no credential".
    #[must_use]
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return None;
        }
        Some(Self(SecretString::from(token)))
    }

    /// Expose the raw token, e.g. to build an `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Format as an `Authorization` header value.
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.expose())
    }
}

impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for Credential {}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}
