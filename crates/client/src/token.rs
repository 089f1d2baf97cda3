//! Credential discovery and claims decoding.
//!
//! A credential can arrive three ways, checked highest precedence first:
//!
//! 1. A one-time `?token=` query parameter left by a federated login redirect.
//!    It is stripped from the visible URL and persisted on sight.
//! 2. Durable storage.
//! 3. A readable cookie set by the server.
//!
//! Whichever source wins is written back to durable storage so the next
//! start finds it there.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use shopfront_core::{Credential, Identity, Role, UserId};

use crate::browser::{CookieSource, DurableStorage, Location, StorageError};
use crate::config::TokenSources;

/// Errors decoding the claims embedded in a credential.
#[derive(Debug, Error)]
pub enum TokenDecodeError {
    #[error("credential is not a three-part token")]
    Malformed,
    #[error("claims segment is not base64url: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("claims are not valid: {0}")]
    Claims(#[from] serde_json::Error),
}

/// Claims carried in the payload segment of a credential.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    pub id: UserId,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub role: Role,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    /// Expiry as a Unix timestamp. Informational only, never enforced locally.
    #[serde(default)]
    pub exp: Option<i64>,
    /// Issue time as a Unix timestamp.
    #[serde(default)]
    pub iat: Option<i64>,
}

const fn active_by_default() -> bool {
    true
}

impl TokenClaims {
    /// Parse the claims out of a credential without verifying its signature.
    ///
    /// # Errors
    ///
    /// Returns `TokenDecodeError` if the credential is not a dotted token or
    /// its payload segment is not base64url JSON with the expected claims.
    pub fn parse(credential: &Credential) -> Result<Self, TokenDecodeError> {
        let mut segments = credential.expose().split('.');
        let payload = match (segments.next(), segments.next(), segments.next()) {
            (Some(_), Some(payload), Some(_)) if !payload.is_empty() => payload,
            _ => return Err(TokenDecodeError::Malformed),
        };

        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// When the credential claims to expire.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }

    /// The identity these claims describe.
    #[must_use]
    pub fn into_identity(self) -> Identity {
        Identity {
            id: self.id,
            email: self.email,
            name: self.name,
            role: self.role,
            is_active: self.is_active,
        }
    }
}

/// Decode the identity embedded in a credential.
///
/// # Errors
///
/// Returns `TokenDecodeError` if the claims cannot be read.
pub fn decode_claims(credential: &Credential) -> Result<Identity, TokenDecodeError> {
    TokenClaims::parse(credential).map(TokenClaims::into_identity)
}

/// Finds the current credential across the browser environment.
#[derive(Clone)]
pub struct TokenResolver {
    storage: Arc<dyn DurableStorage>,
    cookies: Arc<dyn CookieSource>,
    location: Arc<dyn Location>,
    sources: TokenSources,
}

impl TokenResolver {
    /// Create a resolver over the given environment.
    #[must_use]
    pub fn new(
        storage: Arc<dyn DurableStorage>,
        cookies: Arc<dyn CookieSource>,
        location: Arc<dyn Location>,
        sources: TokenSources,
    ) -> Self {
        Self {
            storage,
            cookies,
            location,
            sources,
        }
    }

    /// Determine the current credential.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if durable storage cannot be read. Failing to
    /// write the winner back is only logged.
    #[instrument(skip(self))]
    pub fn resolve(&self) -> Result<Option<Credential>, StorageError> {
        let query_param = &self.sources.query_param;
        if let Some(credential) = self.location.query_param(query_param).and_then(Credential::new)
        {
            self.location.strip_query_param(query_param);
            debug!("Credential handed off in navigation URL");
            self.write_back(&credential);
            return Ok(Some(credential));
        }

        let stored = self
            .storage
            .get(&self.sources.storage_key)?
            .and_then(Credential::new);
        if stored.is_some() {
            debug!("Credential found in durable storage");
            return Ok(stored);
        }

        let cookie = self
            .cookies
            .cookie(&self.sources.cookie_name)
            .and_then(Credential::new);
        if let Some(credential) = &cookie {
            debug!("Credential found in cookie");
            self.write_back(credential);
        }
        Ok(cookie)
    }

    /// Persist a credential to durable storage.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if durable storage cannot be written.
    pub fn persist(&self, credential: &Credential) -> Result<(), StorageError> {
        self.storage
            .set(&self.sources.storage_key, credential.expose())
    }

    /// Remove the persisted credential.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if durable storage cannot be written.
    pub fn forget(&self) -> Result<(), StorageError> {
        self.storage.remove(&self.sources.storage_key)
    }

    fn write_back(&self, credential: &Credential) {
        if let Err(err) = self.persist(credential) {
            warn!(error = %err, "Failed to persist resolved credential");
        }
    }
}
