use thiserror::Error;

use crate::error::ApiError;
use crate::token::TokenDecodeError;

/// Message used when a failed login carries no server message.
pub const DEFAULT_LOGIN_ERROR: &str = "Login failed";

/// Errors returned by [`Session::login`](super::Session::login).
#[derive(Debug, Clone, Error)]
pub enum LoginError {
    /// The server refused the login, or could not be reached.
    #[error("{message}")]
    Rejected {
        /// User-facing message from the server, or a default.
        message: String,
    },

    /// Another login is still pending.
    #[error("a login is already in progress")]
    InProgress,
}

/// Errors returned while refreshing the session identity.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The server rejected the credential; the session has been logged out.
    #[error("session expired")]
    Expired,

    /// The credential's embedded claims could not be read; it was discarded.
    #[error("failed to decode credential: {0}")]
    TokenDecode(#[from] TokenDecodeError),

    /// The profile request failed for another reason.
    #[error(transparent)]
    Api(#[from] ApiError),
}
