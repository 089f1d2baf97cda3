//! Attaches the session credential to outgoing calls.
//!
//! Also the single place a rejected credential is noticed: any call that
//! comes back `401` ends the session before the error reaches the caller.

use std::future::Future;

use shopfront_core::Credential;

use crate::error::ApiError;
use crate::session::Session;

/// Signs remote calls with the current session credential.
#[derive(Clone)]
pub struct RequestSigner {
    session: Session,
}

impl RequestSigner {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }

    /// The session whose credential is attached.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Run `request` with the credential held at call time.
    ///
    /// # Errors
    ///
    /// Returns whatever `request` fails with. An `ApiError::Unauthorized`
    /// expires the session first, unless it has moved on to another
    /// credential in the meantime.
    pub async fn call<T, F, Fut>(&self, request: F) -> Result<T, ApiError>
    where
        F: FnOnce(Option<Credential>) -> Fut + Send,
        Fut: Future<Output = Result<T, ApiError>> + Send,
        T: Send,
    {
        let credential = self.session.credential();
        let result = request(credential.clone()).await;
        if matches!(&result, Err(err) if err.is_unauthorized()) {
            tracing::warn!("Request rejected with 401, expiring session");
            self.session.expire_if(credential.as_ref()).await;
        }
        result
    }
}
