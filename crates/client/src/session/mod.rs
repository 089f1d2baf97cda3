//! Session state machine.
//!
//! Owns the credential and the identity it belongs to. Nothing else mutates
//! either; the route guard and the request signer only read.
//!
//! ```text
//!                  login ok
//!  Anonymous ──► Authenticating ──► Authenticated
//!      ▲               │                  │
//!      └── login err ──┘                  │
//!      └────────── logout / 401 ──────────┘
//! ```

mod error;

pub use error::{DEFAULT_LOGIN_ERROR, LoginError, SessionError};

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::instrument;

use shopfront_core::{Credential, Identity, Role};

use crate::api::{AuthApi, LoginCredentials};
use crate::error::{add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::finally::Finally;
use crate::token::{TokenResolver, decode_claims};

/// Observable session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No credential and identity pair is held.
    Anonymous,
    /// A login call is in flight.
    Authenticating,
    /// Both a credential and an identity are held.
    Authenticated,
}

/// Point-in-time view of the session, without the credential itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub identity: Option<Identity>,
    pub has_credential: bool,
    pub loading: bool,
}

impl SessionSnapshot {
    /// Derived: a credential and an identity are both present.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.has_credential && self.identity.is_some()
    }

    /// Role of the current identity.
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.identity.as_ref().map(|identity| identity.role)
    }
}

#[derive(Default)]
struct SessionState {
    credential: Option<Credential>,
    identity: Option<Identity>,
    loading: bool,
}

/// Handle to the session store. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    api: Arc<dyn AuthApi>,
    resolver: TokenResolver,
    state: RwLock<SessionState>,
    login_gate: tokio::sync::Mutex<()>,
    init_gate: tokio::sync::Mutex<()>,
    init_epoch: AtomicU64,
}

impl Session {
    /// Create an anonymous session.
    ///
    /// Call [`Session::init_auth`] to pick up a credential from the
    /// environment.
    #[must_use]
    pub fn new(api: Arc<dyn AuthApi>, resolver: TokenResolver) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                api,
                resolver,
                state: RwLock::new(SessionState::default()),
                login_gate: tokio::sync::Mutex::new(()),
                init_gate: tokio::sync::Mutex::new(()),
                init_epoch: AtomicU64::new(0),
            }),
        }
    }

    // =========================================================================
    // Read accessors
    // =========================================================================

    /// The held credential.
    #[must_use]
    pub fn credential(&self) -> Option<Credential> {
        self.inner.state.read().credential.clone()
    }

    /// The held identity.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.inner.state.read().identity.clone()
    }

    /// Whether both a credential and an identity are held.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        let state = self.inner.state.read();
        state.credential.is_some() && state.identity.is_some()
    }

    /// Whether a login is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.state.read().loading
    }

    /// Observable session state. A pending login wins over everything else.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        let state = self.inner.state.read();
        if state.loading {
            SessionStatus::Authenticating
        } else if state.credential.is_some() && state.identity.is_some() {
            SessionStatus::Authenticated
        } else {
            SessionStatus::Anonymous
        }
    }

    /// Consistent view of the whole session taken under one lock.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.inner.state.read();
        SessionSnapshot {
            identity: state.identity.clone(),
            has_credential: state.credential.is_some(),
            loading: state.loading,
        }
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Log in against a role namespace.
    ///
    /// On success the credential is held and persisted and the identity is
    /// returned. On failure nothing but the loading flag changes.
    ///
    /// # Errors
    ///
    /// Returns `LoginError::InProgress` if another login is pending, or
    /// `LoginError::Rejected` carrying the server's message (or
    /// [`DEFAULT_LOGIN_ERROR`]).
    #[instrument(skip(self, credentials), fields(role = %role))]
    pub async fn login(
        &self,
        credentials: &LoginCredentials,
        role: Role,
    ) -> Result<Identity, LoginError> {
        let Ok(_gate) = self.inner.login_gate.try_lock() else {
            tracing::debug!("Login already in progress");
            return Err(LoginError::InProgress);
        };

        self.inner.state.write().loading = true;
        let _loading = Finally::new(|| self.inner.state.write().loading = false);

        let response = match self.inner.api.login(role, credentials).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Login failed: {e}");
                return Err(LoginError::Rejected {
                    message: e.message_or(DEFAULT_LOGIN_ERROR),
                });
            }
        };

        let Some(credential) = Credential::new(response.token) else {
            tracing::warn!("Login response carried an empty token");
            return Err(LoginError::Rejected {
                message: DEFAULT_LOGIN_ERROR.to_string(),
            });
        };
        let identity = response.user.into_identity(role);

        {
            let mut state = self.inner.state.write();
            state.credential = Some(credential.clone());
            state.identity = Some(identity.clone());
        }
        if let Err(e) = self.inner.resolver.persist(&credential) {
            tracing::error!("Failed to persist credential: {e}");
        }

        set_sentry_user(&identity);
        add_breadcrumb("auth", "Logged in", Some(&[("role", role.as_str())]));
        tracing::info!(user_id = %identity.id, "Login succeeded");

        Ok(identity)
    }

    /// Log out.
    ///
    /// The remote call is best effort. Local state and the persisted
    /// credential are cleared whatever happens, even if this future is
    /// dropped before the remote call returns.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        let credential = self.credential();
        let _clear = Finally::new(|| self.clear_local());

        if let Err(e) = self.inner.api.logout(credential.as_ref()).await {
            tracing::warn!("Remote logout failed: {e}");
        }
    }

    /// Handle a rejected credential. Equivalent to [`Session::logout`].
    pub async fn expire(&self) {
        tracing::info!("Credential rejected, ending session");
        add_breadcrumb("auth", "Session expired", None);
        self.logout().await;
    }

    /// Handle a 401 for a request signed with `rejected`.
    ///
    /// Ends the session only while `rejected` is still the held credential,
    /// so a late rejection of an old credential cannot log out a newer login.
    pub async fn expire_if(&self, rejected: Option<&Credential>) {
        if self.credential().as_ref() != rejected {
            tracing::debug!("Ignoring 401 for a credential no longer held");
            return;
        }
        self.expire().await;
    }

    /// Refresh the identity for the held credential.
    ///
    /// Without a held identity the credential's claims are decoded first and
    /// the decoded role picks the profile endpoint.
    ///
    /// # Errors
    ///
    /// - `SessionError::TokenDecode` if the claims cannot be read; the
    ///   credential is discarded
    /// - `SessionError::Expired` if the server rejects the credential; the
    ///   session is logged out
    /// - `SessionError::Api` for any other failure; state is kept
    #[instrument(skip(self))]
    pub async fn fetch_profile(&self) -> Result<(), SessionError> {
        let (credential, identity) = {
            let state = self.inner.state.read();
            (state.credential.clone(), state.identity.clone())
        };
        let Some(credential) = credential else {
            return Ok(());
        };

        let role = match identity {
            Some(identity) => identity.role,
            None => match decode_claims(&credential) {
                Ok(decoded) => {
                    let role = decoded.role;
                    self.install_identity(&credential, decoded);
                    role
                }
                Err(e) => {
                    tracing::warn!("Discarding undecodable credential: {e}");
                    self.clear_local();
                    return Err(SessionError::TokenDecode(e));
                }
            },
        };

        match self.inner.api.profile(role, &credential).await {
            Ok(profile) => {
                self.install_identity(&credential, profile.into_identity(role));
                Ok(())
            }
            Err(e) if e.is_unauthorized() => {
                self.expire_if(Some(&credential)).await;
                Err(SessionError::Expired)
            }
            Err(e) => {
                tracing::warn!("Failed to fetch profile: {e}");
                Err(SessionError::Api(e))
            }
        }
    }

    /// Pick up a credential from the environment and load its identity.
    ///
    /// Never fails; problems are logged. Concurrent callers wait for the
    /// in-flight initialization and return once it completes instead of
    /// running it again.
    #[instrument(skip(self))]
    pub async fn init_auth(&self) {
        let epoch = self.inner.init_epoch.load(Ordering::Acquire);
        let _gate = self.inner.init_gate.lock().await;
        if self.inner.init_epoch.load(Ordering::Acquire) != epoch {
            tracing::debug!("Joined a completed initialization");
            return;
        }

        match self.inner.resolver.resolve() {
            Ok(Some(credential)) => self.adopt(credential),
            Ok(None) => tracing::debug!("No credential in environment"),
            Err(e) => tracing::warn!("Failed to read stored credential: {e}"),
        }

        if self.credential().is_some() {
            if let Err(e) = self.fetch_profile().await {
                tracing::warn!("Session initialization incomplete: {e}");
            }
        }

        self.inner.init_epoch.fetch_add(1, Ordering::AcqRel);
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Hold a resolved credential. A different credential drops the identity
    /// that belonged to the old one.
    fn adopt(&self, credential: Credential) {
        let mut state = self.inner.state.write();
        if state.credential.as_ref() != Some(&credential) {
            tracing::debug!("Adopting credential from environment");
            state.identity = None;
            state.credential = Some(credential);
        }
    }

    /// Install an identity unless the credential changed while it was fetched.
    fn install_identity(&self, credential: &Credential, identity: Identity) {
        let mut state = self.inner.state.write();
        if state.credential.as_ref() == Some(credential) {
            set_sentry_user(&identity);
            state.identity = Some(identity);
        } else {
            tracing::debug!("Credential changed during profile fetch, dropping result");
        }
    }

    fn clear_local(&self) {
        {
            let mut state = self.inner.state.write();
            state.credential = None;
            state.identity = None;
        }
        if let Err(e) = self.inner.resolver.forget() {
            tracing::error!("Failed to remove persisted credential: {e}");
        }
        clear_sentry_user();
        add_breadcrumb("auth", "Logged out", None);
    }
}
