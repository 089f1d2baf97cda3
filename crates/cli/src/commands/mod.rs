//! Command implementations.
//!
//! Every command builds the same [`Context`]: the stores wired to the HTTP
//! backend, file-backed durable storage, the cookies given on the command
//! line and a navigation URL.

pub mod auth;
pub mod cart;

use std::sync::Arc;

use thiserror::Error;

use shopfront_client::browser::{CookieJar, FileStorage, NavigationUrl};
use shopfront_client::{
    ApiError, CartError, CartStore, ClientConfig, HttpBackend, LoginError, RequestSigner,
    RouteGuard, Session, TokenResolver,
};

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid navigation URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Failed to create HTTP client: {0}")]
    Client(#[from] ApiError),

    #[error("Login failed: {0}")]
    Login(#[from] LoginError),

    #[error("{0}")]
    Cart(#[from] CartError),
}

/// Stores wired to the real environment.
pub struct Context {
    pub session: Session,
    pub guard: RouteGuard,
    pub cart: CartStore,
    pub location: Arc<NavigationUrl>,
}

impl Context {
    /// Build the stores from configuration.
    ///
    /// # Errors
    ///
    /// Returns `CliError` if the navigation URL is invalid or the HTTP client
    /// cannot be created.
    pub fn new(
        config: ClientConfig,
        href: Option<&str>,
        cookie: Option<&str>,
    ) -> Result<Self, CliError> {
        let location = Arc::new(match href {
            Some(href) => NavigationUrl::parse(href)?,
            None => NavigationUrl::new(config.api_url.clone()),
        });
        let cookies = Arc::new(cookie.map_or_else(CookieJar::empty, CookieJar::parse));
        let storage = Arc::new(FileStorage::new(&config.storage_path));

        let backend = Arc::new(HttpBackend::new(&config)?);
        let resolver = TokenResolver::new(storage, cookies, location.clone(), config.tokens);
        let session = Session::new(backend.clone(), resolver);

        tracing::debug!(api_url = %config.api_url, "Client configured");

        Ok(Self {
            guard: RouteGuard::new(session.clone(), config.default_route),
            cart: CartStore::new(
                backend,
                RequestSigner::new(session.clone()),
                config.cart_sync,
            ),
            session,
            location,
        })
    }
}
