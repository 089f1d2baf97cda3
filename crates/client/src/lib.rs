//! Shopfront client library.
//!
//! The two state machines a storefront front-end is built on, as explicit
//! service objects the caller constructs and injects:
//!
//! - [`session::Session`] - credential and identity ownership, login/logout,
//!   profile refresh, fed by the [`token::TokenResolver`]
//! - [`guard::RouteGuard`] - navigation gating by authentication and role
//! - [`cart::CartStore`] - cart lines kept in step with the remote cart
//!
//! Remote calls go through the [`api::AuthApi`] and [`api::CartApi`] traits;
//! [`api::HttpBackend`] implements both over `reqwest`. Cart calls are signed
//! by the [`signer::RequestSigner`], which also turns any 401 into a forced
//! logout.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod browser;
pub mod cart;
pub mod config;
pub mod error;
mod finally;
pub mod guard;
pub mod session;
pub mod signer;
pub mod token;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{AuthApi, CartApi, HttpBackend};
pub use cart::{CartError, CartLine, CartState, CartStore};
pub use config::{CartSyncPolicy, ClientConfig, ConfigError};
pub use error::ApiError;
pub use guard::{Navigation, Route, RouteGuard, RouteMeta};
pub use session::{LoginError, Session, SessionError, SessionStatus};
pub use signer::RequestSigner;
pub use token::TokenResolver;
