//! Core types for Shopfront.
//!
//! This module provides type-safe wrappers for the session and cart domain.

pub mod credential;
pub mod id;
pub mod identity;
pub mod price;
pub mod role;

pub use credential::Credential;
pub use id::*;
pub use identity::Identity;
pub use price::Price;
pub use role::{Role, RoleParseError};
