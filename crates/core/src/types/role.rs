//! User roles.
//!
//! Each role is a separate namespace on the remote API: login and profile
//! endpoints live under `/{role}/...`, and so do the login pages the route
//! guard redirects to.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when parsing an unknown role name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid role: {0} (expected customer, merchant or admin)")]
pub struct RoleParseError(pub String);

/// The class of user an identity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Shopper with a cart.
    Customer,
    /// Seller managing products.
    Merchant,
    /// Platform administrator.
    Admin,
}

impl Role {
    /// All roles, in namespace order.
    pub const ALL: [Self; 3] = [Self::Customer, Self::Merchant, Self::Admin];

    /// The path segment naming this role's API namespace.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Merchant => "merchant",
            Self::Admin => "admin",
        }
    }

    /// Path of this role's login endpoint and login page.
    #[must_use]
    pub fn login_path(self) -> String {
        format!("/{}/login", self.as_str())
    }

    /// Path of this role's profile endpoint.
    #[must_use]
    pub fn profile_path(self) -> String {
        format!("/{}/profile", self.as_str())
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "merchant" => Ok(Self::Merchant),
            "admin" => Ok(Self::Admin),
            _ => Err(RoleParseError(s.to_string())),
        }
    }
}
