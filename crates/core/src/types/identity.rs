//! Authenticated user identity.

use serde::{Deserialize, Serialize};

use crate::{Role, UserId};

/// The profile of the logged-in user.
///
/// Built either from a profile response or from the claims embedded in the
/// credential. The route guard trusts `role`, so an identity always carries
/// exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Remote user ID.
    pub id: UserId,
    /// Email address, empty when the source omitted it.
    #[serde(default)]
    pub email: String,
    /// Display name, empty when the source omitted it.
    #[serde(default)]
    pub name: String,
    /// The role namespace this identity belongs to.
    pub role: Role,
    /// Whether the account is enabled.
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

const fn active_by_default() -> bool {
    true
}

impl Identity {
    /// Create an active identity with the given id and role.
    #[must_use]
    pub const fn new(id: UserId, role: Role) -> Self {
        Self {
            id,
            email: String::new(),
            name: String::new(),
            role,
            is_active: true,
        }
    }

    /// Set the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_payload_fills_defaults() {
        let identity: Identity =
            serde_json::from_str(r#"{"id": 1, "role": "customer"}"#).unwrap();
        assert_eq!(identity, Identity::new(UserId::new(1), Role::Customer));
        assert!(identity.is_active);
    }

    #[test]
    fn test_full_payload() {
        let identity: Identity = serde_json::from_str(
            r#"{"id": 9, "email": "m@shop.test", "name": "Mia", "role": "merchant", "is_active": false}"#,
        )
        .unwrap();
        assert_eq!(identity.email, "m@shop.test");
        assert_eq!(identity.name, "Mia");
        assert_eq!(identity.role, Role::Merchant);
        assert!(!identity.is_active);
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let result = serde_json::from_str::<Identity>(r#"{"id": 1, "role": "owner"}"#);
        assert!(result.is_err());
    }
}
