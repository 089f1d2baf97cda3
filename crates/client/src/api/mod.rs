//! Remote storefront API.
//!
//! # Architecture
//!
//! - [`AuthApi`] and [`CartApi`] are the seams the stores talk through
//! - [`HttpBackend`] implements both over `reqwest`
//! - Only the request/response shapes the state machines consume are modeled
//!
//! # Endpoints
//!
//! ## Auth
//! - `POST /{role}/login` - one login route per role namespace
//! - `POST /logout`
//! - `GET /{role}/profile`
//!
//! ## Cart
//! - `GET /api/cart`, `DELETE /api/cart`
//! - `POST /api/cart/items`, `PUT|DELETE /api/cart/items/{productId}`
//! - `GET /api/cart/summary`, `GET /api/cart/count`

mod http;

pub use http::{HttpBackend, REQUEST_ID_HEADER};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer, ser::SerializeStruct};

use shopfront_core::{Credential, Identity, Price, ProductId, Role, UserId};

use crate::cart::CartLine;
use crate::error::ApiError;

// =============================================================================
// Auth shapes
// =============================================================================

/// Login form contents.
///
/// Field validation is left to the server.
#[derive(Clone)]
pub struct LoginCredentials {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: SecretString,
}

impl LoginCredentials {
    /// Build credentials from an email and password.
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: SecretString::from(password.into()),
        }
    }
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl Serialize for LoginCredentials {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("LoginCredentials", 2)?;
        state.serialize_field("email", &self.email)?;
        state.serialize_field("password", self.password.expose_secret())?;
        state.end()
    }
}

/// A user as returned by the login and profile endpoints.
///
/// `role` is optional on the wire; the namespace the request targeted fills
/// it in.
#[derive(Debug, Clone, Deserialize)]
pub struct UserPayload {
    /// Remote user ID.
    pub id: UserId,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

const fn active_by_default() -> bool {
    true
}

impl UserPayload {
    /// Convert into an identity, using `namespace` when no role was sent.
    #[must_use]
    pub fn into_identity(self, namespace: Role) -> Identity {
        Identity {
            id: self.id,
            email: self.email,
            name: self.name,
            role: self.role.unwrap_or(namespace),
            is_active: self.is_active,
        }
    }
}

/// Successful login response.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    /// The issued bearer token.
    pub token: String,
    /// The logged-in user.
    pub user: UserPayload,
}

// =============================================================================
// Cart shapes
// =============================================================================

/// Full cart representation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CartResponse {
    /// Cart lines; the server omits the field for an empty cart.
    #[serde(default)]
    pub items: Option<Vec<CartLine>>,
}

impl CartResponse {
    /// The lines, empty when the server omitted them.
    #[must_use]
    pub fn into_lines(self) -> Vec<CartLine> {
        self.items.unwrap_or_default()
    }
}

/// Body of `POST /api/cart/items`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Body of `PUT /api/cart/items/{productId}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpdateItemRequest {
    pub quantity: u32,
}

/// Acknowledgement returned by cart mutations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CartAck {
    /// Human-readable confirmation.
    #[serde(default)]
    pub message: Option<String>,
    /// Server-side item count after the mutation.
    #[serde(default)]
    pub item_count: Option<u32>,
}

/// Response of `GET /api/cart/summary`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CartSummary {
    #[serde(default)]
    pub item_count: u32,
    #[serde(default)]
    pub total_price: Price,
    #[serde(default)]
    pub items: Option<Vec<CartLine>>,
    /// Problems the server found with the cart (stock, availability).
    #[serde(default)]
    pub validation_errors: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub has_errors: bool,
}

/// Response of `GET /api/cart/count`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ItemCount {
    pub item_count: u32,
}

// =============================================================================
// Traits
// =============================================================================

/// Authentication endpoints.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// `POST /{role}/login`.
    async fn login(
        &self,
        role: Role,
        credentials: &LoginCredentials,
    ) -> Result<LoginResponse, ApiError>;

    /// `POST /logout`.
    async fn logout(&self, bearer: Option<&Credential>) -> Result<(), ApiError>;

    /// `GET /{role}/profile`.
    async fn profile(&self, role: Role, bearer: &Credential) -> Result<UserPayload, ApiError>;
}

/// Cart endpoints.
#[async_trait]
pub trait CartApi: Send + Sync {
    /// `GET /api/cart`.
    async fn cart(&self, bearer: Option<&Credential>) -> Result<CartResponse, ApiError>;

    /// `POST /api/cart/items`.
    async fn add_item(
        &self,
        bearer: Option<&Credential>,
        item: AddItemRequest,
    ) -> Result<CartAck, ApiError>;

    /// `PUT /api/cart/items/{productId}`.
    async fn update_item(
        &self,
        bearer: Option<&Credential>,
        product_id: ProductId,
        update: UpdateItemRequest,
    ) -> Result<CartAck, ApiError>;

    /// `DELETE /api/cart/items/{productId}`.
    async fn remove_item(
        &self,
        bearer: Option<&Credential>,
        product_id: ProductId,
    ) -> Result<CartAck, ApiError>;

    /// `DELETE /api/cart`.
    async fn clear(&self, bearer: Option<&Credential>) -> Result<CartAck, ApiError>;

    /// `GET /api/cart/summary`.
    async fn summary(&self, bearer: Option<&Credential>) -> Result<CartSummary, ApiError>;

    /// `GET /api/cart/count`.
    async fn item_count(&self, bearer: Option<&Credential>) -> Result<ItemCount, ApiError>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_login_credentials_serialize_password() {
        let credentials = LoginCredentials::new("a@b.com", "x");
        let json = serde_json::to_value(&credentials).unwrap();
        assert_eq!(json, serde_json::json!({"email": "a@b.com", "password": "x"}));
    }

    #[test]
    fn test_login_credentials_debug_redacts_password() {
        let credentials = LoginCredentials::new("a@b.com", "hunter2");
        let debug = format!("{credentials:?}");
        assert!(debug.contains("a@b.com"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_user_payload_role_falls_back_to_namespace() {
        let payload: UserPayload = serde_json::from_str(r#"{"id": 4, "name": "Kai"}"#).unwrap();
        let identity = payload.into_identity(Role::Merchant);
        assert_eq!(identity.role, Role::Merchant);
        assert_eq!(identity.name, "Kai");

        let payload: UserPayload =
            serde_json::from_str(r#"{"id": 4, "role": "admin"}"#).unwrap();
        assert_eq!(payload.into_identity(Role::Merchant).role, Role::Admin);
    }

    #[test]
    fn test_cart_response_missing_items() {
        let cart: CartResponse = serde_json::from_str(r#"{"customer_id": 3}"#).unwrap();
        assert!(cart.into_lines().is_empty());

        let cart: CartResponse = serde_json::from_str(r#"{"items": null}"#).unwrap();
        assert!(cart.into_lines().is_empty());
    }

    #[test]
    fn test_add_item_request_shape() {
        let body = AddItemRequest {
            product_id: ProductId::new(12),
            quantity: 2,
        };
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            serde_json::json!({"product_id": 12, "quantity": 2})
        );
    }

    #[test]
    fn test_summary_tolerates_partial_payload() {
        let summary: CartSummary = serde_json::from_str(
            r#"{"item_count": 3, "total_price": 59.97, "validation_errors": [{"product_id": 1}], "has_errors": true}"#,
        )
        .unwrap();
        assert_eq!(summary.item_count, 3);
        assert_eq!(summary.total_price, Price::from_cents(5997));
        assert!(summary.has_errors);
        assert_eq!(summary.validation_errors.unwrap().len(), 1);
    }
}
