//! Wire-level tests for `HttpBackend` against the mock API.
//!
//! Run with: `cargo test -p shopfront-integration-tests --test http_backend`

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::time::Duration;

use shopfront_client::api::{AddItemRequest, AuthApi, CartApi, LoginCredentials, UpdateItemRequest};
use shopfront_client::{ApiError, ClientConfig, HttpBackend};
use shopfront_core::{Credential, Identity, Price, ProductId, Role, UserId};
use shopfront_integration_tests::{MockApi, token_for};
use uuid::Uuid;

const PASSWORD: &str = "hunter22";

fn customer() -> Identity {
    Identity::new(UserId::new(1), Role::Customer)
        .with_email("casey@shop.test")
        .with_name("Casey")
}

struct Fixture {
    api: MockApi,
    backend: HttpBackend,
    credential: Credential,
}

async fn fixture_with(configure: impl FnOnce(&mut ClientConfig)) -> Fixture {
    let token = token_for(&customer());
    let api = MockApi::new()
        .with_account(customer(), PASSWORD, &token)
        .with_product(10, "Espresso Beans", 1250, 5)
        .with_product(11, "Milk Frother", 3999, 1);
    let url = api.start().await;

    let mut config = ClientConfig::new(url);
    configure(&mut config);

    Fixture {
        api,
        backend: HttpBackend::new(&config).unwrap(),
        credential: Credential::new(token).unwrap(),
    }
}

async fn fixture() -> Fixture {
    fixture_with(|_| {}).await
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_login_returns_token_and_user() {
    let f = fixture().await;

    let response = f
        .backend
        .login(Role::Customer, &LoginCredentials::new("casey@shop.test", PASSWORD))
        .await
        .unwrap();

    assert_eq!(response.token, f.credential.expose());
    assert_eq!(response.user.into_identity(Role::Customer), customer());

    let request = f.api.requests().pop().unwrap();
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/customer/login");
    assert!(request.authorization.is_none());
}

#[tokio::test]
async fn test_login_rejection_carries_server_message() {
    let f = fixture().await;

    let err = f
        .backend
        .login(Role::Customer, &LoginCredentials::new("casey@shop.test", "wrong"))
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(err.server_message(), Some("Invalid email or password"));
}

#[tokio::test]
async fn test_login_uses_role_namespace() {
    let f = fixture().await;

    // A customer account does not exist in the merchant namespace
    let err = f
        .backend
        .login(Role::Merchant, &LoginCredentials::new("casey@shop.test", PASSWORD))
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(f.api.requests().pop().unwrap().path, "/merchant/login");
}

#[tokio::test]
async fn test_profile_requires_matching_role() {
    let f = fixture().await;

    let profile = f.backend.profile(Role::Customer, &f.credential).await.unwrap();
    assert_eq!(profile.into_identity(Role::Customer), customer());

    let err = f
        .backend
        .profile(Role::Admin, &f.credential)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::Status { status: 403, ref message } if message.as_deref() == Some("Insufficient permissions")
    ));
}

#[tokio::test]
async fn test_logout_without_credential() {
    let f = fixture().await;

    f.backend.logout(None).await.unwrap();

    let request = f.api.requests().pop().unwrap();
    assert_eq!(request.path, "/logout");
    assert!(request.authorization.is_none());
}

// =============================================================================
// Request headers
// =============================================================================

#[tokio::test]
async fn test_requests_carry_bearer_and_request_id() {
    let f = fixture().await;

    f.backend.cart(Some(&f.credential)).await.unwrap();
    f.backend.item_count(Some(&f.credential)).await.unwrap();

    let requests = f.api.requests();
    assert_eq!(requests.len(), 2);

    for request in &requests {
        assert_eq!(
            request.authorization.as_deref(),
            Some(format!("Bearer {}", f.credential.expose()).as_str())
        );
        assert_eq!(request.content_type.as_deref(), Some("application/json"));
        Uuid::parse_str(request.request_id.as_deref().unwrap()).unwrap();
    }
    assert_ne!(requests[0].request_id, requests[1].request_id);
}

// =============================================================================
// Status mapping
// =============================================================================

#[tokio::test]
async fn test_revoked_credential_is_unauthorized() {
    let f = fixture().await;
    f.api.revoke(f.credential.expose());

    let err = f.backend.cart(Some(&f.credential)).await.unwrap_err();

    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn test_missing_credential_is_unauthorized() {
    let f = fixture().await;

    let err = f.backend.cart(None).await.unwrap_err();

    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn test_error_message_extracted_from_payload() {
    let f = fixture().await;

    let err = f
        .backend
        .add_item(
            Some(&f.credential),
            AddItemRequest {
                product_id: ProductId::new(11),
                quantity: 2,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Status { status: 400, .. }));
    assert_eq!(err.server_message(), Some("Insufficient stock"));
    assert_eq!(err.message_or("Failed to add item to cart"), "Insufficient stock");
}

#[tokio::test]
async fn test_missing_line_is_not_found() {
    let f = fixture().await;

    let err = f
        .backend
        .update_item(
            Some(&f.credential),
            ProductId::new(10),
            UpdateItemRequest { quantity: 3 },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Status { status: 404, .. }));
    assert_eq!(err.server_message(), Some("Item not found in cart"));
}

#[tokio::test]
async fn test_timeout() {
    let f = fixture_with(|config| config.request_timeout = Duration::from_millis(100)).await;
    f.api.set_delay(Some(Duration::from_millis(500)));

    let err = f.backend.cart(Some(&f.credential)).await.unwrap_err();

    assert!(matches!(err, ApiError::Timeout));
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    // Bind and drop a listener to find a port nobody is serving on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = ClientConfig::new(format!("http://{addr}").parse().unwrap());
    let backend = HttpBackend::new(&config).unwrap();

    let err = backend.cart(None).await.unwrap_err();

    assert!(matches!(err, ApiError::Network(_)));
}

// =============================================================================
// Cart payloads
// =============================================================================

#[tokio::test]
async fn test_empty_cart_has_no_lines() {
    let f = fixture().await;

    let cart = f.backend.cart(Some(&f.credential)).await.unwrap();

    assert!(cart.items.is_none());
    assert!(cart.into_lines().is_empty());
}

#[tokio::test]
async fn test_cart_lines_are_priced() {
    let f = fixture().await;

    let ack = f
        .backend
        .add_item(
            Some(&f.credential),
            AddItemRequest {
                product_id: ProductId::new(10),
                quantity: 2,
            },
        )
        .await
        .unwrap();
    assert_eq!(ack.item_count, Some(2));

    let lines = f.backend.cart(Some(&f.credential)).await.unwrap().into_lines();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].product_id, ProductId::new(10));
    assert_eq!(lines[0].unit_price, Price::from_cents(1250));
    assert_eq!(lines[0].line_total(), Price::from_cents(2500));
    assert!(!lines[0].price_pending);
    assert_eq!(
        lines[0].product.as_ref().map(|p| p.name.as_str()),
        Some("Espresso Beans")
    );
}

#[tokio::test]
async fn test_clear_accepts_empty_body() {
    let f = fixture().await;

    let ack = f.backend.clear(Some(&f.credential)).await.unwrap();

    assert_eq!(ack.message, None);
    assert_eq!(ack.item_count, None);
}

#[tokio::test]
async fn test_summary_and_count() {
    let f = fixture().await;
    for (product_id, quantity) in [(10, 3), (11, 1)] {
        f.backend
            .add_item(
                Some(&f.credential),
                AddItemRequest {
                    product_id: ProductId::new(product_id),
                    quantity,
                },
            )
            .await
            .unwrap();
    }

    let summary = f.backend.summary(Some(&f.credential)).await.unwrap();
    assert_eq!(summary.item_count, 4);
    assert_eq!(summary.total_price, Price::from_cents(3 * 1250 + 3999));
    assert!(!summary.has_errors);
    assert_eq!(summary.items.map(|items| items.len()), Some(2));

    let count = f.backend.item_count(Some(&f.credential)).await.unwrap();
    assert_eq!(count.item_count, 4);
}
