//! Integration tests for the Shopfront client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopfront-integration-tests
//! ```
//!
//! No external services are needed. [`MockApi`] is an in-process axum server
//! speaking the storefront API; each test starts its own on `127.0.0.1:0` and
//! points an [`HttpBackend`](shopfront_client::HttpBackend) at it.
//!
//! # Test Categories
//!
//! - `http_backend` - Wire behaviour: headers, status mapping, timeouts
//! - `session_flow` - Session, route guard and cart stores end to end

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

use shopfront_client::api::REQUEST_ID_HEADER;
use shopfront_core::{Identity, ProductId, Role};

/// A request as the mock API saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub request_id: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone)]
struct Account {
    identity: Identity,
    password: String,
    token: String,
}

#[derive(Debug, Clone)]
struct Product {
    name: String,
    price_cents: i64,
    stock: u32,
}

#[derive(Default)]
struct ApiState {
    accounts: Vec<Account>,
    products: HashMap<ProductId, Product>,
    carts: HashMap<String, Vec<(ProductId, u32)>>,
    requests: Vec<RecordedRequest>,
    revoked: Vec<String>,
    delay: Option<Duration>,
}

/// In-memory storefront API.
#[derive(Clone, Default)]
pub struct MockApi {
    state: Arc<Mutex<ApiState>>,
}

impl MockApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account that logs in with `password` and receives `token`.
    #[must_use]
    pub fn with_account(self, identity: Identity, password: &str, token: &str) -> Self {
        self.state.lock().accounts.push(Account {
            identity,
            password: password.to_string(),
            token: token.to_string(),
        });
        self
    }

    /// Register a product.
    #[must_use]
    pub fn with_product(self, id: i64, name: &str, price_cents: i64, stock: u32) -> Self {
        self.state.lock().products.insert(
            ProductId::new(id),
            Product {
                name: name.to_string(),
                price_cents,
                stock,
            },
        );
        self
    }

    /// Delay every response.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.state.lock().delay = delay;
    }

    /// Reject `token` from now on.
    pub fn revoke(&self, token: &str) {
        self.state.lock().revoked.push(token.to_string());
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    /// Server-side quantity of a product in the cart owned by `token`.
    #[must_use]
    pub fn cart_quantity(&self, token: &str, product_id: i64) -> u32 {
        self.state
            .lock()
            .carts
            .get(token)
            .and_then(|lines| {
                lines
                    .iter()
                    .find(|(id, _)| *id == ProductId::new(product_id))
                    .map(|(_, quantity)| *quantity)
            })
            .unwrap_or(0)
    }

    /// Serve on an ephemeral local port and return the base URL.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start(&self) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock API");
        let addr = listener.local_addr().expect("Mock API has no local address");
        let app = self.router();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Mock API server failed");
        });

        Url::parse(&format!("http://{addr}")).expect("Invalid mock API address")
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/{role}/login", post(login))
            .route("/{role}/profile", get(profile))
            .route("/logout", post(logout))
            .route("/api/cart", get(cart).delete(clear_cart))
            .route("/api/cart/items", post(add_item))
            .route(
                "/api/cart/items/{product_id}",
                put(update_item).delete(remove_item),
            )
            .route("/api/cart/summary", get(summary))
            .route("/api/cart/count", get(count))
            .layer(middleware::from_fn_with_state(self.clone(), record))
            .with_state(self.clone())
    }

    async fn pause(&self) {
        let delay = self.state.lock().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    /// The account owning the bearer token in `headers`.
    fn authenticate(&self, headers: &HeaderMap) -> Option<Account> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))?;

        let state = self.state.lock();
        if state.revoked.iter().any(|revoked| revoked == token) {
            return None;
        }
        state
            .accounts
            .iter()
            .find(|account| account.token == token)
            .cloned()
    }
}

/// An unsigned three-part token whose claims describe `identity`.
#[must_use]
pub fn token_for(identity: &Identity) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = json!({
        "id": identity.id,
        "email": identity.email,
        "name": identity.name,
        "role": identity.role,
        "is_active": identity.is_active,
        "exp": 4_102_444_800_i64,
    });
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

// =============================================================================
// Helpers
// =============================================================================

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn unauthorized() -> Response {
    error(StatusCode::UNAUTHORIZED, "Invalid or expired token")
}

fn user_json(identity: &Identity) -> Value {
    json!({
        "id": identity.id,
        "email": identity.email,
        "name": identity.name,
        "role": identity.role,
        "is_active": identity.is_active,
    })
}

fn price_json(cents: i64) -> Value {
    // Prices go over the wire as plain JSON numbers
    #[allow(clippy::cast_precision_loss)]
    let amount = cents as f64 / 100.0;
    json!(amount)
}

fn lines_json(state: &ApiState, lines: &[(ProductId, u32)]) -> Vec<Value> {
    lines
        .iter()
        .enumerate()
        .map(|(index, (product_id, quantity))| {
            let product = state.products.get(product_id);
            let price = product.map_or(0, |p| p.price_cents);
            json!({
                "id": index + 1,
                "cart_id": 1,
                "product_id": product_id,
                "quantity": quantity,
                "price": price_json(price),
                "product": product.map(|p| json!({
                    "id": product_id,
                    "name": p.name,
                    "price": price_json(p.price_cents),
                    "stock": p.stock,
                })),
            })
        })
        .collect()
}

fn item_count(lines: &[(ProductId, u32)]) -> u32 {
    lines.iter().map(|(_, quantity)| quantity).sum()
}

fn ack(message: &str, lines: &[(ProductId, u32)]) -> Response {
    Json(json!({ "message": message, "item_count": item_count(lines) })).into_response()
}

// =============================================================================
// Middleware
// =============================================================================

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(String::from)
}

async fn record(State(api): State<MockApi>, request: Request, next: Next) -> Response {
    // Nothing borrowed from the request may live across the await below
    let recorded = {
        let headers = request.headers();
        RecordedRequest {
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
            authorization: header_value(headers, header::AUTHORIZATION.as_str()),
            request_id: header_value(headers, REQUEST_ID_HEADER),
            content_type: header_value(headers, header::CONTENT_TYPE.as_str()),
        }
    };
    api.state.lock().requests.push(recorded);

    next.run(request).await
}

// =============================================================================
// Auth handlers
// =============================================================================

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

async fn login(
    State(api): State<MockApi>,
    Path(role): Path<String>,
    Json(body): Json<LoginBody>,
) -> Response {
    api.pause().await;
    let Ok(role) = role.parse::<Role>() else {
        return error(StatusCode::NOT_FOUND, "Not found");
    };

    let state = api.state.lock();
    state
        .accounts
        .iter()
        .find(|account| {
            account.identity.role == role
                && account.identity.email == body.email
                && account.password == body.password
        })
        .map_or_else(
            || error(StatusCode::UNAUTHORIZED, "Invalid email or password"),
            |account| {
                Json(json!({ "token": account.token, "user": user_json(&account.identity) }))
                    .into_response()
            },
        )
}

async fn logout(State(api): State<MockApi>) -> Response {
    api.pause().await;
    Json(json!({ "message": "Logged out successfully" })).into_response()
}

async fn profile(
    State(api): State<MockApi>,
    Path(role): Path<String>,
    headers: HeaderMap,
) -> Response {
    api.pause().await;
    let Some(account) = api.authenticate(&headers) else {
        return unauthorized();
    };
    if account.identity.role.as_str() != role {
        return error(StatusCode::FORBIDDEN, "Insufficient permissions");
    }
    Json(user_json(&account.identity)).into_response()
}

// =============================================================================
// Cart handlers
// =============================================================================

#[derive(Deserialize)]
struct AddBody {
    product_id: ProductId,
    quantity: u32,
}

#[derive(Deserialize)]
struct UpdateBody {
    quantity: u32,
}

async fn cart(State(api): State<MockApi>, headers: HeaderMap) -> Response {
    api.pause().await;
    let Some(account) = api.authenticate(&headers) else {
        return unauthorized();
    };

    let state = api.state.lock();
    let lines = state.carts.get(&account.token).cloned().unwrap_or_default();
    if lines.is_empty() {
        // Empty slices are omitted from the payload.
        return Json(json!({ "customer_id": account.identity.id })).into_response();
    }
    Json(json!({
        "customer_id": account.identity.id,
        "items": lines_json(&state, &lines),
    }))
    .into_response()
}

async fn add_item(
    State(api): State<MockApi>,
    headers: HeaderMap,
    Json(body): Json<AddBody>,
) -> Response {
    api.pause().await;
    let Some(account) = api.authenticate(&headers) else {
        return unauthorized();
    };
    if body.quantity == 0 {
        return error(StatusCode::BAD_REQUEST, "Quantity must be at least 1");
    }

    let mut state = api.state.lock();
    let Some(stock) = state.products.get(&body.product_id).map(|p| p.stock) else {
        return error(StatusCode::NOT_FOUND, "Product not found");
    };
    let lines = state.carts.entry(account.token).or_default();
    let current = lines
        .iter()
        .find(|(id, _)| *id == body.product_id)
        .map_or(0, |(_, quantity)| *quantity);
    if current + body.quantity > stock {
        return error(StatusCode::BAD_REQUEST, "Insufficient stock");
    }

    match lines.iter_mut().find(|(id, _)| *id == body.product_id) {
        Some((_, quantity)) => *quantity += body.quantity,
        None => lines.push((body.product_id, body.quantity)),
    }
    ack("Item added to cart", lines)
}

async fn update_item(
    State(api): State<MockApi>,
    Path(product_id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<UpdateBody>,
) -> Response {
    api.pause().await;
    let Some(account) = api.authenticate(&headers) else {
        return unauthorized();
    };
    let product_id = ProductId::new(product_id);

    let mut state = api.state.lock();
    let lines = state.carts.entry(account.token).or_default();
    let Some(index) = lines.iter().position(|(id, _)| *id == product_id) else {
        return error(StatusCode::NOT_FOUND, "Item not found in cart");
    };
    if body.quantity == 0 {
        lines.remove(index);
    } else if let Some(line) = lines.get_mut(index) {
        line.1 = body.quantity;
    }
    ack("Cart updated", lines)
}

async fn remove_item(
    State(api): State<MockApi>,
    Path(product_id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    api.pause().await;
    let Some(account) = api.authenticate(&headers) else {
        return unauthorized();
    };
    let product_id = ProductId::new(product_id);

    let mut state = api.state.lock();
    let lines = state.carts.entry(account.token).or_default();
    let Some(index) = lines.iter().position(|(id, _)| *id == product_id) else {
        return error(StatusCode::NOT_FOUND, "Item not found in cart");
    };
    lines.remove(index);
    ack("Item removed from cart", lines)
}

async fn clear_cart(State(api): State<MockApi>, headers: HeaderMap) -> Response {
    api.pause().await;
    let Some(account) = api.authenticate(&headers) else {
        return unauthorized();
    };
    api.state.lock().carts.remove(&account.token);
    StatusCode::OK.into_response()
}

async fn summary(State(api): State<MockApi>, headers: HeaderMap) -> Response {
    api.pause().await;
    let Some(account) = api.authenticate(&headers) else {
        return unauthorized();
    };

    let state = api.state.lock();
    let lines = state.carts.get(&account.token).cloned().unwrap_or_default();
    let total_cents: i64 = lines
        .iter()
        .map(|(id, quantity)| {
            state
                .products
                .get(id)
                .map_or(0, |p| p.price_cents * i64::from(*quantity))
        })
        .sum();
    let validation_errors: Vec<Value> = lines
        .iter()
        .filter_map(|(id, quantity)| {
            let stock = state.products.get(id).map_or(0, |p| p.stock);
            (*quantity > stock).then(|| {
                json!({ "product_id": id, "error": "Insufficient stock", "available": stock })
            })
        })
        .collect();

    Json(json!({
        "item_count": item_count(&lines),
        "total_price": price_json(total_cents),
        "items": lines_json(&state, &lines),
        "has_errors": !validation_errors.is_empty(),
        "validation_errors": validation_errors,
    }))
    .into_response()
}

async fn count(State(api): State<MockApi>, headers: HeaderMap) -> Response {
    api.pause().await;
    let Some(account) = api.authenticate(&headers) else {
        return unauthorized();
    };
    let state = api.state.lock();
    let lines = state.carts.get(&account.token).cloned().unwrap_or_default();
    Json(json!({ "item_count": item_count(&lines) })).into_response()
}
