//! Test doubles shared by the unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use parking_lot::Mutex;

use shopfront_core::{Credential, Identity, Price, ProductId, Role};

use crate::api::{
    AddItemRequest, AuthApi, CartAck, CartApi, CartResponse, CartSummary, ItemCount,
    LoginCredentials, LoginResponse, UpdateItemRequest, UserPayload,
};
use crate::browser::{CookieJar, DurableStorage, MemoryStorage, NavigationUrl};
use crate::cart::{CartLine, CartStore};
use crate::config::{CartSyncPolicy, TokenSources};
use crate::error::ApiError;
use crate::session::Session;
use crate::signer::RequestSigner;
use crate::token::TokenResolver;

/// Encode claims as an unsigned three-part token.
pub(crate) fn jwt(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

/// A token whose claims name merchant 7.
pub(crate) fn merchant_token() -> String {
    jwt(&serde_json::json!({"id": 7, "role": "merchant", "email": "m@shop.test"}))
}

pub(crate) fn payload(identity: &Identity) -> UserPayload {
    UserPayload {
        id: identity.id,
        email: identity.email.clone(),
        name: identity.name.clone(),
        role: Some(identity.role),
        is_active: identity.is_active,
    }
}

pub(crate) fn login_response(token: &str, identity: &Identity) -> LoginResponse {
    LoginResponse {
        token: token.to_string(),
        user: payload(identity),
    }
}

// =============================================================================
// MockBackend
// =============================================================================

/// Scripted in-memory implementation of both API traits.
pub(crate) struct MockBackend {
    state: Mutex<MockState>,
}

struct MockState {
    login: Result<LoginResponse, ApiError>,
    login_delay: Option<Duration>,
    logout_error: Option<ApiError>,
    last_logout_bearer: Option<String>,
    profiles: HashMap<String, UserPayload>,
    profile_error: Option<ApiError>,
    profile_delay: Option<Duration>,
    last_profile_role: Option<Role>,
    lines: Vec<CartLine>,
    prices: HashMap<ProductId, Price>,
    next_cart_error: Option<ApiError>,
    reject_cart: bool,
    last_cart_bearer: Option<String>,
    calls: HashMap<&'static str, usize>,
}

impl MockBackend {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                login: Err(ApiError::Unauthorized {
                    message: Some("Invalid credentials".to_string()),
                }),
                login_delay: None,
                logout_error: None,
                last_logout_bearer: None,
                profiles: HashMap::new(),
                profile_error: None,
                profile_delay: None,
                last_profile_role: None,
                lines: Vec::new(),
                prices: HashMap::new(),
                next_cart_error: None,
                reject_cart: false,
                last_cart_bearer: None,
                calls: HashMap::new(),
            }),
        }
    }

    pub(crate) fn set_login(&self, result: Result<LoginResponse, ApiError>) {
        self.state.lock().login = result;
    }

    pub(crate) fn set_login_delay(&self, delay: Duration) {
        self.state.lock().login_delay = Some(delay);
    }

    pub(crate) fn fail_logout(&self, error: ApiError) {
        self.state.lock().logout_error = Some(error);
    }

    pub(crate) fn last_logout_bearer(&self) -> Option<String> {
        self.state.lock().last_logout_bearer.clone()
    }

    pub(crate) fn add_profile(&self, token: &str, identity: &Identity) {
        self.state
            .lock()
            .profiles
            .insert(token.to_string(), payload(identity));
    }

    pub(crate) fn remove_profile(&self, token: &str) {
        self.state.lock().profiles.remove(token);
    }

    pub(crate) fn fail_profile(&self, error: ApiError) {
        self.state.lock().profile_error = Some(error);
    }

    pub(crate) fn set_profile_delay(&self, delay: Duration) {
        self.state.lock().profile_delay = Some(delay);
    }

    pub(crate) fn last_profile_role(&self) -> Option<Role> {
        self.state.lock().last_profile_role
    }

    pub(crate) fn set_price(&self, product_id: ProductId, price: Price) {
        self.state.lock().prices.insert(product_id, price);
    }

    /// Put a line in the server cart without going through the API.
    pub(crate) fn seed_cart(&self, product_id: ProductId, quantity: u32) {
        let mut state = self.state.lock();
        let unit_price = state.price_of(product_id);
        state.lines.push(CartLine {
            product_id,
            quantity,
            unit_price,
            product: None,
            price_pending: false,
        });
    }

    /// Fail the next cart call with `error`.
    pub(crate) fn fail_next_cart(&self, error: ApiError) {
        self.state.lock().next_cart_error = Some(error);
    }

    pub(crate) fn reset_failures(&self) {
        let mut state = self.state.lock();
        state.next_cart_error = None;
        state.reject_cart = false;
        state.profile_error = None;
        state.logout_error = None;
    }

    /// Answer every cart call with 401.
    pub(crate) fn reject_cart(&self, reject: bool) {
        self.state.lock().reject_cart = reject;
    }

    pub(crate) fn last_cart_bearer(&self) -> Option<String> {
        self.state.lock().last_cart_bearer.clone()
    }

    pub(crate) fn server_lines(&self) -> Vec<CartLine> {
        self.state.lock().lines.clone()
    }

    pub(crate) fn calls(&self, endpoint: &str) -> usize {
        self.state.lock().calls.get(endpoint).copied().unwrap_or(0)
    }

    /// Record a cart call and apply scripted failures.
    fn cart_call(
        &self,
        endpoint: &'static str,
        bearer: Option<&Credential>,
    ) -> Result<parking_lot::MutexGuard<'_, MockState>, ApiError> {
        let mut state = self.state.lock();
        *state.calls.entry(endpoint).or_default() += 1;
        state.last_cart_bearer = bearer.map(|c| c.expose().to_string());
        if state.reject_cart {
            return Err(ApiError::Unauthorized { message: None });
        }
        if let Some(error) = state.next_cart_error.take() {
            return Err(error);
        }
        Ok(state)
    }
}

impl MockState {
    fn price_of(&self, product_id: ProductId) -> Price {
        self.prices
            .get(&product_id)
            .copied()
            .unwrap_or_else(|| Price::from_cents(1000))
    }

    fn item_count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    fn ack(&self, message: &str) -> CartAck {
        CartAck {
            message: Some(message.to_string()),
            item_count: Some(self.item_count()),
        }
    }

    fn position(&self, product_id: ProductId) -> Result<usize, ApiError> {
        self.lines
            .iter()
            .position(|line| line.product_id == product_id)
            .ok_or_else(|| ApiError::Status {
                status: 404,
                message: Some("Item not found in cart".to_string()),
            })
    }
}

#[async_trait]
impl AuthApi for MockBackend {
    async fn login(
        &self,
        _role: Role,
        _credentials: &LoginCredentials,
    ) -> Result<LoginResponse, ApiError> {
        let (result, delay) = {
            let mut state = self.state.lock();
            *state.calls.entry("login").or_default() += 1;
            (state.login.clone(), state.login_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn logout(&self, bearer: Option<&Credential>) -> Result<(), ApiError> {
        let mut state = self.state.lock();
        *state.calls.entry("logout").or_default() += 1;
        state.last_logout_bearer = bearer.map(|c| c.expose().to_string());
        state.logout_error.clone().map_or(Ok(()), Err)
    }

    async fn profile(&self, role: Role, bearer: &Credential) -> Result<UserPayload, ApiError> {
        let delay = {
            let mut state = self.state.lock();
            *state.calls.entry("profile").or_default() += 1;
            state.last_profile_role = Some(role);
            state.profile_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.lock();
        if let Some(error) = &state.profile_error {
            return Err(error.clone());
        }
        state
            .profiles
            .get(bearer.expose())
            .cloned()
            .ok_or(ApiError::Unauthorized {
                message: Some("Invalid token".to_string()),
            })
    }
}

#[async_trait]
impl CartApi for MockBackend {
    async fn cart(&self, bearer: Option<&Credential>) -> Result<CartResponse, ApiError> {
        let state = self.cart_call("cart", bearer)?;
        Ok(CartResponse {
            items: Some(state.lines.clone()),
        })
    }

    async fn add_item(
        &self,
        bearer: Option<&Credential>,
        item: AddItemRequest,
    ) -> Result<CartAck, ApiError> {
        let mut state = self.cart_call("add_item", bearer)?;
        if item.quantity > 0 {
            match state.position(item.product_id) {
                Ok(index) => state.lines[index].quantity += item.quantity,
                Err(_) => {
                    let unit_price = state.price_of(item.product_id);
                    state.lines.push(CartLine {
                        product_id: item.product_id,
                        quantity: item.quantity,
                        unit_price,
                        product: None,
                        price_pending: false,
                    });
                }
            }
        }
        Ok(state.ack("Item added to cart"))
    }

    async fn update_item(
        &self,
        bearer: Option<&Credential>,
        product_id: ProductId,
        update: UpdateItemRequest,
    ) -> Result<CartAck, ApiError> {
        let mut state = self.cart_call("update_item", bearer)?;
        let index = state.position(product_id)?;
        if update.quantity == 0 {
            state.lines.remove(index);
        } else {
            state.lines[index].quantity = update.quantity;
        }
        Ok(state.ack("Cart updated"))
    }

    async fn remove_item(
        &self,
        bearer: Option<&Credential>,
        product_id: ProductId,
    ) -> Result<CartAck, ApiError> {
        let mut state = self.cart_call("remove_item", bearer)?;
        let index = state.position(product_id)?;
        state.lines.remove(index);
        Ok(state.ack("Item removed from cart"))
    }

    async fn clear(&self, bearer: Option<&Credential>) -> Result<CartAck, ApiError> {
        let mut state = self.cart_call("clear", bearer)?;
        state.lines.clear();
        Ok(CartAck::default())
    }

    async fn summary(&self, bearer: Option<&Credential>) -> Result<CartSummary, ApiError> {
        let state = self.cart_call("summary", bearer)?;
        Ok(CartSummary {
            item_count: state.item_count(),
            total_price: state.lines.iter().map(CartLine::line_total).sum(),
            items: Some(state.lines.clone()),
            validation_errors: None,
            has_errors: false,
        })
    }

    async fn item_count(&self, bearer: Option<&Credential>) -> Result<ItemCount, ApiError> {
        let state = self.cart_call("item_count", bearer)?;
        Ok(ItemCount {
            item_count: state.item_count(),
        })
    }
}

// =============================================================================
// Harness
// =============================================================================

/// A session wired to a mock backend and in-memory browser environment.
pub(crate) struct Harness {
    pub backend: Arc<MockBackend>,
    pub session: Session,
    pub storage: Arc<MemoryStorage>,
    pub location: Arc<NavigationUrl>,
}

impl Harness {
    pub(crate) fn new() -> Self {
        Self::build(None, "https://shop.test/")
    }

    /// Start with a credential already in durable storage.
    pub(crate) fn with_stored(token: &str) -> Self {
        Self::build(Some(token), "https://shop.test/")
    }

    /// Start at the given navigation URL.
    pub(crate) fn with_url(href: &str) -> Self {
        Self::build(None, href)
    }

    fn build(stored: Option<&str>, href: &str) -> Self {
        let backend = Arc::new(MockBackend::new());
        let storage = Arc::new(MemoryStorage::new());
        if let Some(token) = stored {
            storage.set("authToken", token).unwrap();
        }
        let location = Arc::new(NavigationUrl::parse(href).unwrap());
        let resolver = TokenResolver::new(
            storage.clone(),
            Arc::new(CookieJar::empty()),
            location.clone(),
            TokenSources::default(),
        );
        let session = Session::new(backend.clone(), resolver);

        Self {
            backend,
            session,
            storage,
            location,
        }
    }

    /// A cart store signed by this harness's session.
    pub(crate) fn cart(&self, policy: CartSyncPolicy) -> CartStore {
        CartStore::new(
            self.backend.clone(),
            RequestSigner::new(self.session.clone()),
            policy,
        )
    }
}
