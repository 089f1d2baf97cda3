//! Cart state synchronization.
//!
//! The remote cart is the source of truth. Local lines change only after the
//! server confirms a mutation, and a full fetch replaces them wholesale.
//!
//! Every remote operation runs inside the same envelope: `loading` is raised
//! and `error` cleared before the call, `error` records the failure message,
//! and `loading` drops once no operation is in flight.

mod state;

pub use state::{CartLine, CartState, ProductSnapshot};

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::instrument;

use shopfront_core::{Credential, ProductId};

use crate::api::{AddItemRequest, CartApi, CartSummary, UpdateItemRequest};
use crate::config::CartSyncPolicy;
use crate::error::{ApiError, add_breadcrumb};
use crate::finally::Finally;
use crate::signer::RequestSigner;

const FETCH_FAILED: &str = "Failed to load cart";
const ADD_FAILED: &str = "Failed to add item to cart";
const UPDATE_FAILED: &str = "Failed to update cart";
const REMOVE_FAILED: &str = "Failed to remove item";
const CLEAR_FAILED: &str = "Failed to clear cart";
const SUMMARY_FAILED: &str = "Failed to load cart summary";

/// A failed cart operation.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CartError {
    /// User-facing message from the server, or the operation's default.
    pub message: String,
    pub source: ApiError,
}

struct Shared {
    cart: CartState,
    in_flight: usize,
}

/// Handle to the cart store. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    api: Arc<dyn CartApi>,
    signer: RequestSigner,
    policy: CartSyncPolicy,
    shared: RwLock<Shared>,
}

impl CartStore {
    /// Create an empty cart store. Call [`CartStore::fetch_cart`] to load it.
    #[must_use]
    pub fn new(api: Arc<dyn CartApi>, signer: RequestSigner, policy: CartSyncPolicy) -> Self {
        Self {
            inner: Arc::new(CartStoreInner {
                api,
                signer,
                policy,
                shared: RwLock::new(Shared {
                    cart: CartState::default(),
                    in_flight: 0,
                }),
            }),
        }
    }

    /// Snapshot of the local cart.
    #[must_use]
    pub fn state(&self) -> CartState {
        self.inner.shared.read().cart.clone()
    }

    #[must_use]
    pub fn is_in_cart(&self, product_id: ProductId) -> bool {
        self.inner.shared.read().cart.line(product_id).is_some()
    }

    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.inner.shared.read().cart.quantity_of(product_id)
    }

    // =========================================================================
    // Remote operations
    // =========================================================================

    /// Replace the local cart with the server's.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the cart cannot be loaded; local lines are kept.
    #[instrument(skip(self))]
    pub async fn fetch_cart(&self) -> Result<(), CartError> {
        let api = Arc::clone(&self.inner.api);
        self.tracked(
            FETCH_FAILED,
            move |bearer| async move { api.cart(bearer.as_ref()).await },
            |cart, response| {
                cart.replace_lines(response.into_lines());
                cart.last_synced = Some(Utc::now());
                tracing::debug!(lines = cart.lines.len(), "Cart synced");
            },
        )
        .await
    }

    /// Add `quantity` of a product.
    ///
    /// A product not yet in the cart gets a placeholder line priced at zero
    /// until the next full fetch, or immediately under
    /// [`CartSyncPolicy::RefetchOnAdd`].
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the server rejects the add, or if the follow-up
    /// fetch fails under `RefetchOnAdd`.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_item(&self, product_id: ProductId, quantity: u32) -> Result<(), CartError> {
        let api = Arc::clone(&self.inner.api);
        let item = AddItemRequest {
            product_id,
            quantity,
        };
        self.tracked(
            ADD_FAILED,
            move |bearer| async move { api.add_item(bearer.as_ref(), item).await },
            |cart, _ack| cart.apply_add(product_id, quantity),
        )
        .await?;

        add_breadcrumb(
            "cart",
            "Added item",
            Some(&[
                ("product_id", product_id.to_string().as_str()),
                ("quantity", quantity.to_string().as_str()),
            ]),
        );

        if self.inner.policy == CartSyncPolicy::RefetchOnAdd {
            self.fetch_cart().await?;
        }
        Ok(())
    }

    /// Add a single unit of a product.
    ///
    /// # Errors
    ///
    /// See [`CartStore::add_item`].
    pub async fn add_item_one(&self, product_id: ProductId) -> Result<(), CartError> {
        self.add_item(product_id, 1).await
    }

    /// Set a product's quantity. Zero removes the line.
    ///
    /// A product missing locally is not inserted.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the server rejects the update.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn set_quantity(&self, product_id: ProductId, quantity: u32) -> Result<(), CartError> {
        let api = Arc::clone(&self.inner.api);
        let update = UpdateItemRequest { quantity };
        self.tracked(
            UPDATE_FAILED,
            move |bearer| async move { api.update_item(bearer.as_ref(), product_id, update).await },
            |cart, _ack| cart.apply_set(product_id, quantity),
        )
        .await?;

        add_breadcrumb(
            "cart",
            "Updated quantity",
            Some(&[
                ("product_id", product_id.to_string().as_str()),
                ("quantity", quantity.to_string().as_str()),
            ]),
        );
        Ok(())
    }

    /// Remove a product.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the server rejects the removal.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_item(&self, product_id: ProductId) -> Result<(), CartError> {
        let api = Arc::clone(&self.inner.api);
        self.tracked(
            REMOVE_FAILED,
            move |bearer| async move { api.remove_item(bearer.as_ref(), product_id).await },
            |cart, _ack| cart.apply_remove(product_id),
        )
        .await?;

        add_breadcrumb(
            "cart",
            "Removed item",
            Some(&[("product_id", product_id.to_string().as_str())]),
        );
        Ok(())
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the server rejects the request.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), CartError> {
        let api = Arc::clone(&self.inner.api);
        self.tracked(
            CLEAR_FAILED,
            move |bearer| async move { api.clear(bearer.as_ref()).await },
            |cart, _ack| cart.lines.clear(),
        )
        .await?;

        add_breadcrumb("cart", "Cleared cart", None);
        Ok(())
    }

    /// Fetch the server's cart summary. Local lines are not touched.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the summary cannot be loaded.
    #[instrument(skip(self))]
    pub async fn summary(&self) -> Result<CartSummary, CartError> {
        let api = Arc::clone(&self.inner.api);
        self.tracked(
            SUMMARY_FAILED,
            move |bearer| async move { api.summary(bearer.as_ref()).await },
            |_, summary| summary,
        )
        .await
    }

    /// The server's item count, or zero if it cannot be fetched.
    ///
    /// Runs outside the loading envelope so badge refreshes never flicker
    /// the cart's loading state.
    #[instrument(skip(self))]
    pub async fn remote_item_count(&self) -> u32 {
        let api = Arc::clone(&self.inner.api);
        match self
            .inner
            .signer
            .call(move |bearer| async move { api.item_count(bearer.as_ref()).await })
            .await
        {
            Ok(count) => count.item_count,
            Err(e) => {
                tracing::warn!("Failed to fetch cart count: {e}");
                0
            }
        }
    }

    // =========================================================================
    // Envelope
    // =========================================================================

    /// Run a signed request and apply its response to the cart on success.
    async fn tracked<T, R, F, Fut, A>(
        &self,
        default_message: &'static str,
        request: F,
        apply: A,
    ) -> Result<R, CartError>
    where
        F: FnOnce(Option<Credential>) -> Fut + Send,
        Fut: Future<Output = Result<T, ApiError>> + Send,
        T: Send,
        A: FnOnce(&mut CartState, T) -> R + Send,
    {
        self.begin();
        let _finish = Finally::new(|| self.finish());

        match self.inner.signer.call(request).await {
            Ok(response) => Ok(apply(&mut self.inner.shared.write().cart, response)),
            Err(source) => {
                let message = source.message_or(default_message);
                tracing::error!("{message}: {source}");
                self.inner.shared.write().cart.error = Some(message.clone());
                Err(CartError { message, source })
            }
        }
    }

    fn begin(&self) {
        let mut shared = self.inner.shared.write();
        shared.in_flight += 1;
        shared.cart.loading = true;
        shared.cart.error = None;
    }

    fn finish(&self) {
        let mut shared = self.inner.shared.write();
        shared.in_flight = shared.in_flight.saturating_sub(1);
        shared.cart.loading = shared.in_flight > 0;
    }
}
