//! Cart lines and local cart state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopfront_core::{Price, ProductId};

/// Product details the server embeds in a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    #[serde(default)]
    pub id: Option<ProductId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Price,
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// One product in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Price per unit. Zero while `price_pending`.
    #[serde(rename = "price", default)]
    pub unit_price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductSnapshot>,
    /// Added locally and not yet priced by a full fetch.
    #[serde(skip)]
    pub price_pending: bool,
}

impl CartLine {
    /// A line added locally before the server priced it.
    #[must_use]
    pub const fn placeholder(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
            unit_price: Price::ZERO,
            product: None,
            price_pending: true,
        }
    }

    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price * self.quantity
    }
}

/// Local view of the cart.
///
/// Lines are unique by product and never hold a zero quantity. Totals are
/// recomputed on every read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    pub lines: Vec<CartLine>,
    /// A remote operation is in flight.
    pub loading: bool,
    /// Message of the last failed operation, cleared when the next one starts.
    pub error: Option<String>,
    /// When lines were last replaced by a full fetch.
    pub last_synced: Option<DateTime<Utc>>,
}

impl CartState {
    #[must_use]
    pub fn total_price(&self) -> Price {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub const fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Whether any line's price is a placeholder. Totals undercount until
    /// the next full fetch.
    #[must_use]
    pub fn has_pending_prices(&self) -> bool {
        self.lines.iter().any(|line| line.price_pending)
    }

    /// The line for a product.
    #[must_use]
    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product_id == product_id)
    }

    /// Quantity of a product, zero when absent.
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.line(product_id).map_or(0, |line| line.quantity)
    }

    // =========================================================================
    // Confirmed mutations
    // =========================================================================

    /// Replace all lines with a server payload, merging duplicates and
    /// dropping empty lines.
    pub(crate) fn replace_lines(&mut self, lines: Vec<CartLine>) {
        let mut merged: Vec<CartLine> = Vec::with_capacity(lines.len());
        for line in lines {
            match merged
                .iter_mut()
                .find(|existing| existing.product_id == line.product_id)
            {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(line.quantity);
                }
                None => merged.push(line),
            }
        }
        merged.retain(|line| line.quantity > 0);
        self.lines = merged;
    }

    pub(crate) fn apply_add(&mut self, product_id: ProductId, quantity: u32) {
        if quantity == 0 {
            return;
        }
        match self
            .lines
            .iter_mut()
            .find(|line| line.product_id == product_id)
        {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity),
            None => self.lines.push(CartLine::placeholder(product_id, quantity)),
        }
    }

    pub(crate) fn apply_set(&mut self, product_id: ProductId, quantity: u32) {
        if quantity == 0 {
            self.apply_remove(product_id);
        } else if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.product_id == product_id)
        {
            line.quantity = quantity;
        }
    }

    pub(crate) fn apply_remove(&mut self, product_id: ProductId) {
        self.lines.retain(|line| line.product_id != product_id);
    }
}
