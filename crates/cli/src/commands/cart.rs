//! Cart commands.
//!
//! Each command resolves the session first so cart calls carry the stored
//! credential.

use shopfront_client::CartState;
use shopfront_core::ProductId;

use super::{CliError, Context};

#[allow(clippy::print_stdout)]
fn print_cart(state: &CartState) {
    if state.is_empty() {
        println!("Cart is empty");
        return;
    }

    for line in &state.lines {
        let name = line
            .product
            .as_ref()
            .map_or_else(|| format!("product {}", line.product_id), |p| p.name.clone());
        let price = if line.price_pending {
            "pending".to_string()
        } else {
            line.line_total().to_string()
        };
        println!("{:>4} x {name:<32} {price:>10}", line.quantity);
    }
    println!("{} items, total {}", state.item_count(), state.total_price());
    if state.has_pending_prices() {
        println!("(some prices pending, run `cart show` to refresh)");
    }
}

/// Fetch and print the cart.
///
/// # Errors
///
/// Returns `CliError::Cart` if the cart cannot be loaded.
pub async fn show(ctx: &Context) -> Result<(), CliError> {
    ctx.session.init_auth().await;
    ctx.cart.fetch_cart().await?;
    print_cart(&ctx.cart.state());
    Ok(())
}

/// Add a product.
///
/// # Errors
///
/// Returns `CliError::Cart` if the server rejects the add.
pub async fn add(ctx: &Context, product_id: ProductId, quantity: u32) -> Result<(), CliError> {
    ctx.session.init_auth().await;
    ctx.cart.add_item(product_id, quantity).await?;
    print_cart(&ctx.cart.state());
    Ok(())
}

/// Set a product's quantity.
///
/// # Errors
///
/// Returns `CliError::Cart` if the server rejects the update.
pub async fn set(ctx: &Context, product_id: ProductId, quantity: u32) -> Result<(), CliError> {
    ctx.session.init_auth().await;
    ctx.cart.fetch_cart().await?;
    ctx.cart.set_quantity(product_id, quantity).await?;
    print_cart(&ctx.cart.state());
    Ok(())
}

/// Remove a product.
///
/// # Errors
///
/// Returns `CliError::Cart` if the server rejects the removal.
pub async fn remove(ctx: &Context, product_id: ProductId) -> Result<(), CliError> {
    ctx.session.init_auth().await;
    ctx.cart.fetch_cart().await?;
    ctx.cart.remove_item(product_id).await?;
    print_cart(&ctx.cart.state());
    Ok(())
}

/// Empty the cart.
///
/// # Errors
///
/// Returns `CliError::Cart` if the server rejects the request.
#[allow(clippy::print_stdout)]
pub async fn clear(ctx: &Context) -> Result<(), CliError> {
    ctx.session.init_auth().await;
    ctx.cart.clear().await?;
    println!("Cart cleared");
    Ok(())
}

/// Print the server's cart summary.
///
/// # Errors
///
/// Returns `CliError::Cart` if the summary cannot be loaded.
#[allow(clippy::print_stdout)]
pub async fn summary(ctx: &Context) -> Result<(), CliError> {
    ctx.session.init_auth().await;
    let summary = ctx.cart.summary().await?;

    println!("{} items, total {}", summary.item_count, summary.total_price);
    if summary.has_errors {
        for problem in summary.validation_errors.unwrap_or_default() {
            println!("  ! {problem}");
        }
    }
    Ok(())
}

/// Print the server's item count. Prints 0 if it cannot be fetched.
#[allow(clippy::print_stdout)]
pub async fn count(ctx: &Context) {
    ctx.session.init_auth().await;
    println!("{}", ctx.cart.remote_item_count().await);
}
