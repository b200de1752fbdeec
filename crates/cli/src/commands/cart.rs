//! Cart commands: show, add, update, remove, clear, coupon management.

use maplecart_core::{CartItemId, CouponId, InventoryId, ProductId};
use maplecart_storefront::cart::CartStore;
use maplecart_storefront::coupon::DiscountResolver;
use maplecart_storefront::pricing::{Quote, subtotal};

use super::{CliError, Context};

/// Show the cart with a price quote.
pub async fn show() -> Result<(), CliError> {
    let ctx = Context::load()?;
    let cart = CartStore::new(ctx.client, ctx.tokens);
    cart.refresh().await?;

    let items = cart.items();
    if items.is_empty() {
        tracing::info!("Cart is empty");
        return Ok(());
    }

    for item in &items {
        tracing::info!(
            "{}  {} x{} @ {} ({})",
            item.id,
            item.inventory.product.name,
            item.quantity,
            item.inventory.price,
            item.inventory.id,
        );
    }

    let quote = Quote::without_discount(&items);
    tracing::info!(
        "Subtotal {}  Shipping {}  Total {}",
        quote.subtotal,
        quote.shipping,
        quote.total
    );
    Ok(())
}

/// Add a variant to the cart.
pub async fn add(product: &str, inventory: &str, quantity: u32) -> Result<(), CliError> {
    let ctx = Context::load()?;
    let cart = CartStore::new(ctx.client, ctx.tokens);

    cart.add(
        &ProductId::new(product),
        &InventoryId::new(inventory),
        quantity,
    )
    .await?;
    tracing::info!("Added. Cart now holds {} units", cart.item_count());
    Ok(())
}

/// Set the quantity of a cart line.
pub async fn update(item: &str, quantity: u32) -> Result<(), CliError> {
    let ctx = Context::load()?;
    let cart = CartStore::new(ctx.client, ctx.tokens);
    cart.refresh().await?;

    cart.update_quantity(&CartItemId::new(item), quantity).await?;
    tracing::info!("Updated. Cart now holds {} units", cart.item_count());
    Ok(())
}

/// Remove a cart line.
pub async fn remove(item: &str) -> Result<(), CliError> {
    let ctx = Context::load()?;
    let cart = CartStore::new(ctx.client, ctx.tokens);
    cart.refresh().await?;

    cart.remove(&CartItemId::new(item)).await?;
    tracing::info!("Removed. Cart now holds {} units", cart.item_count());
    Ok(())
}

/// Empty the cart.
pub async fn clear() -> Result<(), CliError> {
    let ctx = Context::load()?;
    let cart = CartStore::new(ctx.client, ctx.tokens);

    cart.clear().await?;
    tracing::info!("Cart cleared");
    Ok(())
}

/// Validate a coupon code against the current cart subtotal.
pub async fn apply_coupon(code: &str) -> Result<(), CliError> {
    let ctx = Context::load()?;
    let cart = CartStore::new(ctx.client.clone(), ctx.tokens);
    cart.refresh().await?;

    let resolver = DiscountResolver::new(ctx.client.clone(), ctx.client);
    let applied = resolver.apply_code(code, subtotal(&cart.items())).await?;

    let quote = Quote::new(&cart.items(), applied.amount);
    tracing::info!(
        "Coupon {} applied: -{}  (new total {})",
        applied.coupon.code,
        applied.amount,
        quote.total
    );
    Ok(())
}

/// Detach a coupon from the account.
pub async fn remove_coupon(coupon: &str) -> Result<(), CliError> {
    let ctx = Context::load()?;
    let resolver = DiscountResolver::new(ctx.client.clone(), ctx.client);

    resolver.remove(&CouponId::new(coupon)).await?;
    tracing::info!("Coupon removed");
    Ok(())
}
