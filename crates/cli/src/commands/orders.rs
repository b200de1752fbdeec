//! Order history commands: list, show, cancel, return.

use maplecart_core::{OrderId, OrderItemId, OrderStatus};
use maplecart_storefront::orders::{OrderListFilter, Orders, can_cancel, can_return};
use maplecart_storefront::types::ReturnRequestPayload;

use super::{CliError, Context};

/// List past orders.
pub async fn list(
    page: Option<u32>,
    limit: Option<u32>,
    status: Option<&str>,
) -> Result<(), CliError> {
    let ctx = Context::load()?;
    let orders = Orders::new(ctx.client);

    let status = status
        .map(|s| {
            s.parse::<OrderStatus>()
                .map_err(|_| CliError::Invalid(format!("unknown order status: {s}")))
        })
        .transpose()?;
    let filter = OrderListFilter {
        page,
        limit,
        status,
    };

    let listing = orders.list(&filter).await?;
    if listing.orders.is_empty() {
        tracing::info!("No orders");
        return Ok(());
    }

    for order in &listing.orders {
        tracing::info!(
            "{}  {}  {}  {} item(s)  placed {}",
            order.id,
            order.status,
            order.total_price,
            order.order_items.len(),
            order.created_at.format("%Y-%m-%d"),
        );
    }
    tracing::info!(
        "Page {} of {} ({} total)",
        listing.page,
        listing.pages,
        listing.total
    );
    Ok(())
}

/// Show one order in full.
pub async fn show(order: &str) -> Result<(), CliError> {
    let ctx = Context::load()?;
    let orders = Orders::new(ctx.client);

    let order = orders.get(&OrderId::new(order)).await?;
    tracing::info!("Order {}  {}  placed {}", order.id, order.status, order.created_at);
    for item in &order.order_items {
        let return_note = item
            .return_request
            .as_ref()
            .filter(|r| r.requested)
            .map(|r| format!("  [return: {:?}]", r.status))
            .unwrap_or_default();
        tracing::info!(
            "  {}  {} x{} @ {}{}",
            item.id,
            item.name,
            item.quantity,
            item.price,
            return_note
        );
    }
    tracing::info!(
        "Ship to: {}, {} {} ({})",
        order.shipping_address.address,
        order.shipping_address.city,
        order.shipping_address.postal_code,
        order.shipping_address.country
    );
    tracing::info!(
        "Shipping {}  Total {}  via {}",
        order.shipping_price,
        order.total_price,
        order.payment_method
    );
    if can_cancel(&order) {
        tracing::info!("This order can still be cancelled");
    }
    if can_return(&order, chrono::Utc::now()) {
        tracing::info!("Items on this order can be returned");
    }
    Ok(())
}

/// Cancel an order with a reason.
pub async fn cancel(order: &str, reason: &str) -> Result<(), CliError> {
    let ctx = Context::load()?;
    let orders = Orders::new(ctx.client);

    orders.cancel(&OrderId::new(order), reason).await?;
    tracing::info!("Order {order} cancelled");
    Ok(())
}

/// Request a return for one item on a delivered order.
pub async fn request_return(
    order: &str,
    item: &str,
    reason: &str,
    note: &str,
) -> Result<(), CliError> {
    let ctx = Context::load()?;
    let orders = Orders::new(ctx.client);

    let payload = ReturnRequestPayload {
        reason: reason.to_string(),
        images: Vec::new(),
        note: note.to_string(),
    };
    orders
        .request_return(&OrderId::new(order), &OrderItemId::new(item), &payload)
        .await?;
    tracing::info!("Return requested for item {item} on order {order}");
    Ok(())
}
