//! Checkout command: drives the payment flow end to end.
//!
//! The hosted payment UI runs in a browser, outside this process. The
//! command stages the flow, prints what the gateway needs, then reads the
//! authorization identifiers from stdin once the operator has completed the
//! payment. Failures after authorization are retried in place so a captured
//! payment is never abandoned.

use std::io::BufRead;

use maplecart_core::{AddressId, GatewayPaymentId};
use maplecart_storefront::address::AddressApi;
use maplecart_storefront::cart::CartStore;
use maplecart_storefront::checkout::{CheckoutFlow, PaymentAuthorization};
use maplecart_storefront::coupon::DiscountResolver;
use maplecart_storefront::pricing::subtotal;
use maplecart_storefront::session::SessionStore;

use super::{CliError, Context};

/// Steps retried after payment capture before giving up and printing the
/// reconciliation identifiers.
const MAX_RETRIES: u32 = 3;

/// Check out the current cart against a saved address.
pub async fn run(address: &str, coupon: Option<&str>) -> Result<(), CliError> {
    let ctx = Context::load()?;

    let session = SessionStore::new(ctx.client.clone(), ctx.tokens.clone());
    let maplecart_storefront::session::SessionState::Authenticated { user } =
        session.initialize().await
    else {
        return Err(CliError::Invalid(
            "not signed in; run `maple auth login` first".to_string(),
        ));
    };

    let cart = CartStore::new(ctx.client.clone(), ctx.tokens.clone());
    cart.refresh().await?;
    let items = cart.items();
    if items.is_empty() {
        return Err(CliError::Invalid("cart is empty".to_string()));
    }

    let resolver = DiscountResolver::new(ctx.client.clone(), ctx.client.clone());
    let discount = match coupon {
        Some(code) => resolver.apply_code(code, subtotal(&items)).await?.amount,
        None => {
            // An account-attached coupon applies automatically
            resolver
                .resolve_account_coupon(subtotal(&items))
                .await?
                .map_or(rust_decimal::Decimal::ZERO, |applied| applied.amount)
        }
    };

    let shipping = ctx
        .client
        .fetch_address(&AddressId::new(address))
        .await?
        .shipping_snapshot();

    let mut flow = CheckoutFlow::new(
        ctx.client.clone(),
        ctx.client.clone(),
        ctx.config.gateway_key_id.clone(),
        &items,
        discount,
    )?;

    let quote = flow.quote().clone();
    tracing::info!(
        "Quote: subtotal {}  shipping {}  discount {}  total {}",
        quote.subtotal,
        quote.shipping,
        quote.discount,
        quote.total
    );

    let intent = flow.begin(&user).await?;
    tracing::info!(
        "Gateway order {} created for {} {} (key {})",
        intent.gateway_order.order_id,
        intent.gateway_order.amount,
        intent.gateway_order.currency,
        intent.key_id
    );
    tracing::info!("Complete the payment in the gateway's checkout, then enter:");

    let stdin = std::io::stdin();
    let payment_id = prompt(&stdin, "payment id")?;
    let signature = prompt(&stdin, "signature")?;

    flow.authorize(PaymentAuthorization {
        gateway_order_id: intent.gateway_order.order_id.clone(),
        gateway_payment_id: GatewayPaymentId::new(payment_id),
        gateway_signature: signature,
    })?;

    let order = finish(&mut flow, &shipping).await?;
    cart.clear().await?;
    tracing::info!("Order {} placed and verified. Total {}", order.id, order.total_price);
    Ok(())
}

/// Drive an authorized flow to completion, retrying retryable failures.
async fn finish<P, O>(
    flow: &mut CheckoutFlow<P, O>,
    shipping: &maplecart_storefront::types::ShippingAddress,
) -> Result<maplecart_storefront::types::Order, CliError>
where
    P: maplecart_storefront::checkout::PaymentApi,
    O: maplecart_storefront::orders::OrderApi,
{
    let mut attempts = 0;
    loop {
        match flow.complete(shipping).await {
            Ok(order) => return Ok(order),
            Err(e) if e.is_retryable() && attempts < MAX_RETRIES => {
                attempts += 1;
                tracing::warn!("{e}; retrying ({attempts}/{MAX_RETRIES})");
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        "Payment was captured but the order could not be finalized in phase {}. \
                         Reconcile with the gateway before retrying.",
                        e.phase
                    );
                }
                return Err(e.into());
            }
        }
    }
}

fn prompt(stdin: &std::io::Stdin, label: &str) -> Result<String, CliError> {
    tracing::info!("{label}: ");
    let mut line = String::new();
    stdin.lock().read_line(&mut line)?;
    let value = line.trim().to_string();
    if value.is_empty() {
        return Err(CliError::Invalid(format!("{label} is required")));
    }
    Ok(value)
}
