//! Pricing aggregator: pure arithmetic over cart lines and a resolved
//! discount.
//!
//! Everything here is display math. The server recomputes and enforces
//! pricing at order time; these figures exist so the client can show a
//! consistent quote before checkout.

use rust_decimal::Decimal;

use maplecart_core::round_cents;

use crate::types::LineItem;

/// Subtotal above which shipping is free.
#[must_use]
pub fn free_shipping_threshold() -> Decimal {
    Decimal::new(5000, 2)
}

/// Flat shipping rate below the free-shipping threshold.
#[must_use]
pub fn flat_shipping_rate() -> Decimal {
    Decimal::new(599, 2)
}

/// Sum of `price * quantity` across all lines.
#[must_use]
pub fn subtotal(items: &[LineItem]) -> Decimal {
    round_cents(
        items
            .iter()
            .map(|item| item.inventory.price * Decimal::from(item.quantity))
            .sum(),
    )
}

/// Shipping charge for a given subtotal. Free strictly above the threshold,
/// flat rate otherwise. An empty cart still quotes the flat rate; callers
/// gate on emptiness before showing a quote.
#[must_use]
pub fn shipping_for(subtotal: Decimal) -> Decimal {
    if subtotal > free_shipping_threshold() {
        Decimal::ZERO
    } else {
        flat_shipping_rate()
    }
}

/// A complete price quote for the current cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    /// Sum of line prices before shipping and discount.
    pub subtotal: Decimal,
    /// Shipping charge derived from the subtotal.
    pub shipping: Decimal,
    /// Applied discount, clamped so the total never goes negative.
    pub discount: Decimal,
    /// Amount due: `subtotal + shipping - discount`.
    pub total: Decimal,
}

impl Quote {
    /// Quote a cart with a server-resolved discount amount.
    ///
    /// The discount is clamped to `subtotal + shipping`; a discount larger
    /// than the payable amount yields a zero total, never a negative one.
    #[must_use]
    pub fn new(items: &[LineItem], discount: Decimal) -> Self {
        let subtotal = subtotal(items);
        let shipping = shipping_for(subtotal);
        let payable = subtotal + shipping;
        let discount = round_cents(discount.max(Decimal::ZERO).min(payable));

        Self {
            subtotal,
            shipping,
            discount,
            total: round_cents(payable - discount),
        }
    }

    /// Quote a cart with no discount.
    #[must_use]
    pub fn without_discount(items: &[LineItem]) -> Self {
        Self::new(items, Decimal::ZERO)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(price: &str, quantity: u32) -> LineItem {
        serde_json::from_value(serde_json::json!({
            "_id": format!("ci-{price}-{quantity}"),
            "inventoryId": {
                "_id": "inv1",
                "price": price,
                "stock": 99,
                "productId": {"_id": "p1", "name": "Product"}
            },
            "quantity": quantity,
        }))
        .unwrap()
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_subtotal_sums_lines() {
        let items = vec![item("25.00", 2), item("9.99", 1)];
        assert_eq!(subtotal(&items), dec("59.99"));
    }

    #[test]
    fn test_shipping_free_strictly_above_threshold() {
        assert_eq!(shipping_for(dec("50.01")), Decimal::ZERO);
        assert_eq!(shipping_for(dec("100.00")), Decimal::ZERO);
    }

    #[test]
    fn test_shipping_charged_at_and_below_threshold() {
        assert_eq!(shipping_for(dec("50.00")), dec("5.99"));
        assert_eq!(shipping_for(dec("10.00")), dec("5.99"));
        assert_eq!(shipping_for(Decimal::ZERO), dec("5.99"));
    }

    #[test]
    fn test_quote_below_threshold_adds_shipping() {
        let items = vec![item("20.00", 2)];
        let quote = Quote::without_discount(&items);

        assert_eq!(quote.subtotal, dec("40.00"));
        assert_eq!(quote.shipping, dec("5.99"));
        assert_eq!(quote.total, dec("45.99"));
    }

    #[test]
    fn test_quote_above_threshold_ships_free() {
        let items = vec![item("30.00", 2)];
        let quote = Quote::without_discount(&items);

        assert_eq!(quote.subtotal, dec("60.00"));
        assert_eq!(quote.shipping, Decimal::ZERO);
        assert_eq!(quote.total, dec("60.00"));
    }

    #[test]
    fn test_quote_applies_discount() {
        let items = vec![item("30.00", 2)];
        let quote = Quote::new(&items, dec("10.00"));

        assert_eq!(quote.discount, dec("10.00"));
        assert_eq!(quote.total, dec("50.00"));
    }

    #[test]
    fn test_discount_clamped_to_payable_amount() {
        let items = vec![item("10.00", 1)];
        let quote = Quote::new(&items, dec("100.00"));

        // Payable is 10.00 + 5.99; the discount cannot exceed it
        assert_eq!(quote.discount, dec("15.99"));
        assert_eq!(quote.total, Decimal::ZERO);
    }

    #[test]
    fn test_negative_discount_treated_as_zero() {
        let items = vec![item("10.00", 1)];
        let quote = Quote::new(&items, dec("-5.00"));

        assert_eq!(quote.discount, Decimal::ZERO);
        assert_eq!(quote.total, dec("15.99"));
    }

    #[test]
    fn test_discount_can_cross_shipping_threshold_without_changing_shipping() {
        // Shipping keys off the subtotal, not the discounted amount
        let items = vec![item("60.00", 1)];
        let quote = Quote::new(&items, dec("20.00"));

        assert_eq!(quote.shipping, Decimal::ZERO);
        assert_eq!(quote.total, dec("40.00"));
    }
}
