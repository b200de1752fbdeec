//! Wire types for the storefront backend.
//!
//! These are read-only projections of backend documents plus the request
//! payloads the SDK sends. Field names follow the backend's camelCase wire
//! shape; object ids arrive as `_id`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use maplecart_core::{
    AddressId, AddressKind, CartItemId, CategoryId, CouponId, CouponStatus, CurrencyCode,
    DiscountType, Email, GatewayOrderId, GatewayPaymentId, InventoryId, OrderId, OrderItemId,
    OrderStatus, ProductId, ReturnStatus, UserId,
};

// =============================================================================
// Users & Sessions
// =============================================================================

/// Raw user document as the backend returns it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: UserId,
    /// Single display name; split into first/last during normalization.
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub is_email_verified: bool,
    /// Coupons the backend has attached to this account.
    #[serde(default)]
    pub discount_coupons: Vec<AppliedCouponRef>,
}

/// A coupon reference on the user profile's discount-coupon list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedCouponRef {
    #[serde(default)]
    pub coupon_id: Option<CouponId>,
    #[serde(default)]
    pub status: CouponStatus,
}

/// Normalized user record held by the session store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub avatar: Option<String>,
}

impl User {
    /// Normalize a backend profile: the single `name` is split at the first
    /// space into first/last.
    #[must_use]
    pub fn from_profile(profile: &UserProfile) -> Self {
        let mut parts = profile.name.splitn(2, ' ');
        let first_name = parts.next().unwrap_or_default().to_string();
        let last_name = parts.next().unwrap_or_default().to_string();

        Self {
            id: profile.id.clone(),
            email: profile.email.clone(),
            first_name,
            last_name,
            phone: profile.phone.clone(),
            avatar: profile.avatar.clone(),
        }
    }

    /// Display name for payment prefill and greetings.
    #[must_use]
    pub fn full_name(&self) -> String {
        if self.last_name.is_empty() {
            self.first_name.clone()
        } else {
            format!("{} {}", self.first_name, self.last_name)
        }
    }
}

/// Login request body.
#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub email: Email,
    pub password: String,
}

/// Register request body.
#[derive(Debug, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: Email,
    pub password: String,
}

/// Login response payload: the user document with a token alongside.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    pub token: String,
    #[serde(flatten)]
    pub profile: UserProfile,
}

// =============================================================================
// Cart
// =============================================================================

/// One product-variant-quantity entry in the cart.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(rename = "_id")]
    pub id: CartItemId,
    /// The purchasable variant this line references, embedded by the backend.
    #[serde(rename = "inventoryId")]
    pub inventory: InventoryVariant,
    pub quantity: u32,
}

/// A purchasable SKU of a product, carrying its own price and stock ceiling.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryVariant {
    #[serde(rename = "_id")]
    pub id: InventoryId,
    pub price: Decimal,
    /// Stock ceiling; authoritative only server-side.
    #[serde(default)]
    pub stock: u32,
    #[serde(rename = "productId")]
    pub product: ProductRef,
}

/// Product fields embedded inside an inventory variant.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRef {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// Cart payload as returned by the cart endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CartPayload {
    #[serde(default)]
    pub items: Vec<LineItem>,
}

/// Add-to-cart request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    pub quantity: u32,
    pub inventory_id: InventoryId,
}

/// Quantity-update request body.
#[derive(Debug, Serialize)]
pub struct UpdateQuantityRequest {
    pub quantity: u32,
}

// =============================================================================
// Coupons
// =============================================================================

/// Read-only projection of a backend coupon.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    #[serde(rename = "_id")]
    pub id: CouponId,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    #[serde(default)]
    pub min_purchase: Decimal,
    pub expiration_date: DateTime<Utc>,
    pub status: CouponStatus,
}

/// Coupon validation request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCouponRequest {
    pub code: String,
    pub purchase_amount: Decimal,
}

/// Server-computed validation result for a coupon against a purchase amount.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponValidation {
    pub coupon: Coupon,
    pub discount_amount: Decimal,
    #[serde(default)]
    pub final_amount: Option<Decimal>,
}

// =============================================================================
// Orders
// =============================================================================

/// A persisted order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: OrderId,
    #[serde(default)]
    pub status: OrderStatus,
    pub order_items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    #[serde(default)]
    pub tax_price: Decimal,
    #[serde(default)]
    pub shipping_price: Decimal,
    pub total_price: Decimal,
    #[serde(default)]
    pub payment_result: Option<PaymentResult>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A line on a persisted order: a snapshot at order time, independent of
/// live inventory.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(rename = "_id")]
    pub id: OrderItemId,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub image: Option<String>,
    pub inventory: InventoryId,
    #[serde(default)]
    pub return_request: Option<ReturnRequest>,
}

/// Per-item return request state.
#[derive(Debug, Clone, Deserialize)]
pub struct ReturnRequest {
    pub requested: bool,
    #[serde(default)]
    pub status: ReturnStatus,
}

/// Gateway transaction record attached to a paid order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    #[serde(default)]
    pub gateway_order_id: Option<GatewayOrderId>,
    #[serde(default)]
    pub gateway_payment_id: Option<GatewayPaymentId>,
    #[serde(default)]
    pub status: Option<String>,
}

/// One page of the user's order history.
#[derive(Debug, Clone, Deserialize)]
pub struct OrdersPage {
    pub orders: Vec<Order>,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub total: u64,
}

/// Order line as submitted at checkout: inventory reference and quantity
/// only; the backend snapshots name/price/image.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItemPayload {
    pub inventory: InventoryId,
    pub quantity: u32,
}

/// Order creation request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub order_items: Vec<OrderItemPayload>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub tax_price: Decimal,
    pub shipping_price: Decimal,
    pub total_price: Decimal,
}

/// Cancellation request body.
#[derive(Debug, Serialize)]
pub struct CancelOrderRequest {
    pub reason: String,
}

/// Per-item return request body.
#[derive(Debug, Serialize)]
pub struct ReturnRequestPayload {
    pub reason: String,
    pub images: Vec<String>,
    pub note: String,
}

// =============================================================================
// Payments
// =============================================================================

/// Gateway order creation request; the amount is in minor units.
#[derive(Debug, Serialize)]
pub struct GatewayOrderRequest {
    pub amount: i64,
}

/// Payment-provider-side transaction record, created before the hosted
/// payment UI is shown.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayOrder {
    pub order_id: GatewayOrderId,
    pub amount: i64,
    pub currency: CurrencyCode,
}

/// Payment verification request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    pub gateway_order_id: GatewayOrderId,
    pub gateway_payment_id: GatewayPaymentId,
    pub gateway_signature: String,
    pub order_id: OrderId,
}

// =============================================================================
// Catalog
// =============================================================================

/// A product as listed in the browsable catalog.
///
/// Price and stock are optional on the wire; the public endpoints omit them
/// for products without a published inventory.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub stock: Option<u32>,
    #[serde(default)]
    pub slug: Option<String>,
}

/// One page of the product listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductsPage {
    pub products: Vec<Product>,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub total: u32,
}

/// A catalog category.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
}

// =============================================================================
// Addresses
// =============================================================================

/// A saved address with its own lifecycle, referenced by orders only as an
/// immutable snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(rename = "_id")]
    pub id: AddressId,
    #[serde(rename = "type", default)]
    pub kind: AddressKind,
    #[serde(default)]
    pub is_default: bool,
    pub name: String,
    pub phone: String,
    pub address: PostalAddress,
}

impl Address {
    /// Snapshot this address into the immutable shape an order embeds.
    #[must_use]
    pub fn shipping_snapshot(&self) -> ShippingAddress {
        ShippingAddress {
            address: self.address.street.clone(),
            city: self.address.city.clone(),
            postal_code: self.address.postal_code.clone(),
            country: self.address.country.clone(),
            phone: self.phone.clone(),
            id: Some(self.id.clone()),
        }
    }
}

/// Structured postal fields of a saved address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostalAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

/// Address create/update request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressRequest {
    #[serde(rename = "type")]
    pub kind: AddressKind,
    pub name: String,
    pub phone: String,
    pub address: PostalAddress,
    pub is_default: bool,
}

/// Shipping address snapshot embedded in an order. The `id` is present when
/// the snapshot came from a saved address and absent for manual entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AddressId>,
}
