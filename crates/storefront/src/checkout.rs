//! Checkout orchestrator: an explicit state machine over the payment flow.
//!
//! The flow is `Idle -> IntentCreated -> PaymentAuthorized -> OrderPersisted
//! -> Verified`. The payment gateway captures money between `IntentCreated`
//! and `PaymentAuthorized`, inside its hosted UI and outside this process.
//! Every failure after authorization is therefore retryable in place: the
//! flow stays in its current state and the same step can be re-driven until
//! the backend accepts it, so a captured payment is never silently dropped.
//!
//! The hosted payment UI itself is the host application's concern. The flow
//! hands out a [`PaymentIntent`] to open it with and accepts the resulting
//! [`PaymentAuthorization`] from its success callback.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, instrument, warn};

use maplecart_core::{GatewayOrderId, GatewayPaymentId, to_minor_units};

use crate::api::ApiClient;
use crate::error::{Result, StorefrontError};
use crate::orders::OrderApi;
use crate::pricing::Quote;
use crate::types::{
    CreateOrderRequest, GatewayOrder, GatewayOrderRequest, LineItem, Order, OrderItemPayload,
    ShippingAddress, User, VerifyPaymentRequest,
};

/// Payment method tag recorded on orders created by this flow.
pub const PAYMENT_METHOD: &str = "gateway";

/// Backend surface for the payment gateway integration.
pub trait PaymentApi {
    /// Create a provider-side transaction record for an amount in minor
    /// units.
    fn create_gateway_order(
        &self,
        request: &GatewayOrderRequest,
    ) -> impl Future<Output = Result<GatewayOrder>> + Send;

    /// Submit the gateway's transaction identifiers for signature
    /// verification against a persisted order.
    fn verify_payment(
        &self,
        request: &VerifyPaymentRequest,
    ) -> impl Future<Output = Result<()>> + Send;
}

impl PaymentApi for ApiClient {
    async fn create_gateway_order(&self, request: &GatewayOrderRequest) -> Result<GatewayOrder> {
        self.create("/api/orders/payments/gateway-order", request)
            .await
    }

    async fn verify_payment(&self, request: &VerifyPaymentRequest) -> Result<()> {
        self.create_unit("/api/orders/payments/verify", request)
            .await
    }
}

/// Milestones of the checkout state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutPhase {
    /// Nothing started yet.
    Idle,
    /// A gateway order exists; the hosted payment UI may be opened.
    IntentCreated,
    /// The gateway reported a captured payment. Money has moved.
    PaymentAuthorized,
    /// The backend order record exists and awaits verification.
    OrderPersisted,
    /// The payment signature was verified. The flow is complete.
    Verified,
}

impl std::fmt::Display for CheckoutPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let phase = match self {
            Self::Idle => "idle",
            Self::IntentCreated => "intent-created",
            Self::PaymentAuthorized => "payment-authorized",
            Self::OrderPersisted => "order-persisted",
            Self::Verified => "verified",
        };
        f.write_str(phase)
    }
}

/// A checkout step failure, tagged with the phase the flow was in.
#[derive(Debug, Error)]
#[error("checkout failed in phase {phase}: {source}")]
pub struct CheckoutError {
    /// Phase the flow was in when the step failed; the flow is still in it.
    pub phase: CheckoutPhase,
    #[source]
    pub source: StorefrontError,
}

impl CheckoutError {
    /// Whether the failed step may be retried on the same flow. True once
    /// the payment is authorized: money has been captured and abandoning
    /// the flow would drop it.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self.phase,
            CheckoutPhase::PaymentAuthorized | CheckoutPhase::OrderPersisted
        )
    }
}

/// Everything the host needs to open the hosted payment UI.
#[derive(Debug, Clone)]
pub struct PaymentIntent {
    /// The provider-side transaction record.
    pub gateway_order: GatewayOrder,
    /// Publishable key id for the gateway client.
    pub key_id: String,
    /// Customer fields prefilled into the payment form.
    pub prefill: PaymentPrefill,
}

/// Customer prefill for the hosted payment UI.
#[derive(Debug, Clone)]
pub struct PaymentPrefill {
    pub name: String,
    pub email: String,
    pub contact: Option<String>,
}

impl PaymentPrefill {
    #[must_use]
    pub fn from_user(user: &User) -> Self {
        Self {
            name: user.full_name(),
            email: user.email.clone(),
            contact: user.phone.clone(),
        }
    }
}

/// Transaction identifiers delivered by the gateway's success callback.
#[derive(Debug, Clone)]
pub struct PaymentAuthorization {
    pub gateway_order_id: GatewayOrderId,
    pub gateway_payment_id: GatewayPaymentId,
    pub gateway_signature: String,
}

enum FlowState {
    Idle,
    IntentCreated {
        gateway_order: GatewayOrder,
    },
    PaymentAuthorized {
        authorization: PaymentAuthorization,
    },
    OrderPersisted {
        authorization: PaymentAuthorization,
        order: Order,
    },
    Verified {
        order: Order,
    },
}

/// A single checkout attempt. One flow drives one purchase to completion;
/// the cart is untouched throughout and cleared by the caller only after
/// [`CheckoutFlow::verify`] succeeds.
pub struct CheckoutFlow<P, O> {
    payments: P,
    orders: O,
    key_id: String,
    quote: Quote,
    order_items: Vec<OrderItemPayload>,
    state: FlowState,
}

impl<P: PaymentApi, O: OrderApi> CheckoutFlow<P, O> {
    /// Stage a checkout for the given cart lines and resolved discount.
    ///
    /// # Errors
    ///
    /// Returns `Validation` when the cart is empty or the total does not
    /// fit in minor units.
    pub fn new(
        payments: P,
        orders: O,
        key_id: String,
        items: &[LineItem],
        discount: Decimal,
    ) -> Result<Self> {
        if items.is_empty() {
            return Err(StorefrontError::Validation(
                "cannot check out an empty cart".to_string(),
            ));
        }

        let quote = Quote::new(items, discount);
        if to_minor_units(quote.total).is_none() {
            return Err(StorefrontError::Validation(format!(
                "total {} cannot be expressed in minor units",
                quote.total
            )));
        }

        let order_items = items
            .iter()
            .map(|item| OrderItemPayload {
                inventory: item.inventory.id.clone(),
                quantity: item.quantity,
            })
            .collect();

        Ok(Self {
            payments,
            orders,
            key_id,
            quote,
            order_items,
            state: FlowState::Idle,
        })
    }

    /// Current phase of the flow.
    #[must_use]
    pub const fn phase(&self) -> CheckoutPhase {
        match self.state {
            FlowState::Idle => CheckoutPhase::Idle,
            FlowState::IntentCreated { .. } => CheckoutPhase::IntentCreated,
            FlowState::PaymentAuthorized { .. } => CheckoutPhase::PaymentAuthorized,
            FlowState::OrderPersisted { .. } => CheckoutPhase::OrderPersisted,
            FlowState::Verified { .. } => CheckoutPhase::Verified,
        }
    }

    /// The quote this flow was staged with.
    #[must_use]
    pub const fn quote(&self) -> &Quote {
        &self.quote
    }

    /// Create the gateway order and hand back what the hosted payment UI
    /// needs. Before authorization nothing has been charged, so a failure
    /// here simply aborts the flow.
    ///
    /// # Errors
    ///
    /// Returns a non-retryable `CheckoutError` when the flow is not idle or
    /// the gateway order cannot be created.
    #[instrument(skip(self, user))]
    pub async fn begin(&mut self, user: &User) -> std::result::Result<PaymentIntent, CheckoutError> {
        if !matches!(self.state, FlowState::Idle) {
            return Err(self.invalid_transition("begin"));
        }

        // Checked in the constructor
        let amount = to_minor_units(self.quote.total).unwrap_or_default();
        let request = GatewayOrderRequest { amount };
        let gateway_order = self
            .payments
            .create_gateway_order(&request)
            .await
            .map_err(|source| self.fail(source))?;

        info!(gateway_order = %gateway_order.order_id, amount, "Gateway order created");
        let intent = PaymentIntent {
            gateway_order: gateway_order.clone(),
            key_id: self.key_id.clone(),
            prefill: PaymentPrefill::from_user(user),
        };
        self.state = FlowState::IntentCreated { gateway_order };
        Ok(intent)
    }

    /// Accept the gateway's success callback. From this point on the
    /// payment is captured and the flow must be driven to completion.
    ///
    /// # Errors
    ///
    /// Returns a non-retryable `CheckoutError` when the flow has no open
    /// intent or the callback references a different gateway order.
    #[instrument(skip(self, authorization))]
    pub fn authorize(
        &mut self,
        authorization: PaymentAuthorization,
    ) -> std::result::Result<(), CheckoutError> {
        let FlowState::IntentCreated { gateway_order } = &self.state else {
            return Err(self.invalid_transition("authorize"));
        };

        if authorization.gateway_order_id != gateway_order.order_id {
            return Err(self.fail(StorefrontError::Validation(format!(
                "authorization is for gateway order {}, expected {}",
                authorization.gateway_order_id, gateway_order.order_id
            ))));
        }

        info!(payment = %authorization.gateway_payment_id, "Payment authorized");
        self.state = FlowState::PaymentAuthorized { authorization };
        Ok(())
    }

    /// Create the backend order record for the authorized payment.
    ///
    /// # Errors
    ///
    /// Returns a retryable `CheckoutError` on backend failure; the flow
    /// stays in `PaymentAuthorized` and this step may be called again.
    #[instrument(skip(self, shipping))]
    pub async fn persist_order(
        &mut self,
        shipping: &ShippingAddress,
    ) -> std::result::Result<(), CheckoutError> {
        let FlowState::PaymentAuthorized { authorization } = &self.state else {
            return Err(self.invalid_transition("persist_order"));
        };
        let authorization = authorization.clone();

        let request = CreateOrderRequest {
            order_items: self.order_items.clone(),
            shipping_address: shipping.clone(),
            payment_method: PAYMENT_METHOD.to_string(),
            tax_price: Decimal::ZERO,
            shipping_price: self.quote.shipping,
            total_price: self.quote.total,
        };

        match self.orders.create_order(&request).await {
            Ok(order) => {
                info!(order = %order.id, "Order persisted");
                self.state = FlowState::OrderPersisted {
                    authorization,
                    order,
                };
                Ok(())
            }
            Err(source) => {
                warn!(error = %source, "Order persistence failed after payment capture");
                Err(self.fail(source))
            }
        }
    }

    /// Verify the captured payment's signature against the persisted order,
    /// completing the flow.
    ///
    /// # Errors
    ///
    /// Returns a retryable `CheckoutError` on backend failure; the flow
    /// stays in `OrderPersisted` and this step may be called again.
    #[instrument(skip(self))]
    pub async fn verify(&mut self) -> std::result::Result<Order, CheckoutError> {
        let FlowState::OrderPersisted {
            authorization,
            order,
        } = &self.state
        else {
            return Err(self.invalid_transition("verify"));
        };
        let order = order.clone();

        let request = VerifyPaymentRequest {
            gateway_order_id: authorization.gateway_order_id.clone(),
            gateway_payment_id: authorization.gateway_payment_id.clone(),
            gateway_signature: authorization.gateway_signature.clone(),
            order_id: order.id.clone(),
        };

        match self.payments.verify_payment(&request).await {
            Ok(()) => {
                info!(order = %order.id, "Payment verified");
                self.state = FlowState::Verified {
                    order: order.clone(),
                };
                Ok(order)
            }
            Err(source) => {
                warn!(error = %source, "Payment verification failed");
                Err(self.fail(source))
            }
        }
    }

    /// Drive an authorized flow to completion: persist the order, then
    /// verify the payment.
    ///
    /// # Errors
    ///
    /// Returns the first step failure; since both steps run after payment
    /// capture the error is retryable and `complete` may be called again,
    /// resuming from the step that failed.
    pub async fn complete(
        &mut self,
        shipping: &ShippingAddress,
    ) -> std::result::Result<Order, CheckoutError> {
        if matches!(self.state, FlowState::PaymentAuthorized { .. }) {
            self.persist_order(shipping).await?;
        }
        self.verify().await
    }

    /// The verified order, once the flow has completed.
    #[must_use]
    pub fn order(&self) -> Option<&Order> {
        match &self.state {
            FlowState::OrderPersisted { order, .. } | FlowState::Verified { order } => Some(order),
            _ => None,
        }
    }

    fn fail(&self, source: StorefrontError) -> CheckoutError {
        CheckoutError {
            phase: self.phase(),
            source,
        }
    }

    fn invalid_transition(&self, step: &str) -> CheckoutError {
        self.fail(StorefrontError::Validation(format!(
            "cannot {step} while checkout is in phase {}",
            self.phase()
        )))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::orders::OrderListFilter;
    use crate::types::OrdersPage;
    use maplecart_core::CurrencyCode;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    fn line_item(price: &str, quantity: u32) -> LineItem {
        serde_json::from_value(serde_json::json!({
            "_id": "ci1",
            "inventoryId": {
                "_id": "inv1",
                "price": price,
                "stock": 99,
                "productId": {"_id": "p1", "name": "Canvas Tote"}
            },
            "quantity": quantity,
        }))
        .unwrap()
    }

    fn persisted_order() -> Order {
        serde_json::from_value(serde_json::json!({
            "_id": "o1",
            "status": "pending",
            "orderItems": [],
            "shippingAddress": {
                "address": "1 Main St",
                "city": "Springfield",
                "postalCode": "62701",
                "country": "USA",
                "phone": "555-0100",
            },
            "paymentMethod": PAYMENT_METHOD,
            "totalPrice": "55.99",
            "createdAt": "2026-03-01T12:00:00Z",
        }))
        .unwrap()
    }

    fn user() -> User {
        User {
            id: maplecart_core::UserId::new("u1"),
            email: "ada@example.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            phone: Some("555-0100".to_string()),
            avatar: None,
        }
    }

    fn shipping() -> ShippingAddress {
        ShippingAddress {
            address: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            postal_code: "62701".to_string(),
            country: "USA".to_string(),
            phone: "555-0100".to_string(),
            id: None,
        }
    }

    fn authorization() -> PaymentAuthorization {
        PaymentAuthorization {
            gateway_order_id: GatewayOrderId::new("gw-1"),
            gateway_payment_id: GatewayPaymentId::new("pay-1"),
            gateway_signature: "sig".to_string(),
        }
    }

    #[derive(Default)]
    struct FakePaymentApi {
        created_amounts: Mutex<Vec<i64>>,
        fail_verification: AtomicBool,
        verify_calls: AtomicU32,
    }

    impl PaymentApi for &FakePaymentApi {
        async fn create_gateway_order(
            &self,
            request: &GatewayOrderRequest,
        ) -> Result<GatewayOrder> {
            self.created_amounts.lock().unwrap().push(request.amount);
            Ok(GatewayOrder {
                order_id: GatewayOrderId::new("gw-1"),
                amount: request.amount,
                currency: CurrencyCode::USD,
            })
        }

        async fn verify_payment(&self, _request: &VerifyPaymentRequest) -> Result<()> {
            self.verify_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_verification.load(Ordering::SeqCst) {
                return Err(StorefrontError::Api {
                    status: reqwest::StatusCode::BAD_GATEWAY,
                    message: "verification backend unavailable".to_string(),
                });
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeOrderApi {
        fail_creation: AtomicBool,
        create_calls: AtomicU32,
    }

    impl OrderApi for &FakeOrderApi {
        async fn create_order(&self, _request: &CreateOrderRequest) -> Result<Order> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_creation.load(Ordering::SeqCst) {
                return Err(StorefrontError::Api {
                    status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                    message: "order store unavailable".to_string(),
                });
            }
            Ok(persisted_order())
        }

        async fn list_orders(&self, _filter: &OrderListFilter) -> Result<OrdersPage> {
            unimplemented!("not used by checkout")
        }

        async fn fetch_order(&self, _id: &maplecart_core::OrderId) -> Result<Order> {
            unimplemented!("not used by checkout")
        }

        async fn cancel_order(
            &self,
            _id: &maplecart_core::OrderId,
            _request: &crate::types::CancelOrderRequest,
        ) -> Result<()> {
            unimplemented!("not used by checkout")
        }

        async fn request_return(
            &self,
            _order_id: &maplecart_core::OrderId,
            _item_id: &maplecart_core::OrderItemId,
            _request: &crate::types::ReturnRequestPayload,
        ) -> Result<()> {
            unimplemented!("not used by checkout")
        }
    }

    fn flow<'a>(
        payments: &'a FakePaymentApi,
        orders: &'a FakeOrderApi,
    ) -> CheckoutFlow<&'a FakePaymentApi, &'a FakeOrderApi> {
        CheckoutFlow::new(
            payments,
            orders,
            "key_test".to_string(),
            &[line_item("25.00", 2)],
            Decimal::ZERO,
        )
        .unwrap()
    }

    #[test]
    fn test_empty_cart_is_refused() {
        let payments = FakePaymentApi::default();
        let orders = FakeOrderApi::default();
        let result = CheckoutFlow::new(
            &payments,
            &orders,
            "key_test".to_string(),
            &[],
            Decimal::ZERO,
        );
        assert!(matches!(result, Err(StorefrontError::Validation(_))));
    }

    #[tokio::test]
    async fn test_begin_charges_total_in_minor_units() {
        let payments = FakePaymentApi::default();
        let orders = FakeOrderApi::default();
        let mut flow = flow(&payments, &orders);

        let intent = flow.begin(&user()).await.unwrap();
        // 25.00 * 2 + 5.99 shipping = 55.99 -> 5599 minor units
        assert_eq!(intent.gateway_order.amount, 5599);
        assert_eq!(intent.prefill.name, "Ada Lovelace");
        assert_eq!(flow.phase(), CheckoutPhase::IntentCreated);
    }

    #[tokio::test]
    async fn test_full_flow_reaches_verified() {
        let payments = FakePaymentApi::default();
        let orders = FakeOrderApi::default();
        let mut flow = flow(&payments, &orders);

        flow.begin(&user()).await.unwrap();
        flow.authorize(authorization()).unwrap();
        flow.persist_order(&shipping()).await.unwrap();
        let order = flow.verify().await.unwrap();

        assert_eq!(flow.phase(), CheckoutPhase::Verified);
        assert_eq!(order.payment_method, PAYMENT_METHOD);
    }

    #[tokio::test]
    async fn test_authorization_for_wrong_gateway_order_is_rejected() {
        let payments = FakePaymentApi::default();
        let orders = FakeOrderApi::default();
        let mut flow = flow(&payments, &orders);
        flow.begin(&user()).await.unwrap();

        let mut wrong = authorization();
        wrong.gateway_order_id = GatewayOrderId::new("gw-other");
        let err = flow.authorize(wrong).unwrap_err();

        assert!(!err.is_retryable());
        assert_eq!(flow.phase(), CheckoutPhase::IntentCreated);
    }

    #[tokio::test]
    async fn test_failed_persist_is_retryable_in_place() {
        let payments = FakePaymentApi::default();
        let orders = FakeOrderApi::default();
        orders.fail_creation.store(true, Ordering::SeqCst);
        let mut flow = flow(&payments, &orders);

        flow.begin(&user()).await.unwrap();
        flow.authorize(authorization()).unwrap();

        let err = flow.persist_order(&shipping()).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.phase, CheckoutPhase::PaymentAuthorized);
        assert_eq!(flow.phase(), CheckoutPhase::PaymentAuthorized);

        // Backend recovers; the same flow resumes without a new charge
        orders.fail_creation.store(false, Ordering::SeqCst);
        let order = flow.complete(&shipping()).await.unwrap();
        assert_eq!(flow.phase(), CheckoutPhase::Verified);
        assert_eq!(order.id, maplecart_core::OrderId::new("o1"));
        assert_eq!(payments.created_amounts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_verification_is_retryable_in_place() {
        let payments = FakePaymentApi::default();
        let orders = FakeOrderApi::default();
        payments.fail_verification.store(true, Ordering::SeqCst);
        let mut flow = flow(&payments, &orders);

        flow.begin(&user()).await.unwrap();
        flow.authorize(authorization()).unwrap();
        flow.persist_order(&shipping()).await.unwrap();

        let err = flow.verify().await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(flow.phase(), CheckoutPhase::OrderPersisted);

        payments.fail_verification.store(false, Ordering::SeqCst);
        flow.verify().await.unwrap();
        assert_eq!(flow.phase(), CheckoutPhase::Verified);
        // Persisting was not repeated on retry
        assert_eq!(orders.create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_steps_out_of_order_are_refused() {
        let payments = FakePaymentApi::default();
        let orders = FakeOrderApi::default();
        let mut flow = flow(&payments, &orders);

        assert!(flow.authorize(authorization()).is_err());
        assert!(flow.persist_order(&shipping()).await.is_err());
        assert!(flow.verify().await.is_err());
        assert_eq!(flow.phase(), CheckoutPhase::Idle);
    }

    #[tokio::test]
    async fn test_discount_reduces_charged_amount() {
        let payments = FakePaymentApi::default();
        let orders = FakeOrderApi::default();
        let mut flow = CheckoutFlow::new(
            &payments,
            &orders,
            "key_test".to_string(),
            &[line_item("30.00", 2)],
            Decimal::new(1000, 2),
        )
        .unwrap();

        flow.begin(&user()).await.unwrap();
        // 60.00 free shipping, minus 10.00 discount -> 5000 minor units
        assert_eq!(payments.created_amounts.lock().unwrap().as_slice(), [5000]);
    }
}
