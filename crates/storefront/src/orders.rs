//! Order history: listing, cancellation, and per-item returns.
//!
//! Eligibility rules live here as pure functions over the order record so
//! the UI and the service paths agree: cancellation while the order is still
//! pending or processing, returns within a fixed window after a delivered
//! order was placed.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, instrument};

use maplecart_core::{OrderId, OrderItemId, OrderStatus};

use crate::api::ApiClient;
use crate::error::{Result, StorefrontError};
use crate::types::{
    CancelOrderRequest, CreateOrderRequest, Order, OrdersPage, ReturnRequestPayload,
};

/// Days after order placement during which a delivered item may be returned.
pub const RETURN_WINDOW_DAYS: i64 = 2;

/// Filters for the order-history listing.
#[derive(Debug, Clone, Default)]
pub struct OrderListFilter {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<OrderStatus>,
}

impl OrderListFilter {
    /// Render the filter as a query string, empty when no filter is set.
    #[must_use]
    pub fn query_string(&self) -> String {
        let mut params = Vec::new();
        if let Some(page) = self.page {
            params.push(format!("page={page}"));
        }
        if let Some(limit) = self.limit {
            params.push(format!("limit={limit}"));
        }
        if let Some(status) = self.status {
            params.push(format!("status={status}"));
        }

        if params.is_empty() {
            String::new()
        } else {
            format!("?{}", params.join("&"))
        }
    }
}

/// Backend surface for persisted orders.
pub trait OrderApi {
    /// Persist a new order.
    fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> impl Future<Output = Result<Order>> + Send;

    /// List the signed-in user's orders.
    fn list_orders(
        &self,
        filter: &OrderListFilter,
    ) -> impl Future<Output = Result<OrdersPage>> + Send;

    /// Fetch one order by id.
    fn fetch_order(&self, id: &OrderId) -> impl Future<Output = Result<Order>> + Send;

    /// Cancel an order with a reason.
    fn cancel_order(
        &self,
        id: &OrderId,
        request: &CancelOrderRequest,
    ) -> impl Future<Output = Result<()>> + Send;

    /// File a return request for one item on an order.
    fn request_return(
        &self,
        order_id: &OrderId,
        item_id: &OrderItemId,
        request: &ReturnRequestPayload,
    ) -> impl Future<Output = Result<()>> + Send;
}

impl OrderApi for ApiClient {
    async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order> {
        self.create("/api/orders", request).await
    }

    async fn list_orders(&self, filter: &OrderListFilter) -> Result<OrdersPage> {
        // Listing is a POST with filters in the query string
        let path = format!("/api/orders/list-by-user{}", filter.query_string());
        self.create(&path, &serde_json::json!({})).await
    }

    async fn fetch_order(&self, id: &OrderId) -> Result<Order> {
        self.fetch(&format!("/api/orders/{id}")).await
    }

    async fn cancel_order(&self, id: &OrderId, request: &CancelOrderRequest) -> Result<()> {
        self.create_unit(&format!("/api/orders/{id}/cancel"), request)
            .await
    }

    async fn request_return(
        &self,
        order_id: &OrderId,
        item_id: &OrderItemId,
        request: &ReturnRequestPayload,
    ) -> Result<()> {
        self.create_unit(
            &format!("/api/orders/{order_id}/items/{item_id}/return"),
            request,
        )
        .await
    }
}

/// Whether an order may still be cancelled.
#[must_use]
pub fn can_cancel(order: &Order) -> bool {
    order.status.can_cancel()
}

/// Whether items on an order may be returned at `now`: the order must be
/// delivered and within [`RETURN_WINDOW_DAYS`] of placement, inclusive.
#[must_use]
pub fn can_return(order: &Order, now: DateTime<Utc>) -> bool {
    order.status == OrderStatus::Delivered
        && now - order.created_at <= Duration::days(RETURN_WINDOW_DAYS)
}

/// Order-history service wrapping the backend with eligibility checks.
pub struct Orders<A> {
    api: A,
}

impl<A: OrderApi> Orders<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    /// List the user's orders.
    ///
    /// # Errors
    ///
    /// Returns the backend error on failure.
    #[instrument(skip(self))]
    pub async fn list(&self, filter: &OrderListFilter) -> Result<OrdersPage> {
        self.api.list_orders(filter).await
    }

    /// Fetch one order.
    ///
    /// # Errors
    ///
    /// Returns the backend error on failure.
    #[instrument(skip(self), fields(order = %id))]
    pub async fn get(&self, id: &OrderId) -> Result<Order> {
        self.api.fetch_order(id).await
    }

    /// Cancel an order, checking eligibility locally first.
    ///
    /// # Errors
    ///
    /// Returns `Validation` when the reason is blank or the order is past
    /// the cancellable statuses, otherwise the backend error.
    #[instrument(skip(self, reason), fields(order = %id))]
    pub async fn cancel(&self, id: &OrderId, reason: &str) -> Result<()> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(StorefrontError::Validation(
                "a cancellation reason is required".to_string(),
            ));
        }

        let order = self.api.fetch_order(id).await?;
        if !can_cancel(&order) {
            return Err(StorefrontError::Validation(format!(
                "orders in status {} cannot be cancelled",
                order.status
            )));
        }

        let request = CancelOrderRequest {
            reason: reason.to_string(),
        };
        self.api.cancel_order(id, &request).await?;
        info!(order = %id, "Order cancelled");
        Ok(())
    }

    /// File a return for one item, checking the return window locally first.
    ///
    /// # Errors
    ///
    /// Returns `Validation` when the reason is blank, the item already has a
    /// return filed, or the order is outside the return window; otherwise
    /// the backend error.
    #[instrument(skip(self, request), fields(order = %order_id, item = %item_id))]
    pub async fn request_return(
        &self,
        order_id: &OrderId,
        item_id: &OrderItemId,
        request: &ReturnRequestPayload,
    ) -> Result<()> {
        if request.reason.trim().is_empty() {
            return Err(StorefrontError::Validation(
                "a return reason is required".to_string(),
            ));
        }

        let order = self.api.fetch_order(order_id).await?;
        if !can_return(&order, Utc::now()) {
            return Err(StorefrontError::Validation(format!(
                "returns are only accepted within {RETURN_WINDOW_DAYS} days of a delivered order"
            )));
        }

        let item = order
            .order_items
            .iter()
            .find(|item| &item.id == item_id)
            .ok_or_else(|| StorefrontError::NotFound(format!("order item {item_id}")))?;
        if item.return_request.as_ref().is_some_and(|r| r.requested) {
            return Err(StorefrontError::Validation(
                "a return has already been requested for this item".to_string(),
            ));
        }

        self.api.request_return(order_id, item_id, request).await?;
        info!(order = %order_id, item = %item_id, "Return requested");
        Ok(())
    }
}
