//! Cart store: the authoritative local mirror of the server-side cart.
//!
//! Every mutation is sent to the backend and followed by a full refetch, so
//! the local state always reflects what the server accepted (including stock
//! clamping the server may apply). Mutations track in-flight and failure
//! state per line item rather than per cart, so one failing line never blocks
//! the rest of the cart.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use rust_decimal::Decimal;
use tracing::{debug, instrument, warn};

use maplecart_core::{CartItemId, InventoryId, ProductId};

use crate::api::ApiClient;
use crate::error::{Result, StorefrontError};
use crate::lock;
use crate::pricing;
use crate::session::TokenStore;
use crate::types::{AddToCartRequest, CartPayload, LineItem, UpdateQuantityRequest};

/// Backend surface the cart store depends on.
pub trait CartApi {
    /// Fetch the full cart.
    fn fetch_cart(&self) -> impl Future<Output = Result<CartPayload>> + Send;

    /// Add a variant to the cart (or bump its quantity server-side).
    fn add_item(&self, request: &AddToCartRequest) -> impl Future<Output = Result<()>> + Send;

    /// Set the quantity of an existing line item.
    fn update_item(
        &self,
        item_id: &CartItemId,
        request: &UpdateQuantityRequest,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Remove a line item.
    fn remove_item(&self, item_id: &CartItemId) -> impl Future<Output = Result<()>> + Send;

    /// Empty the cart.
    fn clear_cart(&self) -> impl Future<Output = Result<()>> + Send;
}

impl CartApi for ApiClient {
    async fn fetch_cart(&self) -> Result<CartPayload> {
        self.fetch("/api/cart").await
    }

    async fn add_item(&self, request: &AddToCartRequest) -> Result<()> {
        self.create_unit("/api/cart", request).await
    }

    async fn update_item(
        &self,
        item_id: &CartItemId,
        request: &UpdateQuantityRequest,
    ) -> Result<()> {
        self.replace_unit(&format!("/api/cart/{item_id}"), request)
            .await
    }

    async fn remove_item(&self, item_id: &CartItemId) -> Result<()> {
        self.delete(&format!("/api/cart/{item_id}")).await
    }

    async fn clear_cart(&self) -> Result<()> {
        self.delete("/api/cart").await
    }
}

/// Derived view of the cart, recomputed on every read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSummary {
    /// Total units across all lines.
    pub item_count: u32,
    /// Sum of `price * quantity` across all lines.
    pub subtotal: Decimal,
}

/// Local mirror of the server-side cart.
///
/// Anonymous sessions always see an empty cart and have mutations refused;
/// the gate is the same token store the API client reads.
pub struct CartStore<C> {
    api: C,
    tokens: TokenStore,
    items: RwLock<Vec<LineItem>>,
    pending: RwLock<HashSet<CartItemId>>,
    errors: RwLock<HashMap<CartItemId, String>>,
    store_error: RwLock<Option<String>>,
}

impl<C: CartApi> CartStore<C> {
    /// Create an empty cart store.
    pub fn new(api: C, tokens: TokenStore) -> Self {
        Self {
            api,
            tokens,
            items: RwLock::new(Vec::new()),
            pending: RwLock::new(HashSet::new()),
            errors: RwLock::new(HashMap::new()),
            store_error: RwLock::new(None),
        }
    }

    /// Current line items.
    #[must_use]
    pub fn items(&self) -> Vec<LineItem> {
        lock::read(&self.items).clone()
    }

    /// Total units across all line items.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        lock::read(&self.items).iter().map(|item| item.quantity).sum()
    }

    /// Recompute the derived summary from the current lines.
    #[must_use]
    pub fn summary(&self) -> CartSummary {
        let items = lock::read(&self.items);
        CartSummary {
            item_count: items.iter().map(|item| item.quantity).sum(),
            subtotal: pricing::subtotal(&items),
        }
    }

    /// Last failure of a whole-cart operation (fetch or clear), if the most
    /// recent one failed.
    #[must_use]
    pub fn store_error(&self) -> Option<String> {
        lock::read(&self.store_error).clone()
    }

    /// Whether a mutation for this line is currently in flight.
    #[must_use]
    pub fn is_pending(&self, item_id: &CartItemId) -> bool {
        lock::read(&self.pending).contains(item_id)
    }

    /// Last failure message recorded for this line, if its most recent
    /// mutation failed.
    #[must_use]
    pub fn item_error(&self, item_id: &CartItemId) -> Option<String> {
        lock::read(&self.errors).get(item_id).cloned()
    }

    /// Re-sync the local mirror from the server.
    ///
    /// Anonymous sessions skip the network call and settle on an empty cart.
    ///
    /// # Errors
    ///
    /// Returns the backend error on a failed fetch; the local mirror is left
    /// unchanged in that case.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<()> {
        if !self.tokens.is_present() {
            lock::write(&self.items).clear();
            *lock::write(&self.store_error) = None;
            return Ok(());
        }

        match self.api.fetch_cart().await {
            Ok(payload) => {
                debug!(items = payload.items.len(), "Cart refreshed");
                *lock::write(&self.items) = payload.items;
                *lock::write(&self.store_error) = None;
                Ok(())
            }
            Err(e) => {
                *lock::write(&self.store_error) = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Add `quantity` units of a variant, then re-sync from the server.
    ///
    /// A zero quantity is a silent no-op with no network call.
    ///
    /// # Errors
    ///
    /// Returns `AuthRequired` for anonymous sessions, otherwise the backend
    /// error from the add or the follow-up fetch.
    #[instrument(skip(self), fields(product = %product_id, inventory = %inventory_id))]
    pub async fn add(
        &self,
        product_id: &ProductId,
        inventory_id: &InventoryId,
        quantity: u32,
    ) -> Result<()> {
        self.require_auth()?;
        if quantity == 0 {
            return Ok(());
        }

        let request = AddToCartRequest {
            product_id: product_id.clone(),
            quantity,
            inventory_id: inventory_id.clone(),
        };
        self.api.add_item(&request).await?;
        self.refresh().await
    }

    /// Set the quantity of a line item, then re-sync from the server.
    ///
    /// A zero quantity is a silent no-op with no network call; removal is an
    /// explicit separate operation. On failure the line keeps its previous
    /// quantity and the failure message is recorded against the line.
    ///
    /// # Errors
    ///
    /// Returns `AuthRequired` for anonymous sessions, otherwise the backend
    /// error from the update or the follow-up fetch.
    #[instrument(skip(self), fields(item = %item_id))]
    pub async fn update_quantity(&self, item_id: &CartItemId, quantity: u32) -> Result<()> {
        self.require_auth()?;
        if quantity == 0 {
            return Ok(());
        }

        self.begin_mutation(item_id);
        let request = UpdateQuantityRequest { quantity };
        let result = self.api.update_item(item_id, &request).await;
        self.finish_mutation(item_id, result).await
    }

    /// Remove a line item, then re-sync from the server.
    ///
    /// # Errors
    ///
    /// Returns `AuthRequired` for anonymous sessions, otherwise the backend
    /// error from the removal or the follow-up fetch.
    #[instrument(skip(self), fields(item = %item_id))]
    pub async fn remove(&self, item_id: &CartItemId) -> Result<()> {
        self.require_auth()?;

        self.begin_mutation(item_id);
        let result = self.api.remove_item(item_id).await;
        self.finish_mutation(item_id, result).await
    }

    /// Empty the cart on the server and locally.
    ///
    /// # Errors
    ///
    /// Returns `AuthRequired` for anonymous sessions, otherwise the backend
    /// error; the local mirror is left unchanged on failure.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        self.require_auth()?;

        if let Err(e) = self.api.clear_cart().await {
            *lock::write(&self.store_error) = Some(e.to_string());
            return Err(e);
        }
        self.reset();
        Ok(())
    }

    /// Drop all local state without touching the server. Used on logout.
    pub fn reset(&self) {
        lock::write(&self.items).clear();
        lock::write(&self.pending).clear();
        lock::write(&self.errors).clear();
        *lock::write(&self.store_error) = None;
    }

    fn require_auth(&self) -> Result<()> {
        if self.tokens.is_present() {
            Ok(())
        } else {
            Err(StorefrontError::AuthRequired(
                "cart mutations require a signed-in session".to_string(),
            ))
        }
    }

    fn begin_mutation(&self, item_id: &CartItemId) {
        lock::write(&self.pending).insert(item_id.clone());
        lock::write(&self.errors).remove(item_id);
    }

    async fn finish_mutation(&self, item_id: &CartItemId, result: Result<()>) -> Result<()> {
        let outcome = match result {
            Ok(()) => self.refresh().await,
            Err(e) => Err(e),
        };

        lock::write(&self.pending).remove(item_id);
        if let Err(e) = &outcome {
            warn!(item = %item_id, error = %e, "Cart mutation failed");
            lock::write(&self.errors).insert(item_id.clone(), e.to_string());
        }

        outcome
    }
}
