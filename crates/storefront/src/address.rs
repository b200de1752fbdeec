//! Saved address book.
//!
//! Addresses have their own lifecycle; orders only ever embed an immutable
//! snapshot taken at checkout (see
//! [`Address::shipping_snapshot`](crate::types::Address::shipping_snapshot)).

use maplecart_core::AddressId;

use crate::api::ApiClient;
use crate::error::Result;
use crate::types::{Address, AddressRequest};

/// Backend surface for the signed-in user's address book.
pub trait AddressApi {
    /// List all saved addresses.
    fn list_addresses(&self) -> impl Future<Output = Result<Vec<Address>>> + Send;

    /// Fetch one saved address.
    fn fetch_address(&self, id: &AddressId) -> impl Future<Output = Result<Address>> + Send;

    /// Save a new address.
    fn create_address(
        &self,
        request: &AddressRequest,
    ) -> impl Future<Output = Result<Address>> + Send;

    /// Replace a saved address.
    fn update_address(
        &self,
        id: &AddressId,
        request: &AddressRequest,
    ) -> impl Future<Output = Result<Address>> + Send;

    /// Delete a saved address.
    fn delete_address(&self, id: &AddressId) -> impl Future<Output = Result<()>> + Send;

    /// Mark one address as the default; the backend clears the flag on the
    /// others.
    fn set_default_address(&self, id: &AddressId) -> impl Future<Output = Result<Address>> + Send;
}

impl AddressApi for ApiClient {
    async fn list_addresses(&self) -> Result<Vec<Address>> {
        self.fetch("/api/addresses").await
    }

    async fn fetch_address(&self, id: &AddressId) -> Result<Address> {
        self.fetch(&format!("/api/addresses/{id}")).await
    }

    async fn create_address(&self, request: &AddressRequest) -> Result<Address> {
        self.create("/api/addresses", request).await
    }

    async fn update_address(&self, id: &AddressId, request: &AddressRequest) -> Result<Address> {
        self.replace(&format!("/api/addresses/{id}"), request).await
    }

    async fn delete_address(&self, id: &AddressId) -> Result<()> {
        self.delete(&format!("/api/addresses/{id}")).await
    }

    async fn set_default_address(&self, id: &AddressId) -> Result<Address> {
        self.replace(&format!("/api/addresses/{id}/default"), &serde_json::json!({}))
            .await
    }
}
