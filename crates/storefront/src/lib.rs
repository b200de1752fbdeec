//! Maplecart Storefront SDK - typed client for the storefront REST backend.
//!
//! # Architecture
//!
//! - The backend is the source of truth for stock, pricing, and coupon
//!   legality; this crate orchestrates and never merges local state across a
//!   mutation (every cart change is followed by a wholesale refetch).
//! - All HTTP traffic goes through one chokepoint, [`api::ApiClient`], which
//!   attaches the tenant header and bearer token and unwraps the backend's
//!   uniform `{success, message?, data?}` envelope.
//! - Stores are owned values injected into consumers, not ambient globals:
//!   [`session::SessionStore`] gates [`cart::CartStore`]; the cart feeds
//!   [`pricing`]; [`coupon::DiscountResolver`] supplies the discount term;
//!   [`checkout::CheckoutFlow`] drives the payment gateway hand-off.
//! - Backend surfaces are traits (`AuthApi`, `CartApi`, `CouponApi`,
//!   `OrderApi`, `PaymentApi`, `AddressApi`, `CatalogApi`) implemented by
//!   `ApiClient`, so stores can be tested against in-memory fakes.
//!
//! # Example
//!
//! ```rust,ignore
//! use maplecart_storefront::api::ApiClient;
//! use maplecart_storefront::cart::CartStore;
//! use maplecart_storefront::config::StorefrontConfig;
//! use maplecart_storefront::session::{SessionStore, TokenStore};
//!
//! let config = StorefrontConfig::from_env()?;
//! let tokens = TokenStore::in_memory();
//! let client = ApiClient::new(&config, tokens.clone());
//!
//! let session = SessionStore::new(client.clone(), tokens.clone());
//! session.login(&"user@example.com".parse()?, "hunter2!").await?;
//!
//! let cart = CartStore::new(client.clone(), tokens);
//! cart.refresh().await?;
//! println!("{} items", cart.item_count());
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod address;
pub mod api;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod coupon;
pub mod error;
pub mod orders;
pub mod pricing;
pub mod session;
pub mod types;

pub(crate) mod lock;

pub use error::{Result, StorefrontError};
