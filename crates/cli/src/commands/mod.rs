//! Command implementations and their shared wiring.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;

use std::path::PathBuf;

use thiserror::Error;

use maplecart_core::EmailError;
use maplecart_storefront::api::ApiClient;
use maplecart_storefront::checkout::CheckoutError;
use maplecart_storefront::config::{ConfigError, StorefrontConfig};
use maplecart_storefront::session::TokenStore;
use maplecart_storefront::StorefrontError;

/// Token file used when `MAPLECART_TOKEN_FILE` is not set, so sessions
/// survive between invocations.
const DEFAULT_TOKEN_FILE: &str = ".maplecart-token.json";

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storefront(#[from] StorefrontError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    #[error("{0}")]
    Invalid(String),

    #[error("Failed to read input: {0}")]
    Input(#[from] std::io::Error),
}

/// Shared wiring for every command: configuration, token store, API client.
pub struct Context {
    pub config: StorefrontConfig,
    pub tokens: TokenStore,
    pub client: ApiClient,
}

impl Context {
    /// Load configuration and build the API client.
    ///
    /// # Errors
    ///
    /// Returns `Config` when required environment variables are missing.
    pub fn load() -> Result<Self, CliError> {
        let config = StorefrontConfig::from_env()?;
        let token_file = config
            .token_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_FILE));
        let tokens = TokenStore::with_file(token_file);
        let client = ApiClient::new(&config, tokens.clone());

        Ok(Self {
            config,
            tokens,
            client,
        })
    }
}
