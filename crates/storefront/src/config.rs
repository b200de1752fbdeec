//! Storefront SDK configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MAPLECART_TENANT_ID` - Tenant identifier sent on every request
//! - `MAPLECART_GATEWAY_KEY_ID` - Payment gateway publishable key id
//!
//! ## Optional
//! - `MAPLECART_BASE_URL` - Backend base URL (default: `http://localhost:5000`)
//! - `MAPLECART_TOKEN_FILE` - Path for the persisted bearer token; when unset
//!   the token lives in memory only

use std::path::PathBuf;

use thiserror::Error;
use url::Url;

const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront SDK configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Backend base URL.
    pub base_url: Url,
    /// Tenant identifier attached to every request.
    pub tenant_id: String,
    /// Payment gateway publishable key id (passed to the hosted payment UI).
    pub gateway_key_id: String,
    /// Optional path for persisting the bearer token across runs.
    pub token_file: Option<PathBuf>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let base_url = parse_base_url(
            "MAPLECART_BASE_URL",
            &get_env_or_default("MAPLECART_BASE_URL", DEFAULT_BASE_URL),
        )?;
        let tenant_id = get_required_env("MAPLECART_TENANT_ID")?;
        let gateway_key_id = get_required_env("MAPLECART_GATEWAY_KEY_ID")?;
        let token_file = get_optional_env("MAPLECART_TOKEN_FILE").map(PathBuf::from);

        Ok(Self {
            base_url,
            tenant_id,
            gateway_key_id,
            token_file,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse and validate a base URL.
fn parse_base_url(var_name: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("unsupported scheme: {}", url.scheme()),
        ));
    }

    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_url_valid() {
        let url = parse_base_url("TEST_VAR", "http://localhost:5000").unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/");

        let url = parse_base_url("TEST_VAR", "https://api.example.com").unwrap();
        assert_eq!(url.scheme(), "https");
    }

    #[test]
    fn test_parse_base_url_invalid() {
        let result = parse_base_url("TEST_VAR", "not a url");
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_parse_base_url_rejects_non_http_scheme() {
        let result = parse_base_url("TEST_VAR", "ftp://example.com");
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingEnvVar("MAPLECART_TENANT_ID".to_string());
        assert_eq!(
            err.to_string(),
            "Missing environment variable: MAPLECART_TENANT_ID"
        );
    }
}
