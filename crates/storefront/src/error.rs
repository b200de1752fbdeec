//! Unified error handling for the storefront SDK.
//!
//! Every failure path returns the caller to a retryable state; nothing here
//! is fatal to the process. Checkout carries its own error type
//! ([`crate::checkout::CheckoutError`]) because its partial-failure semantics
//! are phase-dependent.

use thiserror::Error;

/// Errors surfaced by the storefront SDK.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// HTTP transport failed (connection, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend returned a non-2xx status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code of the response.
        status: reqwest::StatusCode,
        /// Server message, taken from the response envelope when parseable.
        message: String,
    },

    /// Backend envelope reported failure or carried no data.
    #[error("Envelope error: {0}")]
    Envelope(String),

    /// Response body could not be parsed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The operation needs an authenticated session.
    #[error("Authentication required: {0}")]
    AuthRequired(String),

    /// Client-side input validation failed (e.g. empty coupon code).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Token file persistence failed.
    #[error("Token storage error: {0}")]
    TokenStorage(#[from] std::io::Error),
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorefrontError::AuthRequired("please log in".to_string());
        assert_eq!(err.to_string(), "Authentication required: please log in");

        let err = StorefrontError::Validation("coupon code cannot be empty".to_string());
        assert_eq!(
            err.to_string(),
            "Validation error: coupon code cannot be empty"
        );

        let err = StorefrontError::Api {
            status: reqwest::StatusCode::BAD_REQUEST,
            message: "invalid coupon".to_string(),
        };
        assert_eq!(err.to_string(), "API error (400 Bad Request): invalid coupon");
    }
}
