//! The backend's uniform response envelope.
//!
//! Every endpoint wraps its payload in `{success, message?, data?}`. The
//! unwrapping contract is uniform across all call sites: callers always
//! receive `data`, and a `success: false` or a missing `data` field is an
//! error carrying the server's message.

use serde::Deserialize;

use crate::error::{Result, StorefrontError};

/// Response envelope returned by every backend endpoint.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Human-readable server message, usually present on failure.
    #[serde(default)]
    pub message: Option<String>,
    /// The payload; absent on failure and on data-free acknowledgements.
    #[serde(default = "default_data")]
    pub data: Option<T>,
}

// `#[serde(default)]` would require `T: Default`; `Option` always has one.
fn default_data<T>() -> Option<T> {
    None
}

impl<T> Envelope<T> {
    /// Unwrap the envelope into its payload.
    ///
    /// # Errors
    ///
    /// Returns `Envelope` if `success` is false or `data` is absent.
    pub fn into_data(self) -> Result<T> {
        if !self.success {
            return Err(StorefrontError::Envelope(
                self.message
                    .unwrap_or_else(|| "request was not successful".to_string()),
            ));
        }

        self.data
            .ok_or_else(|| StorefrontError::Envelope("response carried no data".to_string()))
    }

    /// Unwrap an acknowledgement envelope, discarding any payload.
    ///
    /// # Errors
    ///
    /// Returns `Envelope` if `success` is false.
    pub fn into_unit(self) -> Result<()> {
        if self.success {
            Ok(())
        } else {
            Err(StorefrontError::Envelope(
                self.message
                    .unwrap_or_else(|| "request was not successful".to_string()),
            ))
        }
    }
}
