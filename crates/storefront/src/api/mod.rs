//! Remote data gateway for the storefront REST backend.
//!
//! All HTTP traffic goes through [`ApiClient`]: it attaches the tenant
//! header to every request and a bearer token (read from the shared
//! [`TokenStore`](crate::session::TokenStore) at request-construction time)
//! to every request outside the public path prefix, then unwraps the uniform
//! response envelope. Because the token is captured when the request is
//! built, a logout takes effect on the next call, not on in-flight ones.

mod envelope;

pub use envelope::Envelope;

use std::sync::Arc;

use reqwest::Method;
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{error, instrument};
use url::Url;

use crate::config::StorefrontConfig;
use crate::error::{Result, StorefrontError};
use crate::session::TokenStore;

/// Header carrying the tenant identifier, sent on every request.
pub const TENANT_HEADER: &str = "x-company-id";

/// Path prefix for endpoints that never receive the bearer token.
const PUBLIC_PREFIX: &str = "/api/public/";

/// HTTP client for the storefront backend.
///
/// Cheap to clone; clones share the underlying connection pool and token
/// store.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    tenant_id: String,
    tokens: TokenStore,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("tenant_id", &self.inner.tenant_id)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new API client.
    #[must_use]
    pub fn new(config: &StorefrontConfig, tokens: TokenStore) -> Self {
        Self {
            inner: Arc::new(ApiClientInner {
                client: reqwest::Client::new(),
                base_url: config.base_url.clone(),
                tenant_id: config.tenant_id.clone(),
                tokens,
            }),
        }
    }

    /// Whether a bearer token is currently held. Catalog reads use this to
    /// pick between the authenticated and public endpoints.
    #[must_use]
    pub fn has_session(&self) -> bool {
        self.inner.tokens.is_present()
    }

    /// GET a resource and unwrap its envelope.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-2xx status, or an
    /// unsuccessful or data-free envelope.
    #[instrument(skip(self), fields(path = %path))]
    pub async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute::<T>(self.request(Method::GET, path)?)
            .await?
            .into_data()
    }

    /// GET an endpoint whose acknowledgement carries no payload.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-2xx status, or an
    /// unsuccessful envelope.
    #[instrument(skip(self), fields(path = %path))]
    pub async fn fetch_unit(&self, path: &str) -> Result<()> {
        self.execute::<serde_json::Value>(self.request(Method::GET, path)?)
            .await?
            .into_unit()
    }

    /// POST a resource and unwrap the created payload.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-2xx status, or an
    /// unsuccessful or data-free envelope.
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn create<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.execute::<T>(self.request(Method::POST, path)?.json(body))
            .await?
            .into_data()
    }

    /// POST a mutation whose acknowledgement carries no payload.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-2xx status, or an
    /// unsuccessful envelope.
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn create_unit<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        self.execute::<serde_json::Value>(self.request(Method::POST, path)?.json(body))
            .await?
            .into_unit()
    }

    /// PUT a resource and unwrap the replaced payload.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-2xx status, or an
    /// unsuccessful or data-free envelope.
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn replace<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.execute::<T>(self.request(Method::PUT, path)?.json(body))
            .await?
            .into_data()
    }

    /// PUT a mutation whose acknowledgement carries no payload.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-2xx status, or an
    /// unsuccessful envelope.
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn replace_unit<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        self.execute::<serde_json::Value>(self.request(Method::PUT, path)?.json(body))
            .await?
            .into_unit()
    }

    /// DELETE a resource; the acknowledgement carries no payload.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-2xx status, or an
    /// unsuccessful envelope.
    #[instrument(skip(self), fields(path = %path))]
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.execute::<serde_json::Value>(self.request(Method::DELETE, path)?)
            .await?
            .into_unit()
    }

    /// Build a request with the tenant header and, outside the public
    /// prefix, the bearer token.
    fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder> {
        let url = self
            .inner
            .base_url
            .join(path)
            .map_err(|e| StorefrontError::Validation(format!("invalid request path {path}: {e}")))?;

        let mut request = self
            .inner
            .client
            .request(method, url)
            .header(TENANT_HEADER, &self.inner.tenant_id);

        if !path.starts_with(PUBLIC_PREFIX)
            && let Some(token) = self.inner.tokens.get()
        {
            request = request.bearer_auth(token.expose_secret());
        }

        Ok(request)
    }

    /// Send a request and parse its envelope.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Envelope<T>> {
        let response = request.send().await?;
        let status = response.status();

        // Body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            // Prefer the envelope message when the error body is parseable
            let message = serde_json::from_str::<Envelope<serde_json::Value>>(&body)
                .ok()
                .and_then(|envelope| envelope.message)
                .unwrap_or_else(|| body.chars().take(200).collect());
            error!(status = %status, message = %message, "Backend returned non-success status");
            return Err(StorefrontError::Api { status, message });
        }

        serde_json::from_str(&body).map_err(|e| {
            error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            StorefrontError::Parse(e)
        })
    }
}
