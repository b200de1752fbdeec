//! Session store: authenticated identity and the persisted bearer token.
//!
//! The [`TokenStore`] is the one piece of process-wide mutable state: it is
//! read at request-construction time by the API client and written only by
//! the session store's login/logout paths. The [`SessionStore`] is the state
//! machine `Anonymous -> Authenticating -> Authenticated`, falling back to
//! `Anonymous` whenever a persisted token fails validation at startup.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use maplecart_core::Email;

use crate::api::ApiClient;
use crate::error::{Result, StorefrontError};
use crate::lock;
use crate::types::{LoginData, LoginRequest, RegisterRequest, User, UserProfile};

// =============================================================================
// TokenStore
// =============================================================================

/// On-disk shape of the persisted token file.
#[derive(Serialize, Deserialize)]
struct PersistedToken {
    token: String,
}

/// Shared cell for the bearer token, optionally persisted to a JSON file so
/// a session survives restarts.
///
/// Cheap to clone; clones share the same cell.
#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<TokenStoreInner>,
}

struct TokenStoreInner {
    path: Option<PathBuf>,
    token: RwLock<Option<SecretString>>,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("path", &self.inner.path)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl TokenStore {
    /// Create a token store with no persistence.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(TokenStoreInner {
                path: None,
                token: RwLock::new(None),
            }),
        }
    }

    /// Create a token store persisted at `path`, loading any token already
    /// stored there. An unreadable or malformed file is treated as no token.
    #[must_use]
    pub fn with_file(path: PathBuf) -> Self {
        let token = std::fs::read_to_string(&path)
            .ok()
            .and_then(|contents| serde_json::from_str::<PersistedToken>(&contents).ok())
            .map(|persisted| SecretString::from(persisted.token));

        if token.is_some() {
            debug!(path = %path.display(), "Loaded persisted session token");
        }

        Self {
            inner: Arc::new(TokenStoreInner {
                path: Some(path),
                token: RwLock::new(token),
            }),
        }
    }

    /// Current token, if any.
    #[must_use]
    pub fn get(&self) -> Option<SecretString> {
        lock::read(&self.inner.token).clone()
    }

    /// Whether a token is present.
    #[must_use]
    pub fn is_present(&self) -> bool {
        lock::read(&self.inner.token).is_some()
    }

    /// Store a token, persisting it when a file path is configured.
    ///
    /// # Errors
    ///
    /// Returns `TokenStorage` if writing the token file fails; the in-memory
    /// token is updated regardless.
    pub fn set(&self, token: SecretString) -> Result<()> {
        *lock::write(&self.inner.token) = Some(token.clone());

        if let Some(path) = &self.inner.path {
            let persisted = PersistedToken {
                token: token.expose_secret().to_string(),
            };
            let contents = serde_json::to_string(&persisted)?;
            std::fs::write(path, contents)?;
        }

        Ok(())
    }

    /// Drop the token unconditionally. Never fails: a file removal error is
    /// logged and ignored so logout always succeeds.
    pub fn clear(&self) {
        *lock::write(&self.inner.token) = None;

        if let Some(path) = &self.inner.path
            && path.exists()
            && let Err(e) = std::fs::remove_file(path)
        {
            warn!(path = %path.display(), error = %e, "Failed to remove persisted token file");
        }
    }
}

// =============================================================================
// SessionStore
// =============================================================================

/// Authentication lifecycle of the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No session; the cart is forced empty and mutations are refused.
    Anonymous,
    /// Startup validation of a persisted token is in flight.
    Authenticating,
    /// A validated session with its normalized user record.
    Authenticated {
        /// The signed-in user.
        user: User,
    },
}

/// Backend surface the session store depends on.
pub trait AuthApi {
    /// Exchange credentials for a token and user document.
    fn login(
        &self,
        request: &LoginRequest,
    ) -> impl Future<Output = Result<LoginData>> + Send;

    /// Create an account; the account stays pending until email verification.
    fn register(
        &self,
        request: &RegisterRequest,
    ) -> impl Future<Output = Result<UserProfile>> + Send;

    /// Fetch the profile of the user the current token belongs to.
    fn current_user(&self) -> impl Future<Output = Result<UserProfile>> + Send;

    /// Verify an email address with the token from the verification mail.
    fn verify_email(&self, token: &str) -> impl Future<Output = Result<()>> + Send;

    /// Resend the verification mail.
    fn resend_verification(&self, email: &Email) -> impl Future<Output = Result<()>> + Send;
}

impl AuthApi for ApiClient {
    async fn login(&self, request: &LoginRequest) -> Result<LoginData> {
        self.create("/api/auth/login", request).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<UserProfile> {
        self.create("/api/auth/register", request).await
    }

    async fn current_user(&self) -> Result<UserProfile> {
        self.fetch("/api/auth/me").await
    }

    async fn verify_email(&self, token: &str) -> Result<()> {
        self.fetch_unit(&format!("/api/auth/verify-email?token={token}"))
            .await
    }

    async fn resend_verification(&self, email: &Email) -> Result<()> {
        #[derive(Serialize)]
        struct ResendRequest<'a> {
            email: &'a Email,
        }

        self.create_unit("/api/auth/resend-verification", &ResendRequest { email })
            .await
    }
}

/// Owns the authenticated identity for the process.
///
/// Injected into consumers rather than accessed as an ambient global; the
/// cart store gates on the same [`TokenStore`] this writes to.
pub struct SessionStore<A> {
    api: A,
    tokens: TokenStore,
    state: RwLock<SessionState>,
}

impl<A: AuthApi> SessionStore<A> {
    /// Create a session store in the `Anonymous` state.
    pub fn new(api: A, tokens: TokenStore) -> Self {
        Self {
            api,
            tokens,
            state: RwLock::new(SessionState::Anonymous),
        }
    }

    /// One-shot startup validation of a persisted token.
    ///
    /// With no persisted token this settles in `Anonymous`. Otherwise the
    /// current-user profile is fetched; success transitions to
    /// `Authenticated`, and any failure (network or rejection) clears all
    /// persisted session state and settles in `Anonymous`.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> SessionState {
        if !self.tokens.is_present() {
            *lock::write(&self.state) = SessionState::Anonymous;
            return SessionState::Anonymous;
        }

        *lock::write(&self.state) = SessionState::Authenticating;

        match self.api.current_user().await {
            Ok(profile) => {
                let user = User::from_profile(&profile);
                info!(user_id = %user.id, "Session restored from persisted token");
                let state = SessionState::Authenticated { user };
                *lock::write(&self.state) = state.clone();
                state
            }
            Err(e) => {
                warn!(error = %e, "Persisted token failed validation, clearing session");
                self.logout();
                SessionState::Anonymous
            }
        }
    }

    /// Log in with credentials, persisting the token and normalized user.
    ///
    /// # Errors
    ///
    /// Returns the backend error on rejected credentials or transport
    /// failure; the session state is left unchanged in that case.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &Email, password: &str) -> Result<User> {
        let request = LoginRequest {
            email: email.clone(),
            password: password.to_string(),
        };

        let data = self.api.login(&request).await?;
        let user = User::from_profile(&data.profile);

        self.tokens.set(SecretString::from(data.token))?;
        *lock::write(&self.state) = SessionState::Authenticated { user: user.clone() };
        info!(user_id = %user.id, "Logged in");

        Ok(user)
    }

    /// Register a new account. Does not establish a session; the user must
    /// verify their email first.
    ///
    /// # Errors
    ///
    /// Returns the backend error on rejection or transport failure.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn register(&self, name: &str, email: &Email, password: &str) -> Result<UserProfile> {
        let request = RegisterRequest {
            name: name.to_string(),
            email: email.clone(),
            password: password.to_string(),
        };

        self.api.register(&request).await
    }

    /// Log out: clears all session state unconditionally and synchronously.
    /// No network call is made or required to succeed.
    pub fn logout(&self) {
        self.tokens.clear();
        *lock::write(&self.state) = SessionState::Anonymous;
        debug!("Logged out");
    }

    /// Re-fetch the current user's profile. On any failure the session is
    /// logged out before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the session is `Anonymous` afterwards.
    #[instrument(skip(self))]
    pub async fn refresh_user(&self) -> Result<User> {
        if !self.tokens.is_present() {
            return Err(StorefrontError::AuthRequired(
                "no active session to refresh".to_string(),
            ));
        }

        match self.api.current_user().await {
            Ok(profile) => {
                let user = User::from_profile(&profile);
                *lock::write(&self.state) = SessionState::Authenticated { user: user.clone() };
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, "Failed to refresh user, logging out");
                self.logout();
                Err(e)
            }
        }
    }

    /// Whether a validated session exists (token present and user loaded).
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.tokens.is_present()
            && matches!(&*lock::read(&self.state), SessionState::Authenticated { .. })
    }

    /// The signed-in user, if any.
    #[must_use]
    pub fn user(&self) -> Option<User> {
        match &*lock::read(&self.state) {
            SessionState::Authenticated { user } => Some(user.clone()),
            _ => None,
        }
    }

    /// Current state of the session machine.
    #[must_use]
    pub fn state(&self) -> SessionState {
        lock::read(&self.state).clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fake backend: configurable responses, counts calls.
    #[derive(Default)]
    struct FakeAuthApi {
        login_token: Option<String>,
        current_user_fails: bool,
        current_user_calls: AtomicU32,
    }

    fn profile_json() -> UserProfile {
        serde_json::from_str(
            r#"{"_id": "u1", "name": "Ada Lovelace", "email": "ada@example.com"}"#,
        )
        .unwrap()
    }

    impl AuthApi for &FakeAuthApi {
        async fn login(&self, _request: &LoginRequest) -> Result<LoginData> {
            match &self.login_token {
                Some(token) => Ok(LoginData {
                    token: token.clone(),
                    profile: profile_json(),
                }),
                None => Err(StorefrontError::Api {
                    status: reqwest::StatusCode::UNAUTHORIZED,
                    message: "Invalid credentials".to_string(),
                }),
            }
        }

        async fn register(&self, _request: &RegisterRequest) -> Result<UserProfile> {
            Ok(profile_json())
        }

        async fn current_user(&self) -> Result<UserProfile> {
            self.current_user_calls.fetch_add(1, Ordering::SeqCst);
            if self.current_user_fails {
                Err(StorefrontError::Api {
                    status: reqwest::StatusCode::UNAUTHORIZED,
                    message: "Token expired".to_string(),
                })
            } else {
                Ok(profile_json())
            }
        }

        async fn verify_email(&self, _token: &str) -> Result<()> {
            Ok(())
        }

        async fn resend_verification(&self, _email: &Email) -> Result<()> {
            Ok(())
        }
    }

    fn email() -> Email {
        "ada@example.com".parse().unwrap()
    }

    #[tokio::test]
    async fn test_initialize_without_token_is_anonymous() {
        let api = FakeAuthApi::default();
        let session = SessionStore::new(&api, TokenStore::in_memory());

        assert_eq!(session.initialize().await, SessionState::Anonymous);
        assert_eq!(api.current_user_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_initialize_with_valid_token_authenticates() {
        let api = FakeAuthApi::default();
        let tokens = TokenStore::in_memory();
        tokens.set(SecretString::from("jwt")).unwrap();

        let session = SessionStore::new(&api, tokens);
        let state = session.initialize().await;

        assert!(matches!(state, SessionState::Authenticated { .. }));
        assert!(session.is_authenticated());
        assert_eq!(session.user().unwrap().first_name, "Ada");
    }

    #[tokio::test]
    async fn test_initialize_failure_clears_persisted_token() {
        let api = FakeAuthApi {
            current_user_fails: true,
            ..FakeAuthApi::default()
        };
        let tokens = TokenStore::in_memory();
        tokens.set(SecretString::from("stale-jwt")).unwrap();

        let session = SessionStore::new(&api, tokens.clone());
        assert_eq!(session.initialize().await, SessionState::Anonymous);
        assert!(!tokens.is_present());
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_login_persists_token_and_user() {
        let api = FakeAuthApi {
            login_token: Some("fresh-jwt".to_string()),
            ..FakeAuthApi::default()
        };
        let tokens = TokenStore::in_memory();
        let session = SessionStore::new(&api, tokens.clone());

        let user = session.login(&email(), "hunter2!").await.unwrap();
        assert_eq!(user.first_name, "Ada");
        assert!(tokens.is_present());
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn test_failed_login_leaves_state_unchanged() {
        let api = FakeAuthApi::default();
        let tokens = TokenStore::in_memory();
        let session = SessionStore::new(&api, tokens.clone());

        assert!(session.login(&email(), "wrong").await.is_err());
        assert!(!tokens.is_present());
        assert_eq!(session.state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_register_does_not_authenticate() {
        let api = FakeAuthApi::default();
        let tokens = TokenStore::in_memory();
        let session = SessionStore::new(&api, tokens.clone());

        session
            .register("Ada Lovelace", &email(), "hunter2!")
            .await
            .unwrap();
        assert!(!tokens.is_present());
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_logout_is_synchronous_and_unconditional() {
        let api = FakeAuthApi {
            login_token: Some("jwt".to_string()),
            ..FakeAuthApi::default()
        };
        let tokens = TokenStore::in_memory();
        let session = SessionStore::new(&api, tokens.clone());
        session.login(&email(), "hunter2!").await.unwrap();

        session.logout();
        assert!(!tokens.is_present());
        assert_eq!(session.state(), SessionState::Anonymous);

        // Logging out twice is fine
        session.logout();
        assert_eq!(session.state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_refresh_failure_logs_out() {
        let api = FakeAuthApi {
            login_token: Some("jwt".to_string()),
            current_user_fails: true,
            ..FakeAuthApi::default()
        };
        let tokens = TokenStore::in_memory();
        let session = SessionStore::new(&api, tokens.clone());
        session.login(&email(), "hunter2!").await.unwrap();

        assert!(session.refresh_user().await.is_err());
        assert!(!tokens.is_present());
        assert_eq!(session.state(), SessionState::Anonymous);
    }

    #[test]
    fn test_token_store_file_round_trip() {
        let dir = std::env::temp_dir().join("maplecart-token-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("token.json");
        let _ = std::fs::remove_file(&path);

        let tokens = TokenStore::with_file(path.clone());
        assert!(!tokens.is_present());

        tokens.set(SecretString::from("persisted-jwt")).unwrap();
        assert!(path.exists());

        // A fresh store loads the persisted token
        let reloaded = TokenStore::with_file(path.clone());
        assert_eq!(
            reloaded.get().unwrap().expose_secret(),
            "persisted-jwt"
        );

        reloaded.clear();
        assert!(!path.exists());
        assert!(!reloaded.is_present());
    }

    #[test]
    fn test_token_store_debug_redacts() {
        let tokens = TokenStore::in_memory();
        tokens.set(SecretString::from("super-secret")).unwrap();
        let output = format!("{tokens:?}");
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("super-secret"));
    }
}
