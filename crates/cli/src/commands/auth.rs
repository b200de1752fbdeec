//! Session commands: login, register, logout, whoami.

use maplecart_core::Email;
use maplecart_storefront::session::SessionStore;

use super::{CliError, Context};

/// Sign in and persist the session token.
pub async fn login(email: &str, password: &str) -> Result<(), CliError> {
    let ctx = Context::load()?;
    let email = Email::parse(email)?;
    let session = SessionStore::new(ctx.client, ctx.tokens);

    let user = session.login(&email, password).await?;
    tracing::info!("Signed in as {} <{}>", user.full_name(), user.email);
    Ok(())
}

/// Create a new account.
pub async fn register(name: &str, email: &str, password: &str) -> Result<(), CliError> {
    let ctx = Context::load()?;
    let email = Email::parse(email)?;
    let session = SessionStore::new(ctx.client, ctx.tokens);

    let profile = session.register(name, &email, password).await?;
    tracing::info!(
        "Account created for {} <{}>. Check your inbox to verify the address before logging in.",
        profile.name,
        profile.email
    );
    Ok(())
}

/// Drop the persisted session.
pub fn logout() -> Result<(), CliError> {
    let ctx = Context::load()?;
    ctx.tokens.clear();
    tracing::info!("Signed out");
    Ok(())
}

/// Show the signed-in user by validating the persisted token.
pub async fn whoami() -> Result<(), CliError> {
    let ctx = Context::load()?;
    let session = SessionStore::new(ctx.client, ctx.tokens);

    match session.initialize().await {
        maplecart_storefront::session::SessionState::Authenticated { user } => {
            tracing::info!("{} <{}>", user.full_name(), user.email);
            Ok(())
        }
        _ => Err(CliError::Invalid(
            "not signed in; run `maple auth login` first".to_string(),
        )),
    }
}
