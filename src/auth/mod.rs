//! # Authentication
//!
//! Email/password authentication backed by the `users`, `accounts`,
//! `sessions` and `verifications` tables.
//!
//! ## How a visitor is identified
//! 1. Sign-in creates a `sessions` row with a random token.
//! 2. The token is stored in the signed cookie session (tower-sessions)
//!    under [`SESSION_TOKEN_KEY`].
//! 3. On each request, [`resolve`] reads the token back and loads the row.
//!    Expired rows are deleted and treated as absent.
//!
//! ## Submodules
//! - `signup`, `signin`: account creation and session lifecycle
//! - `recovery`: password reset by emailed token
//! - `verification`: email verification by emailed token
//! - `account`: profile changes and account deletion
//! - `password`, `tokens`, `mailer`, `client`, `types`: building blocks

pub mod account;
pub mod client;
pub mod mailer;
pub mod password;
pub mod recovery;
pub mod signin;
pub mod signup;
pub mod tokens;
pub mod types;
pub mod verification;

use crate::db::models::{Session, User};
use crate::error::AppResult;
use crate::state::AppState;

/// Key of the session token inside the cookie session.
pub const SESSION_TOKEN_KEY: &str = "session_token";

/// The signed-in user and the session row that proves it.
///
/// Inserted into request extensions by the session gate middleware.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub session: Session,
}

/// Session token stored in the cookie session, if any.
pub async fn session_token(session: &tower_sessions::Session) -> AppResult<Option<String>> {
    Ok(session.get::<String>(SESSION_TOKEN_KEY).await?)
}

/// Bind `token` to the cookie session under a fresh session id.
pub async fn remember(session: &tower_sessions::Session, token: &str) -> AppResult<()> {
    session.cycle_id().await?;
    session.insert(SESSION_TOKEN_KEY, token).await?;
    Ok(())
}

/// Drop everything held in the cookie session.
pub async fn forget(session: &tower_sessions::Session) -> AppResult<()> {
    session.flush().await?;
    Ok(())
}

/// Load the current visitor from the cookie session.
///
/// A token whose row is gone or expired is removed from the cookie session.
pub async fn resolve(
    state: &AppState,
    session: &tower_sessions::Session,
) -> AppResult<Option<CurrentUser>> {
    let Some(token) = session_token(session).await? else {
        return Ok(None);
    };

    let current = signin::current_session(state, &token).await?;
    if current.is_none() {
        session.remove::<String>(SESSION_TOKEN_KEY).await?;
    }

    Ok(current)
}
