//! # Sign-in and Session Lifecycle
//!
//! Sessions last [`SESSION_EXPIRES_IN_SECS`]. Once a session is older than
//! [`SESSION_UPDATE_AGE_SECS`], reading it pushes the expiry out again.

use crate::auth::client::ClientInfo;
use crate::auth::types::SignInInput;
use crate::auth::{password, tokens, CurrentUser};
use crate::db::models::{Session, User};
use crate::db::{accounts, sessions, users};
use crate::error::{AppError, AppResult};
use crate::flags;
use crate::state::AppState;
use chrono::{Duration, Utc};
use validator::Validate;

/// 7 days
pub const SESSION_EXPIRES_IN_SECS: i64 = 7 * 24 * 60 * 60;
/// 1 day
pub const SESSION_UPDATE_AGE_SECS: i64 = 24 * 60 * 60;

pub const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug)]
pub struct SignedIn {
    pub user: User,
    pub session: Session,
}

pub async fn sign_in(
    state: &AppState,
    input: &SignInInput,
    client: &ClientInfo,
) -> AppResult<SignedIn> {
    input.validate()?;

    let invalid = || AppError::Unauthorized(INVALID_CREDENTIALS.to_string());

    let user = users::find_by_email(&state.db, &input.email)
        .await?
        .ok_or_else(invalid)?;
    let hash = accounts::find_credential(&state.db, &user.id)
        .await?
        .and_then(|account| account.password)
        .ok_or_else(invalid)?;

    if !password::verify_password(&input.password, &hash)? {
        tracing::debug!(user_id = %user.id, "sign-in rejected: wrong password");
        return Err(invalid());
    }

    if state.flags().is_enabled(flags::EMAIL_VERIFICATION) && !user.email_verified {
        return Err(AppError::Forbidden("Email address is not verified".to_string()));
    }

    let session = create_session(state, &user.id, client).await?;
    tracing::info!(user_id = %user.id, "user signed in");

    Ok(SignedIn { user, session })
}

pub async fn create_session(
    state: &AppState,
    user_id: &str,
    client: &ClientInfo,
) -> AppResult<Session> {
    let session = Session::new(
        user_id.to_string(),
        tokens::generate_token(),
        Duration::seconds(SESSION_EXPIRES_IN_SECS),
        client.ip_address.clone(),
        client.user_agent.clone(),
    );
    sessions::insert_session(&state.db, &session).await?;

    Ok(session)
}

/// Delete the session row. Unknown tokens are not an error.
pub async fn sign_out(state: &AppState, token: &str) -> AppResult<()> {
    sessions::delete_by_token(&state.db, token).await
}

/// Look up a live session and its user, refreshing the expiry when due.
pub async fn current_session(state: &AppState, token: &str) -> AppResult<Option<CurrentUser>> {
    let Some(mut session) = sessions::find_by_token(&state.db, token).await? else {
        return Ok(None);
    };

    if session.is_expired() {
        sessions::delete_by_token(&state.db, token).await?;
        return Ok(None);
    }

    let now = Utc::now();
    let refresh_below = Duration::seconds(SESSION_EXPIRES_IN_SECS - SESSION_UPDATE_AGE_SECS);
    if session.expires_at - now < refresh_below {
        let expires_at = now + Duration::seconds(SESSION_EXPIRES_IN_SECS);
        sessions::update_expiry(&state.db, token, expires_at).await?;
        session.expires_at = expires_at;
    }

    let user = match users::find_by_id(&state.db, &session.user_id).await {
        Ok(user) => user,
        Err(AppError::NotFound(_)) => return Ok(None),
        Err(e) => return Err(e),
    };

    Ok(Some(CurrentUser { user, session }))
}

pub async fn list_sessions(state: &AppState, user_id: &str) -> AppResult<Vec<Session>> {
    sessions::list_active_for_user(&state.db, user_id).await
}

/// Sign out every other browser of the current user.
pub async fn revoke_other_sessions(state: &AppState, current: &CurrentUser) -> AppResult<u64> {
    let revoked =
        sessions::delete_others_for_user(&state.db, &current.user.id, &current.session.token)
            .await?;
    tracing::info!(user_id = %current.user.id, revoked, "revoked other sessions");

    Ok(revoked)
}
