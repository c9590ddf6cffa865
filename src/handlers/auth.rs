//! JSON auth API mounted under `/api/auth`.

use crate::auth::client::ClientInfo;
use crate::auth::types::{
    DeleteUserInput, EmailInput, ResetPasswordInput, SignInInput, SignUpInput, TokenQuery,
};
use crate::auth::{self, account, recovery, signin, signup, verification, CurrentUser};
use crate::error::{AppError, AppResult};
use crate::flags;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde_json::{json, Value};
use tower_sessions::Session;

// Registration and sign-in

pub async fn sign_up_email(
    State(state): State<AppState>,
    session: Session,
    client: ClientInfo,
    Json(input): Json<SignUpInput>,
) -> AppResult<Json<Value>> {
    let outcome = signup::sign_up(&state, &input, &client).await?;

    let token = match &outcome.session {
        Some(created) => {
            auth::remember(&session, &created.token).await?;
            Some(created.token.clone())
        }
        None => None,
    };

    Ok(Json(json!({
        "token": token,
        "user": outcome.user,
    })))
}

pub async fn sign_in_email(
    State(state): State<AppState>,
    session: Session,
    client: ClientInfo,
    Json(input): Json<SignInInput>,
) -> AppResult<Json<Value>> {
    let signed_in = signin::sign_in(&state, &input, &client).await?;
    auth::remember(&session, &signed_in.session.token).await?;

    Ok(Json(json!({
        "token": signed_in.session.token,
        "user": signed_in.user,
    })))
}

pub async fn sign_out(State(state): State<AppState>, session: Session) -> AppResult<Json<Value>> {
    if let Some(token) = auth::session_token(&session).await? {
        signin::sign_out(&state, &token).await?;
    }
    auth::forget(&session).await?;

    Ok(Json(json!({ "success": true })))
}

/// Current session and user, or `null` when signed out.
pub async fn get_session(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Json<Value>> {
    let body = match auth::resolve(&state, &session).await? {
        Some(current) => json!({
            "session": current.session,
            "user": current.user,
        }),
        None => Value::Null,
    };

    Ok(Json(body))
}

// Password reset and email verification

pub async fn forget_password(
    State(state): State<AppState>,
    Json(input): Json<EmailInput>,
) -> AppResult<Json<Value>> {
    recovery::request_password_reset(&state, &input).await?;
    Ok(Json(json!({ "status": true })))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(input): Json<ResetPasswordInput>,
) -> AppResult<Json<Value>> {
    recovery::reset_password(&state, &input).await?;
    Ok(Json(json!({ "status": true })))
}

pub async fn send_verification_email(
    State(state): State<AppState>,
    Json(input): Json<EmailInput>,
) -> AppResult<Json<Value>> {
    verification::send_verification_email(&state, &input).await?;
    Ok(Json(json!({ "status": true })))
}

pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> AppResult<Json<Value>> {
    let token = query
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing token".to_string()))?;

    verification::verify_email(&state, &token).await?;
    Ok(Json(json!({ "status": true })))
}

// Signed-in only

pub async fn delete_user(
    State(state): State<AppState>,
    session: Session,
    Extension(current): Extension<CurrentUser>,
    Json(input): Json<DeleteUserInput>,
) -> AppResult<Json<Value>> {
    account::delete_user(&state, &current.user, &input).await?;
    auth::forget(&session).await?;

    Ok(Json(json!({ "success": true })))
}

pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<Value>> {
    if !state.flags().is_enabled(flags::SESSION_LIST) {
        return Err(AppError::Forbidden("Session listing is disabled".to_string()));
    }

    let sessions = signin::list_sessions(&state, &current.user.id).await?;
    Ok(Json(json!(sessions)))
}
