//! # Server Actions
//!
//! Form-submission endpoints. Each action validates its input, calls into
//! [`crate::auth`] and converts the outcome into an [`ActionResult`]: errors
//! are caught here and never propagate as HTTP failures.
//!
//! The functions are shared by the JSON routes under `/actions/*` and by
//! the HTML form handlers in [`super::pages`].

use crate::auth::client::ClientInfo;
use crate::auth::types::{
    EmailInput, ResetPasswordInput, SignInInput, SignUpInput, UpdateProfileInput,
};
use crate::auth::{self, account, recovery, signin, signup, CurrentUser};
use crate::db::models::User;
use crate::error::{ActionResult, AppResult};
use crate::logging;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde::Serialize;
use tower_sessions::Session;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpData {
    pub user: User,
    /// True when the account must confirm its email before signing in
    pub requires_verification: bool,
}

pub async fn sign_up(
    state: &AppState,
    session: &Session,
    client: &ClientInfo,
    input: &SignUpInput,
) -> ActionResult<SignUpData> {
    tracing::info!(input = %logging::redacted(input), "action: sign-up");

    let result: AppResult<SignUpData> = async {
        let outcome = signup::sign_up(state, input, client).await?;
        if let Some(created) = &outcome.session {
            auth::remember(session, &created.token).await?;
        }
        Ok(SignUpData {
            requires_verification: outcome.session.is_none(),
            user: outcome.user,
        })
    }
    .await;

    result.into()
}

pub async fn sign_in(
    state: &AppState,
    session: &Session,
    client: &ClientInfo,
    input: &SignInInput,
) -> ActionResult<User> {
    tracing::info!(input = %logging::redacted(input), "action: sign-in");

    let result: AppResult<User> = async {
        let signed_in = signin::sign_in(state, input, client).await?;
        auth::remember(session, &signed_in.session.token).await?;
        Ok(signed_in.user)
    }
    .await;

    result.into()
}

pub async fn sign_out(state: &AppState, session: &Session) -> ActionResult<()> {
    tracing::info!("action: sign-out");

    let result: AppResult<()> = async {
        if let Some(token) = auth::session_token(session).await? {
            signin::sign_out(state, &token).await?;
        }
        auth::forget(session).await
    }
    .await;

    result.into()
}

pub async fn forgot_password(state: &AppState, input: &EmailInput) -> ActionResult<()> {
    tracing::info!(input = %logging::redacted(input), "action: forgot-password");
    recovery::request_password_reset(state, input).await.into()
}

pub async fn reset_password(state: &AppState, input: &ResetPasswordInput) -> ActionResult<()> {
    tracing::info!(input = %logging::redacted(input), "action: reset-password");
    recovery::reset_password(state, input).await.into()
}

pub async fn update_profile(
    state: &AppState,
    current: &CurrentUser,
    input: &UpdateProfileInput,
) -> ActionResult<User> {
    tracing::info!(user_id = %current.user.id, input = %logging::redacted(input), "action: update-profile");
    account::update_profile(state, &current.user, input).await.into()
}

pub async fn revoke_other_sessions(state: &AppState, current: &CurrentUser) -> ActionResult<u64> {
    tracing::info!(user_id = %current.user.id, "action: revoke-other-sessions");
    signin::revoke_other_sessions(state, current).await.into()
}

// JSON routes
//
// Bodies are taken as `Result` so that a malformed request still answers
// with an `ActionResult` instead of axum's plain-text rejection.

pub const INVALID_BODY: &str = "Invalid request body";

type JsonBody<T> = Result<Json<T>, JsonRejection>;

fn read_json<T, U: Serialize>(payload: JsonBody<T>) -> Result<T, ActionResult<U>> {
    match payload {
        Ok(Json(input)) => Ok(input),
        Err(rejection) => {
            tracing::debug!(reason = %rejection.body_text(), "action body rejected");
            Err(ActionResult::failed(INVALID_BODY))
        }
    }
}

pub async fn sign_up_json(
    State(state): State<AppState>,
    session: Session,
    client: ClientInfo,
    payload: JsonBody<SignUpInput>,
) -> ActionResult<SignUpData> {
    match read_json(payload) {
        Ok(input) => sign_up(&state, &session, &client, &input).await,
        Err(failed) => failed,
    }
}

pub async fn sign_in_json(
    State(state): State<AppState>,
    session: Session,
    client: ClientInfo,
    payload: JsonBody<SignInInput>,
) -> ActionResult<User> {
    match read_json(payload) {
        Ok(input) => sign_in(&state, &session, &client, &input).await,
        Err(failed) => failed,
    }
}

pub async fn sign_out_json(State(state): State<AppState>, session: Session) -> ActionResult<()> {
    sign_out(&state, &session).await
}

pub async fn forgot_password_json(
    State(state): State<AppState>,
    payload: JsonBody<EmailInput>,
) -> ActionResult<()> {
    match read_json(payload) {
        Ok(input) => forgot_password(&state, &input).await,
        Err(failed) => failed,
    }
}

pub async fn reset_password_json(
    State(state): State<AppState>,
    payload: JsonBody<ResetPasswordInput>,
) -> ActionResult<()> {
    match read_json(payload) {
        Ok(input) => reset_password(&state, &input).await,
        Err(failed) => failed,
    }
}

pub async fn update_profile_json(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    payload: JsonBody<UpdateProfileInput>,
) -> ActionResult<User> {
    match read_json(payload) {
        Ok(input) => update_profile(&state, &current, &input).await,
        Err(failed) => failed,
    }
}
