//! # HTML Pages
//!
//! `GET` renders a page; `POST` runs the matching server action from
//! [`super::actions`]. A successful action answers `303 See Other`, a failed
//! one re-renders the form with the action's error message.

use super::actions;
use super::preferences::ensure_theme_toggle;
use crate::auth::client::ClientInfo;
use crate::auth::types::{
    EmailInput, ResetPasswordInput, SignInInput, SignUpInput, TokenQuery, UpdateProfileInput,
};
use crate::auth::{self, signin, verification, CurrentUser};
use crate::error::{AppResult, GENERIC_ERROR};
use crate::flags;
use crate::state::AppState;
use crate::theme::{self, Theme, ThemePreference};
use crate::views;
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Extension, Form,
};
use serde::Deserialize;
use tower_sessions::Session;
use url::Url;

pub const DASHBOARD_PATH: &str = "/dashboard";

/// Short codes carried in `?notice=` after a redirect.
#[derive(Debug, Default, Deserialize)]
pub struct NoticeQuery {
    pub notice: Option<String>,
}

impl NoticeQuery {
    fn message(&self) -> Option<&'static str> {
        match self.notice.as_deref()? {
            "verify-email" => Some("Check your inbox to verify your email address, then sign in."),
            "reset-sent" => Some("If an account exists for that address, a reset link is on its way."),
            "password-reset" => Some("Your password was changed. Sign in with the new one."),
            "signed-out" => Some("You have been signed out."),
            "profile-updated" => Some("Profile saved."),
            "sessions-revoked" => Some("Other browsers were signed out."),
            _ => None,
        }
    }
}

fn see_other(path: &str) -> Response {
    Redirect::to(path).into_response()
}

pub async fn landing(
    State(state): State<AppState>,
    ThemePreference(theme): ThemePreference,
    session: Session,
) -> AppResult<Html<String>> {
    let current = auth::resolve(&state, &session).await?;
    Ok(Html(views::landing(theme, current.as_ref().map(|c| &c.user))))
}

// Sign in

pub async fn sign_in_page(
    State(state): State<AppState>,
    ThemePreference(theme): ThemePreference,
    session: Session,
    Query(query): Query<NoticeQuery>,
) -> AppResult<Response> {
    if auth::resolve(&state, &session).await?.is_some() {
        return Ok(see_other(DASHBOARD_PATH));
    }

    Ok(Html(views::sign_in(theme, "", None, query.message())).into_response())
}

pub async fn sign_in_submit(
    State(state): State<AppState>,
    ThemePreference(theme): ThemePreference,
    session: Session,
    client: ClientInfo,
    Form(input): Form<SignInInput>,
) -> Response {
    let result = actions::sign_in(&state, &session, &client, &input).await;
    if result.success {
        return see_other(DASHBOARD_PATH);
    }

    Html(views::sign_in(theme, &input.email, result.error.as_deref(), None)).into_response()
}

// Sign up

pub async fn sign_up_page(
    State(state): State<AppState>,
    ThemePreference(theme): ThemePreference,
    session: Session,
) -> AppResult<Response> {
    if auth::resolve(&state, &session).await?.is_some() {
        return Ok(see_other(DASHBOARD_PATH));
    }

    let enabled = state.flags().is_enabled(flags::SIGNUP);
    Ok(Html(views::sign_up(theme, "", "", None, enabled)).into_response())
}

pub async fn sign_up_submit(
    State(state): State<AppState>,
    ThemePreference(theme): ThemePreference,
    session: Session,
    client: ClientInfo,
    Form(input): Form<SignUpInput>,
) -> Response {
    let result = actions::sign_up(&state, &session, &client, &input).await;
    match result.data {
        Some(data) if data.requires_verification => see_other("/auth/signin?notice=verify-email"),
        Some(_) => see_other(DASHBOARD_PATH),
        None => Html(views::sign_up(
            theme,
            &input.name,
            &input.email,
            result.error.as_deref(),
            state.flags().is_enabled(flags::SIGNUP),
        ))
        .into_response(),
    }
}

// Password reset

pub async fn forgot_password_page(
    ThemePreference(theme): ThemePreference,
    Query(query): Query<NoticeQuery>,
) -> Html<String> {
    Html(views::forgot_password(theme, None, query.message()))
}

pub async fn forgot_password_submit(
    State(state): State<AppState>,
    ThemePreference(theme): ThemePreference,
    Form(input): Form<EmailInput>,
) -> Response {
    let result = actions::forgot_password(&state, &input).await;
    if result.success {
        return see_other("/auth/forgot-password?notice=reset-sent");
    }

    Html(views::forgot_password(theme, result.error.as_deref(), None)).into_response()
}

pub async fn reset_password_page(
    ThemePreference(theme): ThemePreference,
    Query(query): Query<TokenQuery>,
) -> Html<String> {
    Html(views::reset_password(theme, query.token.as_deref(), None))
}

pub async fn reset_password_submit(
    State(state): State<AppState>,
    ThemePreference(theme): ThemePreference,
    Form(input): Form<ResetPasswordInput>,
) -> Response {
    let result = actions::reset_password(&state, &input).await;
    if result.success {
        return see_other("/auth/signin?notice=password-reset");
    }

    Html(views::reset_password(
        theme,
        Some(&input.token),
        result.error.as_deref(),
    ))
    .into_response()
}

pub async fn verify_email_page(
    State(state): State<AppState>,
    ThemePreference(theme): ThemePreference,
    Query(query): Query<TokenQuery>,
) -> Html<String> {
    let Some(token) = query.token.filter(|t| !t.is_empty()) else {
        return Html(views::verify_email(theme, Err("This link is missing its token.")));
    };

    let html = match verification::verify_email(&state, &token).await {
        Ok(user) => views::verify_email(theme, Ok(&user)),
        Err(e) => views::verify_email(theme, Err(e.public_message().as_str())),
    };
    Html(html)
}

// Dashboard

async fn render_dashboard(
    state: &AppState,
    theme: Theme,
    current: &CurrentUser,
    error: Option<&str>,
    notice: Option<&str>,
) -> AppResult<Html<String>> {
    let sessions = if state.flags().is_enabled(flags::SESSION_LIST) {
        Some(signin::list_sessions(state, &current.user.id).await?)
    } else {
        None
    };

    Ok(Html(views::dashboard(
        theme,
        &current.user,
        sessions.as_deref(),
        &current.session.token,
        state.flags(),
        error,
        notice,
    )))
}

pub async fn dashboard(
    State(state): State<AppState>,
    ThemePreference(theme): ThemePreference,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<NoticeQuery>,
) -> AppResult<Html<String>> {
    render_dashboard(&state, theme, &current, None, query.message()).await
}

pub async fn update_profile_submit(
    State(state): State<AppState>,
    ThemePreference(theme): ThemePreference,
    Extension(current): Extension<CurrentUser>,
    Form(input): Form<UpdateProfileInput>,
) -> AppResult<Response> {
    let result = actions::update_profile(&state, &current, &input).await;
    if result.success {
        return Ok(see_other("/dashboard?notice=profile-updated"));
    }

    let page = render_dashboard(&state, theme, &current, result.error.as_deref(), None).await?;
    Ok(page.into_response())
}

pub async fn revoke_other_sessions_submit(
    State(state): State<AppState>,
    ThemePreference(theme): ThemePreference,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Response> {
    let result = actions::revoke_other_sessions(&state, &current).await;
    if result.success {
        return Ok(see_other("/dashboard?notice=sessions-revoked"));
    }

    let page = render_dashboard(&state, theme, &current, result.error.as_deref(), None).await?;
    Ok(page.into_response())
}

pub async fn sign_out_submit(State(state): State<AppState>, session: Session) -> Response {
    let result = actions::sign_out(&state, &session).await;
    if !result.success {
        tracing::warn!(error = result.error.as_deref().unwrap_or(GENERIC_ERROR), "page sign-out failed");
    }
    see_other("/auth/signin?notice=signed-out")
}

// Theme

/// Flip the theme, then go back to the page the form was posted from.
///
/// Only same-origin referers with a plain path are followed; anything
/// else lands on `/`.
pub async fn toggle_theme_submit(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
) -> AppResult<Response> {
    if ensure_theme_toggle(&state).is_ok() {
        theme::toggle(&session).await?;
    }

    let back = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|referer| same_origin_path(&state.config.app_url, referer))
        .unwrap_or_else(|| "/".to_string());

    Ok(see_other(&back))
}

fn same_origin_path(app_url: &str, referer: &str) -> Option<String> {
    let app = Url::parse(app_url).ok()?;
    let target = Url::parse(referer).ok()?;
    if target.origin() != app.origin() {
        return None;
    }

    let mut path = target.path().to_string();
    // `//host` and `/\host` are read by browsers as another origin
    if path.starts_with("//") || path.starts_with("/\\") {
        return None;
    }
    if let Some(query) = target.query() {
        path.push('?');
        path.push_str(query);
    }
    Some(path)
}

pub async fn not_found(ThemePreference(theme): ThemePreference) -> Response {
    (StatusCode::NOT_FOUND, Html(views::not_found(theme))).into_response()
}
