use crate::auth;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

/// Where unauthenticated page requests are sent.
pub const SIGN_IN_PATH: &str = "/auth/signin";

/// Gate for HTML pages: redirect to sign-in when there is no live session.
pub async fn require_page_session(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Response {
    match auth::resolve(&state, &session).await {
        Ok(Some(current)) => {
            request.extensions_mut().insert(current);
            next.run(request).await
        }
        Ok(None) => Redirect::to(SIGN_IN_PATH).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Gate for JSON routes: answer 401 when there is no live session.
pub async fn require_api_session(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match auth::resolve(&state, &session).await? {
        Some(current) => {
            request.extensions_mut().insert(current);
            Ok(next.run(request).await)
        }
        None => Err(AppError::Unauthorized("Not authenticated".to_string())),
    }
}
