//! # Router Assembly
//!
//! Routes, session gates and the middleware stack. `main` and the HTTP
//! tests build the application through [`build`].

use crate::db;
use crate::error::{AppError, AppResult};
use crate::handlers::{actions, auth, health, pages, preferences, users};
use crate::middleware::auth::{require_api_session, require_page_session};
use crate::middleware::security::{cors_layer, with_security_headers};
use crate::state::AppState;
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use sha2::{Digest, Sha512};
use sqlx::SqlitePool;
use time::Duration;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::{Key, SameSite};
use tower_sessions::{ExpiredDeletion, Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;

pub const SESSION_COOKIE_NAME: &str = "launchpad.session";

/// Cookie sessions idle out after a week, like the session rows they carry.
pub const SESSION_INACTIVITY_DAYS: i64 = 7;

/// Session store sharing the application pool. Creates its table on first
/// use.
pub async fn session_store(pool: SqlitePool) -> Result<SqliteStore, sqlx::Error> {
    let store = SqliteStore::new(pool);
    store.migrate().await?;
    Ok(store)
}

/// Sweep expired rows: auth sessions, verification tokens and cookie
/// session records. Returns how many auth sessions and tokens went.
pub async fn purge_expired(pool: &SqlitePool, store: &SqliteStore) -> AppResult<(u64, u64)> {
    let removed = db::cleanup_expired(pool).await?;
    store
        .delete_expired()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to purge cookie sessions: {}", e)))?;
    Ok(removed)
}

/// 64-byte cookie signing key derived from `AUTH_SECRET`.
fn signing_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

pub fn build(state: AppState, store: SqliteStore) -> Router {
    let config = state.config.clone();

    let session_layer = SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_secure(config.environment.is_production())
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(Duration::days(SESSION_INACTIVITY_DAYS)))
        .with_signed(signing_key(&config.auth_secret));

    // Pages that redirect to sign-in without a session
    let gated_pages = Router::new()
        .route("/dashboard", get(pages::dashboard))
        .route("/dashboard/profile", post(pages::update_profile_submit))
        .route(
            "/dashboard/sessions/revoke-others",
            post(pages::revoke_other_sessions_submit),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_page_session,
        ));

    // JSON routes that answer 401 without a session
    let gated_api = Router::new()
        .route("/api/users/me", get(users::get_current_user))
        .route("/api/auth/delete-user", post(auth::delete_user))
        .route("/api/auth/list-sessions", get(auth::list_sessions))
        .route("/actions/update-profile", post(actions::update_profile_json))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_api_session,
        ));

    let router = Router::new()
        .route("/health", get(health::health_check))
        // Pages
        .route("/", get(pages::landing))
        .route(
            "/auth/signin",
            get(pages::sign_in_page).post(pages::sign_in_submit),
        )
        .route(
            "/auth/signup",
            get(pages::sign_up_page).post(pages::sign_up_submit),
        )
        .route(
            "/auth/forgot-password",
            get(pages::forgot_password_page).post(pages::forgot_password_submit),
        )
        .route(
            "/auth/reset-password",
            get(pages::reset_password_page).post(pages::reset_password_submit),
        )
        .route("/auth/verify-email", get(pages::verify_email_page))
        .route("/dashboard/sign-out", post(pages::sign_out_submit))
        .route("/theme", post(pages::toggle_theme_submit))
        // Server actions
        .route("/actions/sign-up", post(actions::sign_up_json))
        .route("/actions/sign-in", post(actions::sign_in_json))
        .route("/actions/sign-out", post(actions::sign_out_json))
        .route("/actions/forgot-password", post(actions::forgot_password_json))
        .route("/actions/reset-password", post(actions::reset_password_json))
        // Auth API
        .route("/api/auth/sign-up/email", post(auth::sign_up_email))
        .route("/api/auth/sign-in/email", post(auth::sign_in_email))
        .route("/api/auth/sign-out", post(auth::sign_out))
        .route("/api/auth/get-session", get(auth::get_session))
        .route("/api/auth/forget-password", post(auth::forget_password))
        .route("/api/auth/reset-password", post(auth::reset_password))
        .route(
            "/api/auth/send-verification-email",
            post(auth::send_verification_email),
        )
        .route("/api/auth/verify-email", get(auth::verify_email))
        // Preferences
        .route("/api/flags", get(preferences::get_flags))
        .route(
            "/api/theme",
            get(preferences::get_theme).put(preferences::set_theme),
        )
        .route("/api/theme/toggle", post(preferences::toggle_theme))
        .merge(gated_pages)
        .merge(gated_api)
        .fallback(pages::not_found)
        // Layers run bottom-up: trace, CORS, then sessions
        .layer(session_layer)
        .layer(cors_layer(&config))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    with_security_headers(router, &config)
}
