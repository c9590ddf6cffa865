//! Feature flag and theme endpoints.

use crate::error::{AppError, AppResult};
use crate::flags::{self, FeatureFlags};
use crate::state::AppState;
use crate::theme::{self, Theme, ThemePreference};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

#[derive(Debug, Serialize, Deserialize)]
pub struct ThemeBody {
    pub theme: Theme,
}

pub async fn get_flags(State(state): State<AppState>) -> Json<FeatureFlags> {
    Json(state.flags().clone())
}

pub async fn get_theme(ThemePreference(theme): ThemePreference) -> Json<ThemeBody> {
    Json(ThemeBody { theme })
}

pub async fn set_theme(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<ThemeBody>,
) -> AppResult<Json<ThemeBody>> {
    ensure_theme_toggle(&state)?;
    theme::store(&session, body.theme).await?;
    Ok(Json(body))
}

pub async fn toggle_theme(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Json<ThemeBody>> {
    ensure_theme_toggle(&state)?;
    let theme = theme::toggle(&session).await?;
    Ok(Json(ThemeBody { theme }))
}

pub(crate) fn ensure_theme_toggle(state: &AppState) -> AppResult<()> {
    if state.flags().is_enabled(flags::THEME_TOGGLE) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Theme switching is disabled".to_string()))
    }
}
