//! # Theme Preference
//!
//! Light/dark choice kept in the visitor's cookie session under
//! [`THEME_KEY`]. Pages read it through the [`ThemePreference`] extractor and
//! render it as the class of the `<html>` element.

use crate::error::{AppError, AppResult};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tower_sessions::Session;

pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggle(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(AppError::BadRequest(format!(
                "Unknown theme '{}', expected light or dark",
                other
            ))),
        }
    }
}

/// Stored theme, or the default when none was chosen yet.
pub async fn load(session: &Session) -> AppResult<Theme> {
    Ok(session.get::<Theme>(THEME_KEY).await?.unwrap_or_default())
}

pub async fn store(session: &Session, theme: Theme) -> AppResult<()> {
    session.insert(THEME_KEY, theme).await?;
    Ok(())
}

/// Flip the stored theme and return the new value.
pub async fn toggle(session: &Session) -> AppResult<Theme> {
    let next = load(session).await?.toggle();
    store(session, next).await?;
    Ok(next)
}

/// The visitor's theme, read from the cookie session.
///
/// Fails with an explicit error when the session layer is missing from
/// the router, rather than silently falling back to the default.
#[derive(Debug, Clone, Copy)]
pub struct ThemePreference(pub Theme);

impl<S> FromRequestParts<S> for ThemePreference
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await.map_err(|_| {
            AppError::Internal("ThemePreference requires the session layer".to_string())
        })?;

        Ok(ThemePreference(load(&session).await?))
    }
}
