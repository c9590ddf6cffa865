//! # Error Handling
//!
//! One error type for the whole request path, plus the `ActionResult` shape
//! that server actions hand back to forms.
//!
//! Handlers return `AppResult<T>`. Axum turns the error side into a JSON
//! response through the `IntoResponse` impl below.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error;
use validator::ValidationErrors;

/// Message shown to users when the underlying failure must stay private.
pub const GENERIC_ERROR: &str = "Something went wrong. Please try again.";

/// Application-wide error type
///
/// The `#[from]` attributes let `?` convert sqlx, session and validation
/// errors directly.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Validation failed")]
    Validation(#[from] ValidationErrors),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Session(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    /// Message that is safe to show to the person who made the request.
    ///
    /// Private failures are logged here and replaced by [`GENERIC_ERROR`].
    pub fn public_message(&self) -> String {
        match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                GENERIC_ERROR.to_string()
            }
            AppError::Session(e) => {
                tracing::error!("Session error: {:?}", e);
                GENERIC_ERROR.to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                GENERIC_ERROR.to_string()
            }
            AppError::Validation(errors) => first_validation_message(errors)
                .unwrap_or_else(|| "Validation failed".to_string()),
            AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::Conflict(msg) => msg.clone(),
        }
    }
}

/// Convert AppError into an HTTP response
///
/// Format: `{ "error": "..." }`. Validation failures add a `fields` map of
/// per-field messages.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Validation(errors) => json!({
                "error": "Validation failed",
                "fields": field_messages(errors),
            }),
            AppError::Database(_) | AppError::Session(_) | AppError::Internal(_) => {
                json!({ "error": self.public_message() })
            }
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Per-field validation messages, sorted by field name.
pub fn field_messages(errors: &ValidationErrors) -> BTreeMap<String, Vec<String>> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field))
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

fn first_validation_message(errors: &ValidationErrors) -> Option<String> {
    field_messages(errors)
        .into_values()
        .flatten()
        .next()
}

/// Outcome of a server action: `{ success, data?, error? }`
#[derive(Debug, Serialize)]
pub struct ActionResult<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ActionResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

impl<T: Serialize> From<AppResult<T>> for ActionResult<T> {
    fn from(result: AppResult<T>) -> Self {
        match result {
            Ok(data) => ActionResult::ok(data),
            Err(e) => ActionResult::failed(e.public_message()),
        }
    }
}

impl<T: Serialize> IntoResponse for ActionResult<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
