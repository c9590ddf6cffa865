//! # User Handlers

use crate::auth::CurrentUser;
use crate::db::models::User;
use axum::{Extension, Json};

/// Get the signed-in user's profile
///
/// ## Route
/// GET /api/users/me
///
/// ## Response
/// ```json
/// {
///   "id": "550e8400-e29b-41d4-a716-446655440000",
///   "name": "Ada Lovelace",
///   "email": "ada@example.com",
///   "emailVerified": false,
///   "image": null,
///   "createdAt": "2024-01-15T10:30:00Z",
///   "updatedAt": "2024-01-15T10:30:00Z"
/// }
/// ```
///
/// The API session gate has already loaded the user into request
/// extensions, so there is nothing left to fail here.
pub async fn get_current_user(Extension(current): Extension<CurrentUser>) -> Json<User> {
    Json(current.user)
}
