use crate::auth::password;
use crate::auth::types::{DeleteUserInput, UpdateProfileInput};
use crate::db::models::User;
use crate::db::{accounts, users};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use validator::Validate;

pub async fn update_profile(
    state: &AppState,
    user: &User,
    input: &UpdateProfileInput,
) -> AppResult<User> {
    input.validate()?;

    let name = input.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }

    users::update_name(&state.db, &user.id, name).await
}

/// Delete the user after re-checking their password.
///
/// Sessions and accounts are removed by the foreign-key cascade.
pub async fn delete_user(state: &AppState, user: &User, input: &DeleteUserInput) -> AppResult<()> {
    input.validate()?;

    let hash = accounts::find_credential(&state.db, &user.id)
        .await?
        .and_then(|account| account.password)
        .ok_or_else(|| AppError::BadRequest("No password set for this account".to_string()))?;

    if !password::verify_password(&input.password, &hash)? {
        return Err(AppError::Unauthorized("Invalid password".to_string()));
    }

    users::delete_user(&state.db, &user.id).await?;
    tracing::info!(user_id = %user.id, "user deleted");

    Ok(())
}
