use crate::auth::client::ClientInfo;
use crate::auth::types::SignUpInput;
use crate::auth::{password, signin, verification};
use crate::db::models::{Account, Session, User};
use crate::db::{accounts, users};
use crate::error::{AppError, AppResult};
use crate::flags;
use crate::state::AppState;
use validator::Validate;

/// Result of a sign-up. `session` is `None` while the email still needs
/// verifying.
#[derive(Debug)]
pub struct SignUpOutcome {
    pub user: User,
    pub session: Option<Session>,
}

/// Create a user and its credential account, then sign in.
///
/// The user and account rows are written in one transaction. With the
/// `email_verification` flag on, a verification email goes out instead of
/// a session being created.
pub async fn sign_up(
    state: &AppState,
    input: &SignUpInput,
    client: &ClientInfo,
) -> AppResult<SignUpOutcome> {
    input.validate()?;

    if !state.flags().is_enabled(flags::SIGNUP) {
        return Err(AppError::Forbidden("Sign-up is currently disabled".to_string()));
    }

    let name = input.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }

    let email = users::normalize_email(&input.email);
    if users::find_by_email(&state.db, &email).await?.is_some() {
        return Err(AppError::Conflict(
            "An account with this email already exists".to_string(),
        ));
    }

    let password_hash = password::hash_password(&input.password)?;
    let user = User::new(name.to_string(), email);
    let account = Account::credential(&user.id, password_hash);

    let mut tx = state.db.begin().await?;
    users::insert_user(&mut tx, &user).await?;
    accounts::insert_account(&mut tx, &account).await?;
    tx.commit().await?;

    tracing::info!(user_id = %user.id, "user signed up");

    if state.flags().is_enabled(flags::EMAIL_VERIFICATION) {
        verification::send_for_user(state, &user).await?;
        return Ok(SignUpOutcome {
            user,
            session: None,
        });
    }

    let session = signin::create_session(state, &user.id, client).await?;
    Ok(SignUpOutcome {
        user,
        session: Some(session),
    })
}
