use crate::auth::mailer::Email;
use crate::auth::recovery::INVALID_TOKEN;
use crate::auth::tokens;
use crate::auth::types::EmailInput;
use crate::db::models::{User, Verification, VerificationPurpose};
use crate::db::{users, verifications};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use validator::Validate;

/// Mail a fresh verification link. Unknown and already verified addresses
/// succeed without sending anything.
pub async fn send_verification_email(state: &AppState, input: &EmailInput) -> AppResult<()> {
    input.validate()?;

    match users::find_by_email(&state.db, &input.email).await? {
        Some(user) if !user.email_verified => send_for_user(state, &user).await,
        _ => Ok(()),
    }
}

pub(crate) async fn send_for_user(state: &AppState, user: &User) -> AppResult<()> {
    let purpose = VerificationPurpose::EmailVerification;
    verifications::delete_for_identifier(&state.db, purpose, &user.id).await?;
    let token = tokens::generate_token();
    verifications::insert_verification(&state.db, &Verification::new(purpose, &user.id, token.clone()))
        .await?;

    let link = state
        .config
        .app_link(&format!("/auth/verify-email?token={}", token));
    let email = Email {
        to: user.email.clone(),
        subject: "Verify your email address".to_string(),
        text: format!("Confirm your email address by opening this link: {}", link),
    };

    if let Err(e) = state.mailer.send(email).await {
        tracing::error!(user_id = %user.id, "failed to send verification email: {}", e);
    }

    Ok(())
}

/// Consume a verification token and mark the owner's email verified.
pub async fn verify_email(state: &AppState, token: &str) -> AppResult<User> {
    let mut tx = state.db.begin().await?;
    let consumed =
        verifications::consume(&mut tx, VerificationPurpose::EmailVerification, token).await?;
    let Some(user_id) = consumed else {
        // Keep the deletion of an expired token
        tx.commit().await?;
        return Err(AppError::BadRequest(INVALID_TOKEN.to_string()));
    };
    users::mark_email_verified(&mut tx, &user_id).await?;
    tx.commit().await?;

    tracing::info!(user_id = %user_id, "email verified");
    users::find_by_id(&state.db, &user_id).await
}
