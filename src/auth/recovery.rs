//! # Password Reset
//!
//! A reset request mails a single-use link. The answer is the same whether
//! or not the address belongs to an account.

use crate::auth::mailer::Email;
use crate::auth::types::{EmailInput, ResetPasswordInput};
use crate::auth::{password, tokens};
use crate::db::models::{Verification, VerificationPurpose};
use crate::db::{accounts, sessions, users, verifications};
use crate::error::{AppError, AppResult};
use crate::flags;
use crate::state::AppState;
use validator::Validate;

pub const INVALID_TOKEN: &str = "Invalid or expired token";

fn ensure_enabled(state: &AppState) -> AppResult<()> {
    if state.flags().is_enabled(flags::PASSWORD_RESET) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Password reset is currently disabled".to_string()))
    }
}

pub async fn request_password_reset(state: &AppState, input: &EmailInput) -> AppResult<()> {
    input.validate()?;
    ensure_enabled(state)?;

    let Some(user) = users::find_by_email(&state.db, &input.email).await? else {
        tracing::debug!("password reset requested for unknown email");
        return Ok(());
    };

    let purpose = VerificationPurpose::ResetPassword;
    verifications::delete_for_identifier(&state.db, purpose, &user.id).await?;
    let token = tokens::generate_token();
    verifications::insert_verification(&state.db, &Verification::new(purpose, &user.id, token.clone()))
        .await?;

    let link = state
        .config
        .app_link(&format!("/auth/reset-password?token={}", token));
    let email = Email {
        to: user.email.clone(),
        subject: "Reset your password".to_string(),
        text: format!(
            "Someone asked to reset the password for your account. \
             Open this link within the hour to choose a new one: {}",
            link
        ),
    };

    // Delivery failures stay private so the response never reveals the account.
    if let Err(e) = state.mailer.send(email).await {
        tracing::error!(user_id = %user.id, "failed to send password reset email: {}", e);
    }

    Ok(())
}

/// Consume a reset token, store the new password and sign the user out
/// everywhere.
pub async fn reset_password(state: &AppState, input: &ResetPasswordInput) -> AppResult<()> {
    input.validate()?;
    ensure_enabled(state)?;

    let password_hash = password::hash_password(&input.new_password)?;

    let mut tx = state.db.begin().await?;
    let consumed =
        verifications::consume(&mut tx, VerificationPurpose::ResetPassword, &input.token).await?;
    let Some(user_id) = consumed else {
        // Keep the deletion of an expired token
        tx.commit().await?;
        return Err(AppError::BadRequest(INVALID_TOKEN.to_string()));
    };
    accounts::update_password(&mut tx, &user_id, &password_hash).await?;
    tx.commit().await?;

    let revoked = sessions::delete_for_user(&state.db, &user_id).await?;
    tracing::info!(user_id = %user_id, revoked, "password reset");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::client::ClientInfo;
    use crate::auth::signin::{self, sign_in};
    use crate::auth::signup::sign_up;
    use crate::auth::types::{SignInInput, SignUpInput};
    use crate::state::test_state;

    async fn seed(state: &AppState) -> String {
        sign_up(
            state,
            &SignUpInput {
                name: "Ada".into(),
                email: "ada@example.com".into(),
                password: "password123".into(),
            },
            &ClientInfo::default(),
        )
        .await
        .unwrap()
        .session
        .unwrap()
        .token
    }

    fn ada() -> EmailInput {
        EmailInput {
            email: "ada@example.com".into(),
        }
    }

    #[tokio::test]
    async fn test_full_reset_flow() {
        let (state, mailer) = test_state(&[]).await;
        let old_token = seed(&state).await;

        request_password_reset(&state, &ada()).await.unwrap();
        let email = mailer.last_to("ada@example.com").unwrap();
        assert!(email
            .text
            .contains("http://localhost:3000/auth/reset-password?token="));
        let token = email.link_token().unwrap().to_string();

        reset_password(
            &state,
            &ResetPasswordInput {
                token: token.clone(),
                new_password: "new-password-456".into(),
            },
        )
        .await
        .unwrap();

        // old sessions are revoked
        assert!(signin::current_session(&state, &old_token).await.unwrap().is_none());

        // new password works, old one does not
        let new_login = SignInInput {
            email: "ada@example.com".into(),
            password: "new-password-456".into(),
        };
        assert!(sign_in(&state, &new_login, &ClientInfo::default()).await.is_ok());
        let old_login = SignInInput {
            password: "password123".into(),
            ..new_login
        };
        assert!(sign_in(&state, &old_login, &ClientInfo::default()).await.is_err());

        // the token is single-use
        let reused = reset_password(
            &state,
            &ResetPasswordInput {
                token,
                new_password: "another-password".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(reused, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_unknown_email_is_silent() {
        let (state, mailer) = test_state(&[]).await;
        request_password_reset(
            &state,
            &EmailInput {
                email: "ghost@example.com".into(),
            },
        )
        .await
        .unwrap();
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_second_request_invalidates_first_link() {
        let (state, mailer) = test_state(&[]).await;
        seed(&state).await;

        request_password_reset(&state, &ada()).await.unwrap();
        let first = mailer.last_to("ada@example.com").unwrap().link_token().unwrap().to_string();
        request_password_reset(&state, &ada()).await.unwrap();

        let err = reset_password(
            &state,
            &ResetPasswordInput {
                token: first,
                new_password: "new-password-456".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected_and_removed() {
        let (state, _) = test_state(&[]).await;
        let mut expired =
            Verification::new(VerificationPurpose::ResetPassword, "user-1", "old".into());
        expired.expires_at = chrono::Utc::now() - chrono::Duration::minutes(1);
        verifications::insert_verification(&state.db, &expired).await.unwrap();

        let err = reset_password(
            &state,
            &ResetPasswordInput {
                token: "old".into(),
                new_password: "new-password-456".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let remaining: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM verifications WHERE value = 'old'")
                .fetch_one(&state.db)
                .await
                .unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn test_disabled_flag_forbids() {
        let (state, _) = test_state(&[("password_reset", false)]).await;
        let err = request_password_reset(&state, &ada()).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
