use crate::db::models::{Account, CREDENTIAL_PROVIDER};
use crate::error::{AppError, AppResult};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

pub async fn insert_account(conn: &mut SqliteConnection, account: &Account) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO accounts
         (id, account_id, provider_id, user_id, access_token, refresh_token, id_token,
          access_token_expires_at, refresh_token_expires_at, scope, password, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&account.id)
    .bind(&account.account_id)
    .bind(&account.provider_id)
    .bind(&account.user_id)
    .bind(&account.access_token)
    .bind(&account.refresh_token)
    .bind(&account.id_token)
    .bind(account.access_token_expires_at)
    .bind(account.refresh_token_expires_at)
    .bind(&account.scope)
    .bind(&account.password)
    .bind(account.created_at)
    .bind(account.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// The email/password account of a user, if they have one.
pub async fn find_credential(pool: &SqlitePool, user_id: &str) -> AppResult<Option<Account>> {
    let account = sqlx::query_as::<_, Account>(
        "SELECT * FROM accounts WHERE user_id = ? AND provider_id = ?",
    )
    .bind(user_id)
    .bind(CREDENTIAL_PROVIDER)
    .fetch_optional(pool)
    .await?;

    Ok(account)
}

pub async fn update_password(
    conn: &mut SqliteConnection,
    user_id: &str,
    password_hash: &str,
) -> AppResult<()> {
    let result = sqlx::query(
        "UPDATE accounts SET password = ?, updated_at = ?
         WHERE user_id = ? AND provider_id = ?",
    )
    .bind(password_hash)
    .bind(Utc::now())
    .bind(user_id)
    .bind(CREDENTIAL_PROVIDER)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(
            "No password account for this user".to_string(),
        ));
    }

    Ok(())
}
