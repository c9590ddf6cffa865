//! # Verification Token Operations
//!
//! Tokens are single-use: [`consume`] deletes the row it returns, inside
//! the caller's transaction.

use crate::db::models::{Verification, VerificationPurpose};
use crate::error::AppResult;
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

pub async fn insert_verification(pool: &SqlitePool, verification: &Verification) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO verifications (id, identifier, value, expires_at, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&verification.id)
    .bind(&verification.identifier)
    .bind(&verification.value)
    .bind(verification.expires_at)
    .bind(verification.created_at)
    .bind(verification.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Remove any outstanding token of `purpose` for `user_id`.
///
/// Called before issuing a new token so only the latest link works.
pub async fn delete_for_identifier(
    pool: &SqlitePool,
    purpose: VerificationPurpose,
    user_id: &str,
) -> AppResult<()> {
    sqlx::query("DELETE FROM verifications WHERE identifier = ?")
        .bind(purpose.identifier(user_id))
        .execute(pool)
        .await?;

    Ok(())
}

/// Take a token of the given purpose and return its user id.
///
/// The row is deleted whether or not it has expired. Returns `None` for
/// unknown, expired or wrong-purpose tokens.
pub async fn consume(
    conn: &mut SqliteConnection,
    purpose: VerificationPurpose,
    token: &str,
) -> AppResult<Option<String>> {
    let verification = sqlx::query_as::<_, Verification>(
        "SELECT * FROM verifications WHERE value = ? AND identifier LIKE ?",
    )
    .bind(token)
    .bind(format!("{}:%", purpose.prefix()))
    .fetch_optional(&mut *conn)
    .await?;

    let Some(verification) = verification else {
        return Ok(None);
    };

    sqlx::query("DELETE FROM verifications WHERE id = ?")
        .bind(&verification.id)
        .execute(&mut *conn)
        .await?;

    if verification.is_expired() {
        return Ok(None);
    }

    Ok(verification.user_id_for(purpose).map(str::to_string))
}

pub async fn delete_expired(pool: &SqlitePool) -> AppResult<u64> {
    let result = sqlx::query("DELETE FROM verifications WHERE expires_at <= ?")
        .bind(Utc::now())
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
