//! # Session Database Operations
//!
//! Session rows are looked up by token. Expiry is checked by the callers in
//! [`crate::auth`]; `delete_expired` backs the periodic cleanup task.

use crate::db::models::Session;
use crate::error::AppResult;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

pub async fn insert_session(pool: &SqlitePool, session: &Session) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO sessions (id, token, expires_at, ip_address, user_agent, user_id, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&session.id)
    .bind(&session.token)
    .bind(session.expires_at)
    .bind(&session.ip_address)
    .bind(&session.user_agent)
    .bind(&session.user_id)
    .bind(session.created_at)
    .bind(session.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn find_by_token(pool: &SqlitePool, token: &str) -> AppResult<Option<Session>> {
    let session = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE token = ?")
        .bind(token)
        .fetch_optional(pool)
        .await?;

    Ok(session)
}

/// Sessions of a user that have not expired yet, newest first.
pub async fn list_active_for_user(pool: &SqlitePool, user_id: &str) -> AppResult<Vec<Session>> {
    let sessions = sqlx::query_as::<_, Session>(
        "SELECT * FROM sessions
         WHERE user_id = ? AND expires_at > ?
         ORDER BY created_at DESC",
    )
    .bind(user_id)
    .bind(Utc::now())
    .fetch_all(pool)
    .await?;

    Ok(sessions)
}

pub async fn update_expiry(
    pool: &SqlitePool,
    token: &str,
    expires_at: DateTime<Utc>,
) -> AppResult<()> {
    sqlx::query("UPDATE sessions SET expires_at = ?, updated_at = ? WHERE token = ?")
        .bind(expires_at)
        .bind(Utc::now())
        .bind(token)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn delete_by_token(pool: &SqlitePool, token: &str) -> AppResult<()> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn delete_for_user(pool: &SqlitePool, user_id: &str) -> AppResult<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Delete every session of `user_id` except the one holding `keep_token`.
pub async fn delete_others_for_user(
    pool: &SqlitePool,
    user_id: &str,
    keep_token: &str,
) -> AppResult<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE user_id = ? AND token <> ?")
        .bind(user_id)
        .bind(keep_token)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

pub async fn delete_expired(pool: &SqlitePool) -> AppResult<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(Utc::now())
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
