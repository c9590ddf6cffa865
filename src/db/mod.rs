//! # Database Module
//!
//! Data access for the four auth tables, one submodule per table:
//! - `models`: row types
//! - `users`, `sessions`, `accounts`, `verifications`: queries
//!
//! The pool is created once at startup and shared through `AppState`.

pub mod accounts;
pub mod models;
pub mod sessions;
pub mod users;
pub mod verifications;

use crate::error::AppResult;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

/// Open a connection pool.
///
/// In-memory databases exist per connection, so their pools never recycle
/// connections.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let mut options = SqlitePoolOptions::new().max_connections(max_connections);
    if database_url.contains(":memory:") {
        options = options.idle_timeout(None).max_lifetime(None);
    }
    options.connect(database_url).await
}

/// Apply the embedded migrations from `./migrations`.
pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Delete expired sessions and verification tokens. Run periodically.
pub async fn cleanup_expired(pool: &SqlitePool) -> AppResult<(u64, u64)> {
    let sessions = sessions::delete_expired(pool).await?;
    let verifications = verifications::delete_expired(pool).await?;
    Ok((sessions, verifications))
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = connect("sqlite::memory:", 1).await.unwrap();
    migrate(&pool).await.unwrap();
    pool
}
