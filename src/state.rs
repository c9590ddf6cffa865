//! # Application State
//!
//! Resources shared by every request handler. Axum clones the state for
//! each request, which is cheap: the pool is already a handle and the rest
//! sits behind `Arc`.

use crate::auth::mailer::{LogMailer, Mailer};
use crate::config::Config;
use crate::db;
use crate::flags::FeatureFlags;
use anyhow::{Context, Result};
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;

/// Connections kept by the pool outside of tests.
pub const MAX_DB_CONNECTIONS: u32 = 5;

#[derive(Clone)]
pub struct AppState {
    /// Database connection pool, shared with the session store
    pub db: SqlitePool,

    pub config: Arc<Config>,

    /// Delivery of password-reset and verification emails
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Connect to the database, run migrations and use the logging mailer.
    ///
    /// Emailed links are only logged in full outside production.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = db::connect(&config.database_url, MAX_DB_CONNECTIONS)
            .await
            .context("failed to connect to the database")?;

        db::migrate(&db).await.context("failed to run migrations")?;

        if config.environment.is_production() {
            tracing::warn!("no mail transport configured; emails are only logged");
        }

        let mailer = LogMailer::new(!config.environment.is_production());
        Ok(Self::with_pool(db, config.clone(), Arc::new(mailer)))
    }

    /// Assemble state around an existing pool.
    pub fn with_pool(db: SqlitePool, config: Config, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            mailer,
        }
    }

    pub fn flags(&self) -> &FeatureFlags {
        &self.config.flags
    }
}

#[cfg(test)]
pub(crate) async fn test_state(
    flag_overrides: &[(&str, bool)],
) -> (AppState, Arc<crate::auth::mailer::RecordingMailer>) {
    let mut config = Config::from_vars(vec![
        ("DATABASE_URL", "sqlite::memory:"),
        ("AUTH_SECRET", "test-secret-key-that-is-at-least-32-characters-long"),
        ("APP_ENV", "test"),
    ])
    .unwrap();
    for (name, enabled) in flag_overrides {
        config.flags.set(name, *enabled);
    }

    let mailer = Arc::new(crate::auth::mailer::RecordingMailer::new());
    let state = AppState::with_pool(db::test_pool().await, config, mailer.clone());
    (state, mailer)
}
