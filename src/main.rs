//! # Launchpad Server
//!
//! Entry point: load configuration, open the database, start the cleanup
//! task and serve the router from [`launchpad::app`].

use launchpad::config::{Config, Environment};
use launchpad::state::AppState;
use launchpad::{app, logging};
use std::net::SocketAddr;

/// How often expired sessions, verification tokens and cookie session
/// records are purged.
const CLEANUP_INTERVAL_SECS: u64 = 600;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            // No environment is known yet, so report with the dev formatter
            logging::init(Environment::Development);
            tracing::error!("Invalid configuration: {:#}", e);
            return Err(e);
        }
    };

    logging::init(config.environment);
    tracing::info!("Configuration loaded: {:?}", config);

    let app_state = AppState::new(&config).await?;
    tracing::info!(flags = ?app_state.flags(), "Application state initialized");

    let store = app::session_store(app_state.db.clone()).await?;

    let cleanup_pool = app_state.db.clone();
    let cleanup_store = store.clone();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(CLEANUP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            match app::purge_expired(&cleanup_pool, &cleanup_store).await {
                Ok((sessions, verifications)) => {
                    tracing::debug!(sessions, verifications, "expired rows removed")
                }
                Err(e) => tracing::error!("Cleanup failed: {:?}", e),
            }
        }
    });

    let router = app::build(app_state, store);

    let bind_addr = config.bind_address();
    tracing::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
