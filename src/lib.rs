//! # Launchpad
//!
//! Web application starter: email/password accounts, database-backed
//! sessions, feature flags, a theme preference and server-rendered pages,
//! served by axum over SQLite.

pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod flags;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod state;
pub mod theme;
pub mod views;
