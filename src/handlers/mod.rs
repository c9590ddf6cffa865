//! # HTTP Handlers
//!
//! - `auth`: JSON auth API under `/api/auth`
//! - `actions`: server actions shared by `/actions/*` and the HTML forms
//! - `pages`: server-rendered pages
//! - `preferences`: feature flags and theme
//! - `users`, `health`

pub mod actions;
pub mod auth;
pub mod health;
pub mod pages;
pub mod preferences;
pub mod users;
