//! # Middleware Module
//!
//! - `auth`: session gate for pages (redirect) and JSON routes (401)
//! - `security`: security headers and CORS

pub mod auth;
pub mod security;
