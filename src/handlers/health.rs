//! # Health Check Handler
//!
//! Liveness check for load balancers and monitoring.

use axum::Json;
use serde_json::{json, Value};

/// `GET /health`
///
/// Never fails, so it returns `Json<Value>` rather than `AppResult`.
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "launchpad"
    }))
}
