//! # Logging
//!
//! Subscriber setup and redaction of sensitive fields before anything
//! request-supplied reaches a log line.

use crate::config::Environment;
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,launchpad=debug";

pub const REDACTED: &str = "[REDACTED]";

/// Field names whose values never reach the logs. Compared after
/// [`normalize_key`], so `new_password` and `newPassword` both match.
pub const SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "newpassword",
    "currentpassword",
    "token",
    "secret",
    "authorization",
    "cookie",
    "accesstoken",
    "refreshtoken",
    "idtoken",
    "apikey",
];

/// Install the global tracing subscriber.
///
/// Production writes JSON lines; other environments use the pretty
/// formatter.
pub fn init(environment: Environment) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    if environment.is_production() {
        registry
            .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

pub fn is_sensitive(key: &str) -> bool {
    let key = normalize_key(key);
    SENSITIVE_FIELDS.contains(&key.as_str())
}

/// Copy of `value` with every sensitive key's value replaced, at any depth.
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, inner)| {
                    let inner = if is_sensitive(key) {
                        Value::String(REDACTED.to_string())
                    } else {
                        redact(inner)
                    };
                    (key.clone(), inner)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

/// Serialize `input` and redact it in one step, for log fields.
pub fn redacted<T: serde::Serialize>(input: &T) -> Value {
    match serde_json::to_value(input) {
        Ok(value) => redact(&value),
        Err(_) => Value::String(REDACTED.to_string()),
    }
}
