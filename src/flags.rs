//! # Feature Flags
//!
//! A static default map merged with `NEXT_PUBLIC_FEATURE_<NAME>` or
//! `FEATURE_<NAME>` environment overrides. When both spellings set the same
//! flag, the `NEXT_PUBLIC_` one wins. Flags are resolved once at startup and
//! never change afterwards.

use anyhow::{bail, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// Prefixes of environment variables that override a flag, lowest
/// precedence first.
pub const ENV_PREFIXES: &[&str] = &["FEATURE_", "NEXT_PUBLIC_FEATURE_"];

/// Built-in flags and their default values.
pub const DEFAULT_FLAGS: &[(&str, bool)] = &[
    ("signup", true),
    ("email_verification", false),
    ("password_reset", true),
    ("theme_toggle", true),
    ("session_list", true),
];

pub const SIGNUP: &str = "signup";
pub const EMAIL_VERIFICATION: &str = "email_verification";
pub const PASSWORD_RESET: &str = "password_reset";
pub const THEME_TOGGLE: &str = "theme_toggle";
pub const SESSION_LIST: &str = "session_list";

/// Resolved set of named boolean flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FeatureFlags {
    flags: BTreeMap<String, bool>,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            flags: DEFAULT_FLAGS
                .iter()
                .map(|(name, enabled)| (name.to_string(), *enabled))
                .collect(),
        }
    }
}

impl FeatureFlags {
    /// Merge the defaults with every flag override in `vars`.
    ///
    /// Other variables are ignored. An unparseable value is an error.
    pub fn from_env_vars<'a, I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let vars: Vec<(&str, &str)> = vars.into_iter().collect();
        let mut flags = Self::default();

        for prefix in ENV_PREFIXES {
            for &(key, value) in &vars {
                let Some(name) = key.strip_prefix(prefix) else {
                    continue;
                };
                if name.is_empty() {
                    continue;
                }
                let Some(enabled) = parse_bool(value) else {
                    bail!("{} must be a boolean (got '{}')", key, value);
                };
                flags.set(&name.to_ascii_lowercase(), enabled);
            }
        }
        Ok(flags)
    }

    /// Returns whether `name` is enabled. Unknown flags are disabled.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    pub fn set(&mut self, name: &str, enabled: bool) {
        self.flags.insert(name.to_string(), enabled);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.flags.iter().map(|(name, enabled)| (name.as_str(), *enabled))
    }
}

/// `true/1/on/yes` or `false/0/off/no`, ignoring case and whitespace.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Some(true),
        "false" | "0" | "off" | "no" => Some(false),
        _ => None,
    }
}
