//! # Configuration Management
//!
//! Configuration comes from the environment, read once at startup. A `.env`
//! file is loaded first when present.
//!
//! ## Environment Variables
//! Each setting has a deployment name and a short alias. When both are set,
//! the deployment name wins.
//!
//! | Setting | Name | Alias | Default |
//! |---|---|---|---|
//! | sqlx connection string | `DATABASE_URL` | | required |
//! | cookie signing secret, 32+ chars | `BETTER_AUTH_SECRET` | `AUTH_SECRET` | required |
//! | public base URL, used in emailed links | `NEXT_PUBLIC_APP_URL` | `APP_URL` | http://localhost:3000 |
//! | base URL of the auth API, also allowed by CORS | `BETTER_AUTH_URL` | `AUTH_URL` | the app URL |
//! | `development`, `test` or `production` | `NODE_ENV` | `APP_ENV` | development |
//! | trust `X-Forwarded-For` / `X-Real-IP` | `TRUST_PROXY` | | false |
//! | bind address / port | `HOST` / `PORT` | | 127.0.0.1 / 3000 |
//!
//! Feature flag overrides are `NEXT_PUBLIC_FEATURE_<NAME>` or
//! `FEATURE_<NAME>`, see [`crate::flags`].
//!
//! Any validation failure is returned as an error, and `main` exits before
//! the server binds.

use crate::flags::FeatureFlags;
use anyhow::{anyhow, bail, Context, Result};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Minimum length accepted for the auth secret.
pub const MIN_SECRET_LENGTH: usize = 32;

pub const SECRET_VARS: &[&str] = &["BETTER_AUTH_SECRET", "AUTH_SECRET"];
pub const APP_URL_VARS: &[&str] = &["NEXT_PUBLIC_APP_URL", "APP_URL"];
pub const AUTH_URL_VARS: &[&str] = &["BETTER_AUTH_URL", "AUTH_URL"];
pub const ENVIRONMENT_VARS: &[&str] = &["NODE_ENV", "APP_ENV"];

/// Deployment environment, the counterpart of `NODE_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(anyhow!(
                "NODE_ENV must be one of development, test, production (got '{}')",
                other
            )),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Production => "production",
        };
        f.write_str(name)
    }
}

/// Application configuration
///
/// Holds every value the server needs after startup. `Debug` is written by
/// hand so that logging the config never prints the secret.
#[derive(Clone)]
pub struct Config {
    /// Server host/IP address to bind to
    pub host: String,

    /// Server port number
    pub port: u16,

    /// Database connection URL
    /// Format: "sqlite:filename.db?mode=rwc"
    pub database_url: String,

    /// Public base URL of the application, without a trailing slash
    pub app_url: String,

    /// Base URL of the auth API, without a trailing slash
    pub auth_url: String,

    /// Secret used to derive the session cookie signing key
    pub auth_secret: String,

    pub environment: Environment,

    /// Take the client address from proxy headers instead of the socket
    pub trust_proxy: bool,

    /// Feature flags resolved from defaults plus environment overrides
    pub flags: FeatureFlags,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_url", &self.database_url)
            .field("app_url", &self.app_url)
            .field("auth_url", &self.auth_url)
            .field("auth_secret", &"[REDACTED]")
            .field("environment", &self.environment)
            .field("trust_proxy", &self.trust_proxy)
            .field("flags", &self.flags)
            .finish()
    }
}

impl Config {
    /// Load configuration from the process environment
    ///
    /// Reads `.env` if it exists (dotenvy doesn't error if the file is
    /// missing), then validates everything through [`Config::from_vars`].
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Build and validate configuration from explicit key/value pairs
    ///
    /// Empty values count as unset.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(_, v)| !v.trim().is_empty())
            .collect();
        let get = |key: &str| vars.get(key).map(|v| v.trim().to_string());
        // First name in `keys` that is set, with the name it was found under
        let get_any = |keys: &[&'static str]| {
            keys.iter()
                .find_map(|&key| get(key).map(|value| (key, value)))
        };

        let database_url = get("DATABASE_URL").context("DATABASE_URL is required")?;

        let (secret_var, auth_secret) =
            get_any(SECRET_VARS).context("BETTER_AUTH_SECRET (or AUTH_SECRET) is required")?;
        if auth_secret.len() < MIN_SECRET_LENGTH {
            bail!(
                "{} must be at least {} characters long",
                secret_var,
                MIN_SECRET_LENGTH
            );
        }

        let app_url = match get_any(APP_URL_VARS) {
            Some((name, raw)) => parse_base_url(name, &raw)?,
            None => "http://localhost:3000".to_string(),
        };
        let auth_url = match get_any(AUTH_URL_VARS) {
            Some((name, raw)) => parse_base_url(name, &raw)?,
            None => app_url.clone(),
        };

        let environment = match get_any(ENVIRONMENT_VARS) {
            Some((_, raw)) => raw.parse()?,
            None => Environment::Development,
        };

        let trust_proxy = match get("TRUST_PROXY") {
            Some(raw) => crate::flags::parse_bool(&raw)
                .with_context(|| format!("TRUST_PROXY must be a boolean (got '{}')", raw))?,
            None => false,
        };

        let port = get("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse::<u16>()
            .context("PORT must be a number between 0 and 65535")?;

        let flags = FeatureFlags::from_env_vars(
            vars.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        )?;

        Ok(Config {
            host: get("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            database_url,
            app_url,
            auth_url,
            auth_secret,
            environment,
            trust_proxy,
            flags,
        })
    }

    /// Get the socket address to bind the server to, e.g. "127.0.0.1:3000"
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Absolute URL for a path under the application base URL.
    pub fn app_link(&self, path: &str) -> String {
        format!("{}{}", self.app_url, path)
    }
}

fn parse_base_url(name: &str, raw: &str) -> Result<String> {
    let url = Url::parse(raw).with_context(|| format!("{} must be an absolute URL", name))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("{} must use http or https (got '{}')", name, url.scheme());
    }
    Ok(raw.trim_end_matches('/').to_string())
}
