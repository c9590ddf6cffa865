//! # Database Models
//!
//! Row types for the four auth tables. They serialize to camelCase JSON for
//! the API. Secret columns are never serialized.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Provider id of email/password accounts.
pub const CREDENTIAL_PROVIDER: &str = "credential";

/// Root identity record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    /// Unique, stored trimmed and lower-cased
    pub email: String,
    pub email_verified: bool,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            email_verified: false,
            image: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A signed-in browser. The token is what the session cookie carries.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(
        user_id: String,
        token: String,
        expires_in: Duration,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            token,
            expires_at: now + expires_in,
            ip_address,
            user_agent,
            user_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Credential or provider linkage for a user
///
/// Only the `credential` provider is created by this server; the token
/// columns are kept for provider accounts.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub account_id: String,
    pub provider_id: String,
    pub user_id: String,
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing)]
    pub id_token: Option<String>,
    pub access_token_expires_at: Option<DateTime<Utc>>,
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
    pub scope: Option<String>,
    /// Argon2 PHC string
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Email/password account: `account_id` is the user id.
    pub fn credential(user_id: &str, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            account_id: user_id.to_string(),
            provider_id: CREDENTIAL_PROVIDER.to_string(),
            user_id: user_id.to_string(),
            access_token: None,
            refresh_token: None,
            id_token: None,
            access_token_expires_at: None,
            refresh_token_expires_at: None,
            scope: None,
            password: Some(password_hash),
            created_at: now,
            updated_at: now,
        }
    }
}

/// What a verification token is for. Encoded into the identifier column
/// as `<purpose>:<user id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationPurpose {
    ResetPassword,
    EmailVerification,
}

impl VerificationPurpose {
    pub fn prefix(self) -> &'static str {
        match self {
            VerificationPurpose::ResetPassword => "reset-password",
            VerificationPurpose::EmailVerification => "email-verification",
        }
    }

    pub fn identifier(self, user_id: &str) -> String {
        format!("{}:{}", self.prefix(), user_id)
    }

    pub fn ttl(self) -> Duration {
        match self {
            VerificationPurpose::ResetPassword => Duration::hours(1),
            VerificationPurpose::EmailVerification => Duration::hours(24),
        }
    }
}

/// Short-lived token for password reset or email verification
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Verification {
    pub id: String,
    pub identifier: String,
    /// The token itself
    pub value: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Verification {
    pub fn new(purpose: VerificationPurpose, user_id: &str, token: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            identifier: purpose.identifier(user_id),
            value: token,
            expires_at: now + purpose.ttl(),
            created_at: now,
            updated_at: now,
        }
    }

    /// User id encoded in the identifier, if it carries `purpose`.
    pub fn user_id_for(&self, purpose: VerificationPurpose) -> Option<&str> {
        self.identifier
            .strip_prefix(purpose.prefix())
            .and_then(|rest| rest.strip_prefix(':'))
            .filter(|id| !id.is_empty())
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}
