//! # Outgoing Mail
//!
//! Password-reset and verification emails go through [`Mailer`]. The
//! default [`LogMailer`] only writes the message to the log, which is enough
//! for local development. Plug a real transport in by implementing the
//! trait.

use crate::error::AppResult;
use crate::logging::REDACTED;
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
}

impl Email {
    /// Value of the first `token=` query parameter in the body, if any.
    pub fn link_token(&self) -> Option<&str> {
        let start = self.text.find("token=")? + "token=".len();
        let rest = &self.text[start..];
        let end = rest
            .find(|c: char| c.is_whitespace() || c == '&')
            .unwrap_or(rest.len());
        Some(&rest[..end])
    }

    /// Body with every `token=` value replaced by [`REDACTED`].
    pub fn masked_text(&self) -> String {
        let mut masked = String::with_capacity(self.text.len());
        let mut rest = self.text.as_str();
        while let Some(found) = rest.find("token=") {
            let value_start = found + "token=".len();
            masked.push_str(&rest[..value_start]);
            masked.push_str(REDACTED);
            let tail = &rest[value_start..];
            let end = tail
                .find(|c: char| c.is_whitespace() || c == '&')
                .unwrap_or(tail.len());
            rest = &tail[end..];
        }
        masked.push_str(rest);
        masked
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> AppResult<()>;
}

/// Writes every message to the log instead of delivering it.
///
/// Link tokens are masked unless `reveal_links` is set.
#[derive(Debug, Default)]
pub struct LogMailer {
    pub reveal_links: bool,
}

impl LogMailer {
    pub fn new(reveal_links: bool) -> Self {
        Self { reveal_links }
    }

    fn body(&self, email: &Email) -> String {
        if self.reveal_links {
            email.text.clone()
        } else {
            email.masked_text()
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> AppResult<()> {
        tracing::info!(to = %email.to, subject = %email.subject, "email: {}", self.body(&email));
        Ok(())
    }
}

/// Keeps sent messages in memory. Used by tests to read emailed tokens.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<Email>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    /// Most recent message addressed to `to`.
    pub fn last_to(&self, to: &str) -> Option<Email> {
        self.sent().into_iter().rev().find(|email| email.to == to)
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: Email) -> AppResult<()> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email);
        }
        Ok(())
    }
}
