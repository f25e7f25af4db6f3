//! Outgoing mail.
//!
//! Only confirmation mails exist. `LogMailer` writes the link to the log
//! instead of delivering it.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("recipient address is empty")]
    EmptyRecipient,
    #[error("mail delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_confirmation(&self, email: &str, link: &str) -> Result<(), MailError>;
}

/// Logs confirmation links through tracing.
#[derive(Clone, Debug)]
pub struct LogMailer {
    pub sender: String,
    pub enabled: bool,
}

impl LogMailer {
    pub fn new(sender: impl Into<String>, enabled: bool) -> Self {
        Self { sender: sender.into(), enabled }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send_confirmation(&self, email: &str, link: &str) -> Result<(), MailError> {
        if email.trim().is_empty() {
            return Err(MailError::EmptyRecipient);
        }
        if self.enabled {
            info!(event = "confirmation_mail", from = %self.sender, to = %email, %link, "confirmation mail queued");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_empty_recipient() {
        let mailer = LogMailer::new("shop@example.com", true);
        assert!(matches!(mailer.send_confirmation(" ", "http://x").await, Err(MailError::EmptyRecipient)));
        assert!(mailer.send_confirmation("jane@example.com", "http://x").await.is_ok());
    }
}
