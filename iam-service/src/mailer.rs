//! Mail collaborator
//!
//! Delivery is out of scope for the core; it only needs something that
//! accepts a subject, recipients and a body.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

/// Mail errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MailError {
    /// The message was refused
    #[error("Mail rejected: {0}")]
    Rejected(String),

    /// The transport could not be reached
    #[error("Mail transport unavailable: {0}")]
    Unavailable(String),
}

/// Result type for mail operations.
pub type MailResult<T> = Result<T, MailError>;

/// Outbound mail.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_mail(&self, subject: &str, recipients: &[String], content: &str) -> MailResult<()>;
}

/// Mailer that only logs what it would send.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_mail(&self, subject: &str, recipients: &[String], content: &str) -> MailResult<()> {
        tracing::info!(
            subject,
            recipients = ?recipients,
            bytes = content.len(),
            "mail dispatched to log"
        );
        Ok(())
    }
}

/// A captured message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub subject: String,
    pub recipients: Vec<String>,
    pub content: String,
}

/// Mailer that keeps messages in memory. Tests only.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<SentMail>>,
    failure: Mutex<Option<MailError>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following send fail with `error`, or succeed again with `None`.
    pub async fn fail_with(&self, error: Option<MailError>) {
        *self.failure.lock().await = error;
    }

    /// Messages accepted so far.
    pub async fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().await.clone()
    }

    /// Most recent message to `recipient`.
    pub async fn last_to(&self, recipient: &str) -> Option<SentMail> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|mail| mail.recipients.iter().any(|r| r == recipient))
            .cloned()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send_mail(&self, subject: &str, recipients: &[String], content: &str) -> MailResult<()> {
        if let Some(error) = self.failure.lock().await.clone() {
            return Err(error);
        }
        self.sent.lock().await.push(SentMail {
            subject: subject.to_string(),
            recipients: recipients.to_vec(),
            content: content.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_mailer_captures() {
        let mailer = MemoryMailer::new();
        mailer
            .send_mail("Hello", &["a@x.com".to_string()], "body")
            .await
            .unwrap();

        let mail = mailer.last_to("a@x.com").await.unwrap();
        assert_eq!(mail.subject, "Hello");
        assert!(mailer.last_to("b@x.com").await.is_none());
    }

    #[tokio::test]
    async fn test_memory_mailer_failure() {
        let mailer = MemoryMailer::new();
        mailer
            .fail_with(Some(MailError::Unavailable("smtp down".into())))
            .await;

        let result = mailer.send_mail("Hello", &["a@x.com".to_string()], "body").await;
        assert!(matches!(result, Err(MailError::Unavailable(_))));
        assert!(mailer.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_log_mailer_accepts() {
        assert!(LogMailer
            .send_mail("Hello", &["a@x.com".to_string()], "body")
            .await
            .is_ok());
    }
}
