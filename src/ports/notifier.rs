//! Notifier port - outbound email delivery.

use async_trait::async_trait;
use thiserror::Error;

/// An email as handed to the delivery transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

impl EmailMessage {
    pub fn new(
        to: impl Into<String>,
        subject: impl Into<String>,
        html_body: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            html_body: html_body.into(),
        }
    }
}

/// Errors from email delivery.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotificationError {
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Email provider rejected the message: {0}")]
    Rejected(String),

    #[error("Email transport error: {0}")]
    Transport(String),
}

/// Port for delivering messages to a user's external address.
///
/// The dispatcher treats delivery as fire-and-forget: failures are logged,
/// never propagated to the webhook response.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<(), NotificationError>;
}
