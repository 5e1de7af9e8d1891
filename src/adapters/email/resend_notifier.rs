//! Resend email adapter.
//!
//! Sends transactional HTML email through the Resend HTTP API
//! (`POST /emails`, bearer-token auth).

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::ports::{NotificationError, Notifier};

const DEFAULT_API_BASE_URL: &str = "https://api.resend.com";

/// Resend API configuration.
#[derive(Clone)]
pub struct ResendConfig {
    api_key: SecretString,
    /// Value of the `From` header, e.g. `Todo App <noreply@example.com>`.
    from: String,
    api_base_url: String,
}

impl ResendConfig {
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            from: from.into(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

/// `Notifier` backed by Resend.
pub struct ResendNotifier {
    config: ResendConfig,
    http_client: reqwest::Client,
}

impl ResendNotifier {
    pub fn new(config: ResendConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }
}

fn validate_recipient(to: &str) -> Result<(), NotificationError> {
    let trimmed = to.trim();
    match trimmed.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(NotificationError::InvalidRecipient(to.to_string())),
    }
}

#[async_trait]
impl Notifier for ResendNotifier {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<(), NotificationError> {
        validate_recipient(to)?;

        let request = SendEmailRequest {
            from: &self.config.from,
            to: [to],
            subject,
            html: html_body,
        };

        let response = self
            .http_client
            .post(format!("{}/emails", self.config.api_base_url))
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Rejected(format!("{}: {}", status, body)));
        }
        if !status.is_success() {
            return Err(NotificationError::Transport(format!(
                "Resend returned {}",
                status
            )));
        }

        tracing::debug!(subject = subject, "Email accepted by Resend");
        Ok(())
    }
}
