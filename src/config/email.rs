//! Email configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Email configuration (Resend)
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// Resend API key
    pub resend_api_key: String,

    /// From email address
    #[serde(default = "default_from_email")]
    pub from_email: String,

    /// From name
    #[serde(default = "default_from_name")]
    pub from_name: String,

    /// Resend API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

impl EmailConfig {
    /// Get formatted "From" header value
    pub fn from_header(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_email)
    }

    /// Validate email configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.resend_api_key.is_empty() {
            return Err(ValidationError::MissingRequired("RESEND_API_KEY"));
        }
        if !self.resend_api_key.starts_with("re_") {
            return Err(ValidationError::InvalidResendKey);
        }
        if !self.from_email.contains('@') {
            return Err(ValidationError::InvalidFromEmail);
        }
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            return Err(ValidationError::InvalidApiBaseUrl("email.api_base_url"));
        }
        Ok(())
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            resend_api_key: String::new(),
            from_email: default_from_email(),
            from_name: default_from_name(),
            api_base_url: default_api_base_url(),
        }
    }
}

fn default_from_email() -> String {
    "billing@todo.app".to_string()
}

fn default_from_name() -> String {
    "Todo App Billing".to_string()
}

fn default_api_base_url() -> String {
    "https://api.resend.com".to_string()
}
