//! Service configuration.
//!
//! Values come from environment variables prefixed with `TODO_BILLING`, with
//! `__` between nested keys. A `.env` file is read first when present.
//!
//! ```no_run
//! use todo_billing::config::AppConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load()?;
//! config.validate()?;
//! println!("listening on {}", config.server.socket_addr()?);
//! # Ok(())
//! # }
//! ```

mod database;
mod email;
mod error;
mod payment;
mod server;

pub use database::DatabaseConfig;
pub use email::EmailConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::PaymentConfig;
pub use server::{Environment, LogFormat, ServerConfig};

use serde::Deserialize;

use crate::application::WebhookSettings;

/// Root configuration for the billing service
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    pub database: DatabaseConfig,

    /// Stripe credentials and webhook verification
    pub payment: PaymentConfig,

    /// Resend credentials for customer notifications
    pub email: EmailConfig,
}

impl AppConfig {
    /// Load configuration from the environment.
    ///
    /// `TODO_BILLING__PAYMENT__STRIPE_API_KEY=sk_...` sets `payment.stripe_api_key`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::LoadError` when a required value is missing or
    /// cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("TODO_BILLING")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Semantic checks that deserialization cannot express
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.payment.validate()?;
        self.email.validate()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }

    /// Settings for the webhook handler. An unset secret is passed through
    /// empty and rejected per request.
    pub fn webhook_settings(&self) -> WebhookSettings {
        WebhookSettings::new(self.payment.stripe_webhook_secret.clone())
            .with_signature_tolerance_secs(self.payment.signature_tolerance_secs)
            .with_clock_skew_secs(self.payment.clock_skew_secs)
            .with_outbound_timeout(self.payment.outbound_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::env;
    use std::sync::Mutex;
    use std::time::Duration;

    // Env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[(&str, &str)] = &[
        ("TODO_BILLING__DATABASE__URL", "postgresql://test@localhost/billing"),
        ("TODO_BILLING__PAYMENT__STRIPE_API_KEY", "sk_test_xxx"),
        ("TODO_BILLING__PAYMENT__STRIPE_WEBHOOK_SECRET", "whsec_xxx"),
        ("TODO_BILLING__EMAIL__RESEND_API_KEY", "re_xxx"),
    ];

    const OPTIONAL: &[&str] = &[
        "TODO_BILLING__SERVER__PORT",
        "TODO_BILLING__SERVER__ENVIRONMENT",
        "TODO_BILLING__SERVER__LOG_FORMAT",
        "TODO_BILLING__PAYMENT__OUTBOUND_TIMEOUT_SECS",
        "TODO_BILLING__PAYMENT__CLOCK_SKEW_SECS",
    ];

    fn set_minimal_env() {
        for (key, value) in VARS {
            env::set_var(key, value);
        }
    }

    fn clear_env() {
        for (key, _) in VARS {
            env::remove_var(key);
        }
        for key in OPTIONAL {
            env::remove_var(key);
        }
    }

    fn load_with(extra: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        set_minimal_env();
        for (key, value) in extra {
            env::set_var(key, value);
        }
        let result = AppConfig::load();
        clear_env();
        result
    }

    #[test]
    fn test_load_from_environment() {
        let config = load_with(&[]).unwrap();
        assert_eq!(config.database.url, "postgresql://test@localhost/billing");
        assert_eq!(config.payment.stripe_api_key, "sk_test_xxx");
        assert_eq!(config.email.resend_api_key, "re_xxx");
    }

    #[test]
    fn test_validate_full_config() {
        let config = load_with(&[]).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_apply() {
        let config = load_with(&[]).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
        assert_eq!(config.server.log_format, LogFormat::Pretty);
        assert_eq!(config.payment.signature_tolerance_secs, 300);
        assert_eq!(config.payment.api_base_url, "https://api.stripe.com");
    }

    #[test]
    fn test_overrides_nested_values() {
        let config = load_with(&[
            ("TODO_BILLING__SERVER__PORT", "3000"),
            ("TODO_BILLING__SERVER__ENVIRONMENT", "production"),
            ("TODO_BILLING__SERVER__LOG_FORMAT", "json"),
            ("TODO_BILLING__PAYMENT__OUTBOUND_TIMEOUT_SECS", "4"),
        ])
        .unwrap();
        assert_eq!(config.server.port, 3000);
        assert!(config.is_production());
        assert_eq!(config.server.log_format, LogFormat::Json);
        assert_eq!(config.payment.outbound_timeout(), Duration::from_secs(4));
    }

    #[test]
    fn test_webhook_settings_from_config() {
        let config = load_with(&[
            ("TODO_BILLING__PAYMENT__OUTBOUND_TIMEOUT_SECS", "4"),
            ("TODO_BILLING__PAYMENT__CLOCK_SKEW_SECS", "900"),
        ])
        .unwrap();
        let settings = config.webhook_settings();
        assert_eq!(settings.webhook_secret.expose_secret(), "whsec_xxx");
        assert_eq!(settings.signature_tolerance_secs, 300);
        assert_eq!(settings.clock_skew_secs, 900);
        assert_eq!(settings.outbound_timeout, Duration::from_secs(4));
    }

    #[test]
    fn test_missing_database_url_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        set_minimal_env();
        env::remove_var("TODO_BILLING__DATABASE__URL");
        let result = AppConfig::load();
        clear_env();

        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }
}
