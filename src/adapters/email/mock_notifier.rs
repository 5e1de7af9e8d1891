//! In-process `Notifier` that records messages instead of sending them.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::ports::{EmailMessage, NotificationError, Notifier};

#[derive(Default)]
struct MockState {
    sent: Vec<EmailMessage>,
    attempts: usize,
    error: Option<NotificationError>,
    delay: Option<Duration>,
}

/// Recording notifier for tests and local runs without an email provider.
#[derive(Default, Clone)]
pub struct MockNotifier {
    inner: Arc<Mutex<MockState>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every send with `error`.
    pub fn set_error(&self, error: NotificationError) {
        self.lock().error = Some(error);
    }

    /// Delay every send by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = Some(delay);
    }

    /// Messages that were accepted.
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.lock().sent.clone()
    }

    /// Number of send attempts, successful or not.
    pub fn attempts(&self) -> usize {
        self.lock().attempts
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<(), NotificationError> {
        let delay = {
            let mut state = self.lock();
            state.attempts += 1;
            state.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        if let Some(error) = state.error.clone() {
            return Err(error);
        }
        state.sent.push(EmailMessage::new(to, subject, html_body));
        Ok(())
    }
}
