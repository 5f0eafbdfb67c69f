//! Out-of-band notifications.
//!
//! Fire-and-forget status messages about finished or failed sessions.
//! Delivery failures are the notifier's problem to report via logs; they
//! never affect the session outcome.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, instrument};

/// Notification delivery errors.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The notification request failed.
    #[error("notification delivery failed: {0}")]
    Delivery(#[from] reqwest::Error),
}

/// Interface to the out-of-band notification channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends one text message.
    async fn notify(&self, text: &str) -> Result<(), NotifyError>;
}

/// Telegram bot notifier.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    /// Creates a notifier for one bot/chat pair.
    #[must_use]
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    #[instrument(skip(self, text))]
    async fn notify(&self, text: &str) -> Result<(), NotifyError> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        self.client
            .get(&url)
            .query(&[("chat_id", self.chat_id.as_str()), ("text", text)])
            .send()
            .await?
            .error_for_status()?;
        debug!("notification delivered");
        Ok(())
    }
}
