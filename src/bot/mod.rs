//! Operator commands received in the notification chat.
//!
//! The bot long-polls Telegram for messages and answers `/check`, `/set`,
//! `/delete` and `/list`. Only the configured chat may use them.

mod commands;
mod models;

pub use commands::{BotCommand, CommandHandler};
pub use models::{Chat, IncomingMessage, Update};

use crate::notifier::{NotifyError, TelegramApi};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

/// Extra time granted to a long poll on top of its server-side timeout.
const POLL_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

/// The Bot API calls the command poller needs.
#[async_trait]
pub trait BotApi: Send + Sync {
    /// Wait up to `timeout` for updates with an id of at least `offset`.
    async fn get_updates(&self, offset: Option<i64>, timeout: Duration) -> Result<Vec<Update>, NotifyError>;

    /// Answer in a chat. `html` is Telegram HTML.
    async fn send_reply(&self, chat_id: i64, html: &str) -> Result<(), NotifyError>;
}

#[async_trait]
impl BotApi for TelegramApi {
    async fn get_updates(&self, offset: Option<i64>, timeout: Duration) -> Result<Vec<Update>, NotifyError> {
        let mut body = json!({
            "timeout": timeout.as_secs(),
            "allowed_updates": ["message"],
        });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }
        self.call("getUpdates", body, Some(timeout + POLL_TIMEOUT_MARGIN))
            .await
    }

    async fn send_reply(&self, chat_id: i64, html: &str) -> Result<(), NotifyError> {
        self.send_message(&chat_id.to_string(), html, true).await
    }
}
