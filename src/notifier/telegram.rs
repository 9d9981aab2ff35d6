//! Telegram Bot API client and notifier.

use super::format::{render_events, split_message, to_plain_text, RenderedPhoto, MAX_MESSAGE_LENGTH};
use super::{Notifier, NotifyError};
use crate::events::ChangeEvent;
use async_trait::async_trait;
use chrono::FixedOffset;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, warn};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Pause between consecutive messages to stay under the chat rate limit.
const MESSAGE_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    /// Offset used to render track dates.
    pub utc_offset_hours: i32,
    pub timeout: Duration,
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    description: Option<String>,
    result: Option<T>,
}

/// Bot API client shared by the notifier and the chat command poller.
#[derive(Clone)]
pub struct TelegramApi {
    client: reqwest::Client,
    api_base: String,
}

impl TelegramApi {
    pub fn new(bot_token: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: format!("{}/bot{}", TELEGRAM_API_BASE, bot_token),
        })
    }

    /// Call a Bot API method. `timeout` overrides the client timeout, for
    /// long polls.
    pub(crate) async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
        timeout: Option<Duration>,
    ) -> Result<T, NotifyError> {
        let mut request = self
            .client
            .post(format!("{}/{}", self.api_base, method))
            .json(&body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request
            .send()
            .await
            .map_err(|e| NotifyError::Http(e.without_url().to_string()))?;

        let status = response.status();
        let parsed: Option<ApiResponse<T>> = response.json().await.ok();
        match parsed {
            Some(ApiResponse {
                ok: true,
                result: Some(result),
                ..
            }) if status.is_success() => Ok(result),
            Some(api) => Err(NotifyError::Api {
                status: status.as_u16(),
                description: api.description.unwrap_or_default(),
            }),
            None => Err(NotifyError::Api {
                status: status.as_u16(),
                description: "unreadable response".to_string(),
            }),
        }
    }

    /// Send a message, as HTML when `html` is set.
    pub async fn send_message(&self, chat_id: &str, text: &str, html: bool) -> Result<(), NotifyError> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "disable_web_page_preview": true,
        });
        if html {
            body["parse_mode"] = json!("HTML");
        }
        let _: IgnoredAny = self.call("sendMessage", body, None).await?;
        Ok(())
    }

    async fn send_photo(&self, chat_id: &str, photo: &RenderedPhoto) -> Result<(), NotifyError> {
        let _: IgnoredAny = self
            .call(
                "sendPhoto",
                json!({
                    "chat_id": chat_id,
                    "photo": photo.url,
                    "caption": photo.caption,
                    "parse_mode": "HTML",
                }),
                None,
            )
            .await?;
        Ok(())
    }
}

pub struct TelegramNotifier {
    api: TelegramApi,
    chat_id: String,
    offset: FixedOffset,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> anyhow::Result<Self> {
        let offset = FixedOffset::east_opt(config.utc_offset_hours * 3600)
            .ok_or_else(|| anyhow::anyhow!("Invalid UTC offset: {}", config.utc_offset_hours))?;

        Ok(Self {
            api: TelegramApi::new(&config.bot_token, config.timeout)?,
            chat_id: config.chat_id,
            offset,
        })
    }

    /// Send HTML, retrying once as plain text if Telegram rejects the markup.
    async fn send_text(&self, html: &str) -> Result<(), NotifyError> {
        match self.api.send_message(&self.chat_id, html, true).await {
            Err(NotifyError::Api { description, .. }) => {
                warn!("HTML message rejected ({}), retrying as plain text", description);
                self.api
                    .send_message(&self.chat_id, &to_plain_text(html), false)
                    .await
            }
            other => other,
        }
    }
}

/// Split a rendered message and number the parts when there is more than one.
fn message_parts(text: &str) -> Vec<String> {
    let chunks = split_message(text, MAX_MESSAGE_LENGTH);
    if chunks.len() <= 1 {
        return chunks;
    }
    let total = chunks.len();
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| format!("<b>Part {}/{}:</b>\n\n{}", i + 1, total, chunk))
        .collect()
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, events: &[ChangeEvent]) -> Result<(), NotifyError> {
        if events.is_empty() {
            return Ok(());
        }

        let mut total = 0;
        let mut failed = 0;
        for message in render_events(events, &self.offset) {
            for part in message_parts(&message.text) {
                total += 1;
                if let Err(e) = self.send_text(&part).await {
                    error!("Failed to send Telegram message: {}", e);
                    failed += 1;
                }
                tokio::time::sleep(MESSAGE_DELAY).await;
            }
            if let Some(photo) = &message.photo {
                total += 1;
                if let Err(e) = self.api.send_photo(&self.chat_id, photo).await {
                    error!("Failed to send cover image {}: {}", photo.url, e);
                    failed += 1;
                }
            }
        }

        debug!("Sent {} Telegram messages, {} failed", total - failed, failed);
        if failed > 0 {
            return Err(NotifyError::Partial { failed, total });
        }
        Ok(())
    }
}
