use super::models::Update;
use super::BotApi;
use crate::notifier::format::escape_html;
use crate::server::metrics;
use crate::tracker::TrackerService;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Check,
    /// Start tracking a playlist.
    Set(Option<String>),
    /// Stop tracking a playlist.
    Delete(Option<String>),
    List,
}

impl BotCommand {
    /// Parse `/name[@bot] [argument]`. Anything else is not a command.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split_whitespace();
        let head = parts.next()?.strip_prefix('/')?;
        let name = head.split_once('@').map_or(head, |(name, _)| name);
        let argument = parts.next().map(str::to_string);
        match name {
            "check" => Some(BotCommand::Check),
            "set" => Some(BotCommand::Set(argument)),
            "delete" => Some(BotCommand::Delete(argument)),
            "list" => Some(BotCommand::List),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BotCommand::Check => "check",
            BotCommand::Set(_) => "set",
            BotCommand::Delete(_) => "delete",
            BotCommand::List => "list",
        }
    }
}

/// Runs chat commands against the tracker and replies in the chat.
pub struct CommandHandler {
    tracker: Arc<TrackerService>,
    api: Arc<dyn BotApi>,
    allowed_chat_id: String,
}

impl CommandHandler {
    pub fn new(tracker: Arc<TrackerService>, api: Arc<dyn BotApi>, allowed_chat_id: String) -> Self {
        Self {
            tracker,
            api,
            allowed_chat_id,
        }
    }

    /// Handle one update. Messages that are not commands are ignored.
    pub async fn handle_update(&self, update: &Update, cancellation_token: &CancellationToken) {
        let Some(message) = &update.message else {
            return;
        };
        let Some(command) = message.text.as_deref().and_then(BotCommand::parse) else {
            return;
        };
        let chat_id = message.chat.id;

        if chat_id.to_string() != self.allowed_chat_id {
            warn!("Rejected /{} from chat {}", command.name(), chat_id);
            metrics::record_bot_command(command.name(), "unauthorized");
            self.reply(chat_id, "❌ Unauthorized.").await;
            return;
        }

        info!("Received /{} from the operator chat", command.name());
        metrics::record_bot_command(command.name(), "accepted");
        match command {
            BotCommand::Check => self.check(chat_id, cancellation_token).await,
            BotCommand::Set(playlist_id) => self.set(chat_id, playlist_id).await,
            BotCommand::Delete(playlist_id) => self.delete(chat_id, playlist_id).await,
            BotCommand::List => self.list(chat_id).await,
        }
    }

    async fn reply(&self, chat_id: i64, html: &str) {
        if let Err(e) = self.api.send_reply(chat_id, html).await {
            warn!("Failed to reply in chat {}: {}", chat_id, e);
        }
    }

    async fn check(&self, chat_id: i64, cancellation_token: &CancellationToken) {
        self.reply(chat_id, "🔍 Checking for playlist changes...").await;
        let reply = match self.tracker.spawn_check(cancellation_token).await {
            Ok(summary) if summary.failed.is_empty() => {
                "✅ Playlist check completed successfully.".to_string()
            }
            Ok(summary) => format!(
                "⚠️ Playlist check finished, {} of {} playlists could not be checked.",
                summary.failed.len(),
                summary.failed.len() + summary.entities_processed
            ),
            Err(e) => {
                error!("Playlist check from chat failed: {:#}", e);
                "⚠️ Error checking playlists.".to_string()
            }
        };
        self.reply(chat_id, &reply).await;
    }

    async fn set(&self, chat_id: i64, playlist_id: Option<String>) {
        let Some(playlist_id) = playlist_id else {
            self.reply(
                chat_id,
                "⚠️ Please provide a playlist ID. Example: /set &lt;playlist_id&gt;",
            )
            .await;
            return;
        };
        let id = escape_html(&playlist_id);
        let reply = match self.tracker.add_playlist(&playlist_id).await {
            Ok(true) => format!("✅ Playlist <code>{}</code> added successfully.", id),
            Ok(false) => format!("ℹ️ Playlist <code>{}</code> is already in the list.", id),
            Err(e) => {
                error!("Failed to add playlist {}: {:#}", playlist_id, e);
                format!("❌ Error: {}", escape_html(&e.to_string()))
            }
        };
        self.reply(chat_id, &reply).await;
    }

    async fn delete(&self, chat_id: i64, playlist_id: Option<String>) {
        let Some(playlist_id) = playlist_id else {
            self.reply(
                chat_id,
                "⚠️ Please provide a playlist ID. Example: /delete &lt;playlist_id&gt;",
            )
            .await;
            return;
        };
        let id = escape_html(&playlist_id);
        let reply = match self.tracker.remove_playlist(&playlist_id).await {
            Ok(true) => format!("✅ Playlist <code>{}</code> removed successfully.", id),
            Ok(false) => format!("ℹ️ Playlist <code>{}</code> is not in the list.", id),
            Err(e) => {
                error!("Failed to remove playlist {}: {:#}", playlist_id, e);
                format!("❌ Error: {}", escape_html(&e.to_string()))
            }
        };
        self.reply(chat_id, &reply).await;
    }

    async fn list(&self, chat_id: i64) {
        let playlists = match self.tracker.list_playlists() {
            Ok(playlists) => playlists,
            Err(e) => {
                error!("Failed to list playlists: {:#}", e);
                self.reply(chat_id, &format!("❌ Error: {}", escape_html(&e.to_string())))
                    .await;
                return;
            }
        };
        if playlists.is_empty() {
            self.reply(chat_id, "ℹ️ No playlists are currently being tracked.")
                .await;
            return;
        }

        let entries: Vec<String> = playlists
            .iter()
            .map(|p| {
                format!(
                    "- <b>{}</b>\n  <code>{}</code>",
                    escape_html(p.name.as_deref().unwrap_or("Unknown Playlist")),
                    escape_html(&p.id)
                )
            })
            .collect();
        let reply = format!("📌 <b>Tracked Playlists:</b>\n\n{}", entries.join("\n\n"));
        self.reply(chat_id, &reply).await;
    }
}
