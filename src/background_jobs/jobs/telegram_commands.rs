//! Telegram chat command poller.
//!
//! Starts with the process and long-polls `getUpdates` until shutdown,
//! handing every update to the command handler in order.

use crate::background_jobs::{
    context::JobContext,
    job::{BackgroundJob, HookEvent, JobError, JobSchedule, ShutdownBehavior},
};
use crate::bot::{BotApi, CommandHandler};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Server-side wait of a single `getUpdates` call.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause after a failed poll.
const RETRY_DELAY: Duration = Duration::from_secs(5);

pub struct TelegramCommandsJob {
    api: Arc<dyn BotApi>,
    handler: CommandHandler,
    poll_timeout: Duration,
}

impl TelegramCommandsJob {
    pub fn new(api: Arc<dyn BotApi>, handler: CommandHandler, poll_timeout: Duration) -> Self {
        Self {
            api,
            handler,
            poll_timeout,
        }
    }
}

#[async_trait]
impl BackgroundJob for TelegramCommandsJob {
    fn id(&self) -> &'static str {
        "telegram_commands"
    }

    fn name(&self) -> &'static str {
        "Telegram Commands"
    }

    fn description(&self) -> &'static str {
        "Answer /check, /set, /delete and /list in the notification chat"
    }

    fn schedule(&self) -> JobSchedule {
        JobSchedule::Hook(HookEvent::OnStartup)
    }

    fn shutdown_behavior(&self) -> ShutdownBehavior {
        ShutdownBehavior::Cancellable
    }

    async fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        let mut offset = None;
        loop {
            let result = tokio::select! {
                biased;
                _ = ctx.cancellation_token.cancelled() => return Err(JobError::Cancelled),
                result = self.api.get_updates(offset, self.poll_timeout) => result,
            };

            match result {
                Ok(updates) => {
                    debug!("Received {} Telegram updates", updates.len());
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        self.handler
                            .handle_update(&update, &ctx.cancellation_token)
                            .await;
                    }
                }
                Err(e) => {
                    warn!("Polling Telegram updates failed: {}", e);
                    tokio::select! {
                        _ = ctx.cancellation_token.cancelled() => return Err(JobError::Cancelled),
                        _ = tokio::time::sleep(RETRY_DELAY) => {}
                    }
                }
            }
        }
    }
}
