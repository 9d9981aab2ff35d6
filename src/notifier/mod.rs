//! Delivery of change events to an outside channel.
//!
//! Delivery failures never roll back stored snapshots; the tracker has
//! already persisted the new state by the time a notifier runs.

pub mod format;
mod telegram;

pub use telegram::{TelegramApi, TelegramConfig, TelegramNotifier};

use crate::events::ChangeEvent;
use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {description}")]
    Api { status: u16, description: String },

    #[error("{failed} of {total} messages could not be delivered")]
    Partial { failed: usize, total: usize },
}

/// Consumer of the events produced by a pass.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver events in the order given. An empty slice is a no-op.
    async fn notify(&self, events: &[ChangeEvent]) -> Result<(), NotifyError>;
}

/// Writes events to the log. Used when no chat is configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, events: &[ChangeEvent]) -> Result<(), NotifyError> {
        for event in events {
            match event {
                ChangeEvent::TracksAdded {
                    playlist_name,
                    tracks,
                    ..
                } => info!("{} tracks added to {}", tracks.len(), playlist_name),
                ChangeEvent::TracksRemoved {
                    playlist_name,
                    tracks,
                    ..
                } => info!("{} tracks removed from {}", tracks.len(), playlist_name),
                ChangeEvent::MetadataChanged {
                    playlist_name,
                    field,
                    old_value,
                    new_value,
                    ..
                } => info!(
                    "{} of {} changed: {:?} -> {:?}",
                    field, playlist_name, old_value, new_value
                ),
            }
        }
        Ok(())
    }
}
