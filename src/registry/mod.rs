//! Registry of tracked playlists.

mod sqlite_registry;

pub use sqlite_registry::SqlitePlaylistRegistry;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// A playlist the operator asked to track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedPlaylist {
    pub id: String,
    /// Last known display name, if any was seen yet.
    pub name: Option<String>,
}

impl TrackedPlaylist {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    pub fn with_name(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
        }
    }

    /// Name to show in notifications, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Ordered list of tracked playlists.
pub trait PlaylistRegistry: Send + Sync {
    /// All tracked playlists, in the order they were added.
    fn list(&self) -> Result<Vec<TrackedPlaylist>>;

    /// Start tracking a playlist. Returns false if it was already tracked.
    fn add(&self, playlist_id: &str, name: Option<&str>) -> Result<bool>;

    /// Stop tracking a playlist. Returns false if it was not tracked.
    fn remove(&self, playlist_id: &str) -> Result<bool>;

    /// Update the display name of a tracked playlist.
    fn set_name(&self, playlist_id: &str, name: &str) -> Result<()>;
}
