//! SnapshotStore trait definition.

use super::models::{MetadataRecord, PlaylistSnapshot};
use anyhow::Result;

/// Key-value persistence of per-playlist snapshots.
///
/// Every write replaces the whole record. Unreadable records are treated as
/// missing: the tracked state is rebuilt from the next fetch.
pub trait SnapshotStore: Send + Sync {
    /// Load the track snapshot of a playlist, empty if none is stored.
    fn load_track_snapshot(&self, playlist_id: &str) -> Result<PlaylistSnapshot>;

    /// Replace the track snapshot of a playlist.
    fn save_track_snapshot(&self, playlist_id: &str, snapshot: &PlaylistSnapshot) -> Result<()>;

    /// Load the metadata record of a playlist.
    fn load_metadata(&self, playlist_id: &str) -> Result<Option<MetadataRecord>>;

    /// Replace the metadata record of a playlist.
    fn save_metadata(&self, playlist_id: &str, record: &MetadataRecord) -> Result<()>;

    /// Replace both records of a playlist in a single write.
    fn save_entity(
        &self,
        playlist_id: &str,
        metadata: &MetadataRecord,
        snapshot: &PlaylistSnapshot,
    ) -> Result<()>;

    /// Drop everything stored for a playlist.
    fn forget_entity(&self, playlist_id: &str) -> Result<()>;
}
