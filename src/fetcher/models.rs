//! Provider-neutral shapes handed to the reconciliation core.

use crate::snapshot_store::TrackRecord;

/// Playlist metadata as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMetadata {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Cover image URL, possibly carrying cache-busting query parameters.
    pub image_url: Option<String>,
    /// Opaque provider value that changes whenever the playlist content changes.
    pub snapshot_token: String,
}

/// Full state of a playlist from a single fetch.
///
/// `tracks` is in provider order and only contains tracks with a resolvable id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPlaylist {
    pub metadata: RawMetadata,
    pub tracks: Vec<TrackRecord>,
}
