//! Persisted snapshot models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Name given to a removed track whose details were never cached.
pub const UNKNOWN_TRACK_NAME: &str = "Unknown";

/// Artist given to a removed track whose details were never cached.
pub const UNKNOWN_ARTIST_NAME: &str = "Unknown Artist";

/// A single track as last seen in a playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub id: String,
    pub name: String,
    pub artist: String,
    #[serde(default)]
    pub added_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub url: Option<String>,
}

impl TrackRecord {
    /// Placeholder for a track id that has no cached details.
    pub fn unknown(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: UNKNOWN_TRACK_NAME.to_string(),
            artist: UNKNOWN_ARTIST_NAME.to_string(),
            added_at: None,
            url: None,
        }
    }
}

/// Stored track state of a playlist.
///
/// `track_ids` keeps the fetch order; `track_details` holds exactly one entry
/// per id in `track_ids`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSnapshot {
    pub track_ids: Vec<String>,
    #[serde(default)]
    pub track_details: HashMap<String, TrackRecord>,
}

impl PlaylistSnapshot {
    pub fn is_empty(&self) -> bool {
        self.track_ids.is_empty()
    }

    /// Whether the detail cache covers exactly the ids in `track_ids`.
    pub fn is_consistent(&self) -> bool {
        self.track_details.len() == self.track_ids.len()
            && self
                .track_ids
                .iter()
                .all(|id| self.track_details.contains_key(id))
    }
}

/// Stored metadata of a playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Cover image URL with the query string removed.
    pub image_base_url: Option<String>,
    /// Stable identifier of the cover image derived from `image_base_url`.
    pub image_content_id: Option<String>,
    pub image_last_checked_at: DateTime<Utc>,
    pub snapshot_token: String,
}
