use crate::snapshot_store::TrackRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Playlist metadata field that can be reported as changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataField {
    Name,
    Description,
    Image,
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataField::Name => write!(f, "name"),
            MetadataField::Description => write!(f, "description"),
            MetadataField::Image => write!(f, "image"),
        }
    }
}

/// A semantic change detected for a tracked playlist.
///
/// Events are consumed by a notifier right after the pass and never stored.
/// For [`MetadataField::Image`] the values are the old and new cover base URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
    TracksAdded {
        playlist_id: String,
        playlist_name: String,
        tracks: Vec<TrackRecord>,
    },
    TracksRemoved {
        playlist_id: String,
        playlist_name: String,
        tracks: Vec<TrackRecord>,
    },
    MetadataChanged {
        playlist_id: String,
        playlist_name: String,
        field: MetadataField,
        old_value: Option<String>,
        new_value: Option<String>,
    },
}

impl ChangeEvent {
    pub fn playlist_id(&self) -> &str {
        match self {
            ChangeEvent::TracksAdded { playlist_id, .. }
            | ChangeEvent::TracksRemoved { playlist_id, .. }
            | ChangeEvent::MetadataChanged { playlist_id, .. } => playlist_id,
        }
    }

    pub fn playlist_name(&self) -> &str {
        match self {
            ChangeEvent::TracksAdded { playlist_name, .. }
            | ChangeEvent::TracksRemoved { playlist_name, .. }
            | ChangeEvent::MetadataChanged { playlist_name, .. } => playlist_name,
        }
    }

    /// Short label used for logging and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::TracksAdded { .. } => "tracks_added",
            ChangeEvent::TracksRemoved { .. } => "tracks_removed",
            ChangeEvent::MetadataChanged { .. } => "metadata_changed",
        }
    }
}
