use crate::snapshot_store::{PlaylistSnapshot, TrackRecord};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Outcome of comparing a stored track snapshot with a fetched track list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackReconciliation {
    /// Tracks no longer in the playlist, in the order they were stored.
    pub removed: Vec<TrackRecord>,
    /// Tracks new to the playlist, in fetch order.
    pub added: Vec<TrackRecord>,
    /// Snapshot to persist for the next pass.
    pub snapshot: PlaylistSnapshot,
}

impl TrackReconciliation {
    pub fn has_changes(&self) -> bool {
        !self.removed.is_empty() || !self.added.is_empty()
    }
}

/// Compute added and removed tracks and rebuild the detail cache.
///
/// The returned snapshot holds the fetched ids in fetch order and exactly one
/// detail entry per id. A repeated id in `fetched` keeps its first position.
pub fn reconcile_tracks(stored: &PlaylistSnapshot, fetched: Vec<TrackRecord>) -> TrackReconciliation {
    let mut new_ids: Vec<String> = Vec::with_capacity(fetched.len());
    let mut new_id_set: HashSet<&str> = HashSet::with_capacity(fetched.len());
    for track in &fetched {
        if new_id_set.insert(track.id.as_str()) {
            new_ids.push(track.id.clone());
        } else {
            debug!("Ignoring repeated track id {} in fetch result", track.id);
        }
    }

    let stored_id_set: HashSet<&str> = stored.track_ids.iter().map(String::as_str).collect();

    let removed: Vec<TrackRecord> = stored
        .track_ids
        .iter()
        .filter(|id| !new_id_set.contains(id.as_str()))
        .map(|id| match stored.track_details.get(id) {
            Some(record) => record.clone(),
            None => {
                warn!("No cached details for removed track {}", id);
                TrackRecord::unknown(id)
            }
        })
        .collect();

    let mut added: Vec<TrackRecord> = Vec::new();
    let mut seen_added: HashSet<&str> = HashSet::new();
    for track in &fetched {
        if !stored_id_set.contains(track.id.as_str()) && seen_added.insert(track.id.as_str()) {
            added.push(track.clone());
        }
    }

    let mut track_details: HashMap<String, TrackRecord> = HashMap::with_capacity(new_ids.len());
    for id in &new_ids {
        if let Some(record) = stored.track_details.get(id) {
            track_details.insert(id.clone(), record.clone());
        }
    }
    let mut seen_fetched: HashSet<String> = HashSet::with_capacity(new_ids.len());
    for track in fetched {
        if seen_fetched.insert(track.id.clone()) {
            track_details.insert(track.id.clone(), track);
        }
    }

    TrackReconciliation {
        removed,
        added,
        snapshot: PlaylistSnapshot {
            track_ids: new_ids,
            track_details,
        },
    }
}
