//! Per-pass orchestration of metadata detection and track reconciliation.

use crate::events::ChangeEvent;
use crate::fetcher::{FetchError, PlaylistFetcher};
use crate::metadata::{MetadataChangeDetector, MetadataDetection};
use crate::registry::TrackedPlaylist;
use crate::server::metrics;
use crate::snapshot_store::SnapshotStore;
use crate::tracks::{reconcile_tracks, TrackReconciliation};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Why a playlist was skipped in a pass. Its stored state is left untouched.
#[derive(Debug, Error)]
pub enum EntityError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Snapshot store error: {0}")]
    Store(#[from] anyhow::Error),

    #[error("Fetched an empty track list for a playlist with {stored_tracks} stored tracks")]
    SuspiciousEmptyFetch { stored_tracks: usize },
}

/// Tracker behaviour knobs.
#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub image_debounce: Duration,
    /// Treat an empty fetch of a non-empty playlist as a failed fetch.
    pub suppress_empty_fetch: bool,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            image_debounce: crate::metadata::DEFAULT_IMAGE_DEBOUNCE,
            suppress_empty_fetch: false,
        }
    }
}

/// What happened to a single playlist during a pass.
#[derive(Debug)]
pub struct EntityOutcome {
    pub playlist_id: String,
    /// Current name as reported by the provider.
    pub current_name: String,
    pub metadata: MetadataDetection,
    pub tracks: TrackReconciliation,
    pub events: Vec<ChangeEvent>,
}

/// Summary of a full pass over the tracked playlists.
#[derive(Debug, Default)]
pub struct PassReport {
    /// Events of all playlists, in registry order.
    pub events: Vec<ChangeEvent>,
    pub entities_processed: usize,
    pub any_change_detected: bool,
    /// Playlists skipped because of an error.
    pub failed: Vec<String>,
    /// Provider names of processed playlists, as `(id, name)`.
    pub current_names: Vec<(String, String)>,
    /// The pass stopped early because cancellation was requested.
    pub cancelled: bool,
}

/// Turns fetched playlist state into change events and updated snapshots.
pub struct PlaylistTracker {
    fetcher: Arc<dyn PlaylistFetcher>,
    store: Arc<dyn SnapshotStore>,
    detector: MetadataChangeDetector,
    suppress_empty_fetch: bool,
}

impl PlaylistTracker {
    pub fn new(
        fetcher: Arc<dyn PlaylistFetcher>,
        store: Arc<dyn SnapshotStore>,
        settings: TrackerSettings,
    ) -> Self {
        Self {
            fetcher,
            store,
            detector: MetadataChangeDetector::new(settings.image_debounce),
            suppress_empty_fetch: settings.suppress_empty_fetch,
        }
    }

    /// Process every playlist in order, one at a time.
    ///
    /// A failing playlist is skipped without touching its stored state.
    /// Cancellation is honoured between playlists only.
    pub async fn run_pass(
        &self,
        playlists: &[TrackedPlaylist],
        cancellation_token: &CancellationToken,
    ) -> PassReport {
        let started = Instant::now();
        let mut report = PassReport::default();

        info!("Checking {} playlists for changes", playlists.len());

        for playlist in playlists {
            if cancellation_token.is_cancelled() {
                warn!("Playlist check cancelled before {}", playlist.id);
                report.cancelled = true;
                break;
            }

            match self.process_playlist(playlist, Utc::now()).await {
                Ok(outcome) => {
                    report.entities_processed += 1;
                    report.any_change_detected |= !outcome.events.is_empty();
                    report
                        .current_names
                        .push((outcome.playlist_id, outcome.current_name));
                    report.events.extend(outcome.events);
                }
                Err(e) => {
                    error!("Skipping playlist {}: {}", playlist.id, e);
                    if matches!(e, EntityError::Fetch(_)) {
                        metrics::record_fetch_failure();
                    }
                    report.failed.push(playlist.id.clone());
                }
            }
        }

        for event in &report.events {
            metrics::record_event(event.kind());
        }
        metrics::record_pass(started.elapsed(), report.failed.len());

        info!(
            "Finished checking playlists: {} processed, {} failed, {} events",
            report.entities_processed,
            report.failed.len(),
            report.events.len()
        );
        report
    }

    /// Diff one playlist against its stored state and persist the new state.
    pub async fn process_playlist(
        &self,
        playlist: &TrackedPlaylist,
        now: DateTime<Utc>,
    ) -> Result<EntityOutcome, EntityError> {
        let fetched = self.fetcher.fetch_playlist(&playlist.id).await?;

        let stored_metadata = self.store.load_metadata(&playlist.id)?;
        let stored_tracks = self.store.load_track_snapshot(&playlist.id)?;

        if self.suppress_empty_fetch && fetched.tracks.is_empty() && !stored_tracks.is_empty() {
            return Err(EntityError::SuspiciousEmptyFetch {
                stored_tracks: stored_tracks.track_ids.len(),
            });
        }

        let metadata = self
            .detector
            .detect(stored_metadata.as_ref(), &fetched.metadata, now);
        if metadata.image_change_suppressed {
            metrics::record_image_change_suppressed();
        }

        let tracks = reconcile_tracks(&stored_tracks, fetched.tracks);

        let playlist_name = if fetched.metadata.name.is_empty() {
            playlist.display_name().to_string()
        } else {
            fetched.metadata.name.clone()
        };

        let mut events = Vec::with_capacity(metadata.changes.len() + 2);
        for change in &metadata.changes {
            events.push(ChangeEvent::MetadataChanged {
                playlist_id: playlist.id.clone(),
                playlist_name: playlist_name.clone(),
                field: change.field,
                old_value: change.old_value.clone(),
                new_value: change.new_value.clone(),
            });
        }
        if !tracks.removed.is_empty() {
            for track in &tracks.removed {
                info!("Removed: {} (ID: {})", track.name, track.id);
            }
            events.push(ChangeEvent::TracksRemoved {
                playlist_id: playlist.id.clone(),
                playlist_name: playlist_name.clone(),
                tracks: tracks.removed.clone(),
            });
        }
        if !tracks.added.is_empty() {
            for track in &tracks.added {
                info!("Added: {} (ID: {})", track.name, track.id);
            }
            events.push(ChangeEvent::TracksAdded {
                playlist_id: playlist.id.clone(),
                playlist_name: playlist_name.clone(),
                tracks: tracks.added.clone(),
            });
        }

        self.store
            .save_entity(&playlist.id, &metadata.record, &tracks.snapshot)?;
        debug!(
            "Stored snapshot for {} with {} tracks",
            playlist.id,
            tracks.snapshot.track_ids.len()
        );

        Ok(EntityOutcome {
            playlist_id: playlist.id.clone(),
            current_name: fetched.metadata.name,
            metadata,
            tracks,
            events,
        })
    }
}
