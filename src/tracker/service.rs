use super::assembler::{PlaylistTracker, TrackerSettings};
use crate::fetcher::PlaylistFetcher;
use crate::notifier::Notifier;
use crate::registry::{PlaylistRegistry, TrackedPlaylist};
use crate::server::metrics;
use crate::snapshot_store::SnapshotStore;
use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Outcome of a triggered check, as reported to callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    pub entities_processed: usize,
    pub any_change_detected: bool,
    pub events: usize,
    pub failed: Vec<String>,
    pub cancelled: bool,
    pub notification_failed: bool,
}

/// Entry point used by the scheduler, the HTTP trigger and the CLI.
///
/// Passes never overlap: a trigger that arrives while a pass is running waits
/// for it to finish. Registry changes wait too, so a playlist is never
/// forgotten while its snapshot is being written.
pub struct TrackerService {
    tracker: PlaylistTracker,
    store: Arc<dyn SnapshotStore>,
    registry: Arc<dyn PlaylistRegistry>,
    notifier: Arc<dyn Notifier>,
    pass_lock: Mutex<()>,
}

impl TrackerService {
    pub fn new(
        fetcher: Arc<dyn PlaylistFetcher>,
        store: Arc<dyn SnapshotStore>,
        registry: Arc<dyn PlaylistRegistry>,
        notifier: Arc<dyn Notifier>,
        settings: TrackerSettings,
    ) -> Self {
        Self {
            tracker: PlaylistTracker::new(fetcher, store.clone(), settings),
            store,
            registry,
            notifier,
            pass_lock: Mutex::new(()),
        }
    }

    /// Run one pass over every tracked playlist and deliver its events.
    pub async fn run_check(&self, cancellation_token: &CancellationToken) -> Result<PassSummary> {
        let _guard = self.pass_lock.lock().await;

        let playlists = self.registry.list()?;
        metrics::set_tracked_playlists(playlists.len());
        if playlists.is_empty() {
            info!("No playlists are tracked, nothing to check");
            return Ok(PassSummary::default());
        }

        let report = self.tracker.run_pass(&playlists, cancellation_token).await;

        let mut notification_failed = false;
        if !report.events.is_empty() {
            if let Err(e) = self.notifier.notify(&report.events).await {
                warn!("Failed to deliver change notifications: {}", e);
                metrics::record_notify_failure();
                notification_failed = true;
            }
        }

        self.refresh_names(&playlists, &report.current_names);

        Ok(PassSummary {
            entities_processed: report.entities_processed,
            any_change_detected: report.any_change_detected,
            events: report.events.len(),
            failed: report.failed,
            cancelled: report.cancelled,
            notification_failed,
        })
    }

    /// Run [`run_check`](Self::run_check) on its own task and wait for it.
    ///
    /// Dropping the returned future leaves the pass running, so playlists
    /// whose new state was saved still get their events delivered. Callers
    /// that may go away mid-pass (HTTP requests, cancellable jobs) use this.
    pub async fn spawn_check(self: &Arc<Self>, cancellation_token: &CancellationToken) -> Result<PassSummary> {
        let service = self.clone();
        let token = cancellation_token.clone();
        tokio::spawn(async move { service.run_check(&token).await })
            .await
            .context("Playlist check task failed")?
    }

    /// Wait for the running pass, if any, to finish.
    pub async fn wait_until_idle(&self) {
        let _guard = self.pass_lock.lock().await;
    }

    /// Store the provider names so that later failures can still be reported by name.
    fn refresh_names(&self, playlists: &[TrackedPlaylist], current_names: &[(String, String)]) {
        for (id, name) in current_names {
            if name.is_empty() {
                continue;
            }
            let known = playlists
                .iter()
                .find(|p| &p.id == id)
                .and_then(|p| p.name.as_deref());
            if known == Some(name.as_str()) {
                continue;
            }
            if let Err(e) = self.registry.set_name(id, name) {
                warn!("Failed to update name of playlist {}: {}", id, e);
            }
        }
    }

    pub fn list_playlists(&self) -> Result<Vec<TrackedPlaylist>> {
        self.registry.list()
    }

    /// Start tracking a playlist. Its first pass establishes the baseline.
    pub async fn add_playlist(&self, playlist_id: &str) -> Result<bool> {
        let _guard = self.pass_lock.lock().await;
        self.registry.add(playlist_id, None)
    }

    /// Stop tracking a playlist and drop everything stored for it.
    pub async fn remove_playlist(&self, playlist_id: &str) -> Result<bool> {
        let _guard = self.pass_lock.lock().await;
        let removed = self.registry.remove(playlist_id)?;
        if removed {
            self.store.forget_entity(playlist_id)?;
            debug!("Forgot stored state of playlist {}", playlist_id);
        }
        Ok(removed)
    }
}
