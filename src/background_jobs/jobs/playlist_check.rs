//! Periodic playlist check.
//!
//! Runs one reconciliation pass over all tracked playlists and delivers the
//! resulting events. The first run happens at startup.

use crate::background_jobs::{
    context::JobContext,
    job::{BackgroundJob, HookEvent, JobError, JobSchedule, ShutdownBehavior},
};
use crate::tracker::TrackerService;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct PlaylistCheckJob {
    tracker: Arc<TrackerService>,
    interval: Duration,
}

impl PlaylistCheckJob {
    pub fn new(tracker: Arc<TrackerService>, interval: Duration) -> Self {
        Self { tracker, interval }
    }
}

#[async_trait]
impl BackgroundJob for PlaylistCheckJob {
    fn id(&self) -> &'static str {
        "playlist_check"
    }

    fn name(&self) -> &'static str {
        "Playlist Check"
    }

    fn description(&self) -> &'static str {
        "Fetch tracked playlists, report their changes and store new snapshots"
    }

    fn schedule(&self) -> JobSchedule {
        JobSchedule::Combined {
            interval: Some(self.interval),
            hooks: vec![HookEvent::OnStartup],
        }
    }

    fn shutdown_behavior(&self) -> ShutdownBehavior {
        // Passes stop between playlists once cancelled
        ShutdownBehavior::Cancellable
    }

    async fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        let summary = self
            .tracker
            .spawn_check(&ctx.cancellation_token)
            .await
            .map_err(|e| JobError::ExecutionFailed(format!("{:#}", e)))?;

        if summary.cancelled {
            return Err(JobError::Cancelled);
        }

        info!(
            "Playlist check done: {} processed, {} failed, changes detected: {}",
            summary.entities_processed,
            summary.failed.len(),
            summary.any_change_detected
        );
        Ok(())
    }
}
