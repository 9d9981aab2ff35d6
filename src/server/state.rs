use crate::tracker::TrackerService;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct ServerState {
    pub start_time: Instant,
    pub tracker: Arc<TrackerService>,
    /// Shared secret of the check trigger. The trigger is refused when unset.
    pub webhook_secret: Option<String>,
    /// Cancelled on shutdown; passes started over HTTP observe it.
    pub shutdown_token: CancellationToken,
}

impl ServerState {
    pub fn new(
        tracker: Arc<TrackerService>,
        webhook_secret: Option<String>,
        shutdown_token: CancellationToken,
    ) -> Self {
        Self {
            start_time: Instant::now(),
            tracker,
            webhook_secret,
            shutdown_token,
        }
    }
}
