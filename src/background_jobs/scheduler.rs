use super::context::JobContext;
use super::job::{BackgroundJob, HookEvent, JobError, ShutdownBehavior};
use crate::server::metrics;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How long cancellable jobs get to wind down after shutdown is requested.
const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// Sleep used when no job has an interval schedule.
const IDLE_SLEEP: Duration = Duration::from_secs(3600);

struct RunningJob {
    handle: JoinHandle<()>,
    shutdown_behavior: ShutdownBehavior,
}

/// Runs registered jobs on their schedules until shutdown.
pub struct JobScheduler {
    jobs: HashMap<&'static str, Arc<dyn BackgroundJob>>,
    next_runs: HashMap<&'static str, Instant>,
    running: HashMap<&'static str, RunningJob>,
    shutdown_token: CancellationToken,
}

impl JobScheduler {
    pub fn new(shutdown_token: CancellationToken) -> Self {
        Self {
            jobs: HashMap::new(),
            next_runs: HashMap::new(),
            running: HashMap::new(),
            shutdown_token,
        }
    }

    pub fn register_job(&mut self, job: Arc<dyn BackgroundJob>) {
        let id = job.id();
        if let Some(interval) = job.schedule().interval() {
            self.next_runs.insert(id, Instant::now() + interval);
        }
        info!("Registered background job {} ({})", id, job.name());
        self.jobs.insert(id, job);
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Run until the shutdown token is cancelled.
    pub async fn run(&mut self) {
        info!("Starting job scheduler with {} registered jobs", self.job_count());

        self.trigger_jobs_for_hook(HookEvent::OnStartup);

        loop {
            self.cleanup_completed_jobs();

            let sleep_duration = self.time_until_next_scheduled_job();
            debug!(
                "Scheduler sleeping for {:?} until next scheduled job",
                sleep_duration
            );

            tokio::select! {
                _ = tokio::time::sleep(sleep_duration) => {
                    self.run_due_jobs();
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Scheduler received shutdown signal");
                    self.shutdown().await;
                    break;
                }
            }
        }

        info!("Job scheduler stopped");
    }

    fn time_until_next_scheduled_job(&self) -> Duration {
        let now = Instant::now();
        self.next_runs
            .values()
            .min()
            .map(|next| next.saturating_duration_since(now))
            .unwrap_or(IDLE_SLEEP)
    }

    fn trigger_jobs_for_hook(&mut self, event: HookEvent) {
        let ids: Vec<&'static str> = self
            .jobs
            .values()
            .filter(|job| job.schedule().has_hook(event))
            .map(|job| job.id())
            .collect();
        for id in ids {
            debug!("Triggering job {} for hook {}", id, event);
            if let Err(e) = self.spawn_job(id) {
                warn!("Job {} not started for hook {}: {}", id, event, e);
            }
        }
    }

    fn run_due_jobs(&mut self) {
        let now = Instant::now();
        let due: Vec<&'static str> = self
            .next_runs
            .iter()
            .filter(|(_, next)| **next <= now)
            .map(|(id, _)| *id)
            .collect();

        for id in due {
            if let Some(interval) = self.jobs.get(id).and_then(|job| job.schedule().interval()) {
                self.next_runs.insert(id, now + interval);
            }
            if let Err(e) = self.spawn_job(id) {
                warn!("Skipping scheduled run of {}: {}", id, e);
            }
        }
    }

    fn spawn_job(&mut self, job_id: &'static str) -> Result<(), JobError> {
        if self.running.contains_key(job_id) {
            return Err(JobError::AlreadyRunning);
        }
        let Some(job) = self.jobs.get(job_id).cloned() else {
            return Ok(());
        };

        let ctx = JobContext::new(self.shutdown_token.child_token());
        let shutdown_behavior = job.shutdown_behavior();

        let handle = tokio::spawn(async move {
            let start_time = std::time::Instant::now();
            let result = job.execute(&ctx).await;
            let elapsed = start_time.elapsed();

            let status_label = match result {
                Ok(()) => {
                    info!("Job {} completed successfully in {:?}", job_id, elapsed);
                    "success"
                }
                Err(JobError::Cancelled) => {
                    info!("Job {} was cancelled after {:?}", job_id, elapsed);
                    "cancelled"
                }
                Err(e) => {
                    error!("Job {} failed after {:?}: {}", job_id, elapsed, e);
                    "failed"
                }
            };
            metrics::record_background_job_execution(job_id, status_label, elapsed);
        });

        self.running.insert(
            job_id,
            RunningJob {
                handle,
                shutdown_behavior,
            },
        );
        Ok(())
    }

    fn cleanup_completed_jobs(&mut self) {
        self.running.retain(|_, job| !job.handle.is_finished());
    }

    /// Wait for running jobs according to their shutdown behavior.
    async fn shutdown(&mut self) {
        for (job_id, job) in self.running.drain() {
            match job.shutdown_behavior {
                ShutdownBehavior::WaitForCompletion => {
                    info!("Waiting for job {} to complete", job_id);
                    if let Err(e) = job.handle.await {
                        error!("Job {} panicked during shutdown: {}", job_id, e);
                    }
                }
                ShutdownBehavior::Cancellable => {
                    let abort = job.handle.abort_handle();
                    if tokio::time::timeout(SHUTDOWN_GRACE_PERIOD, job.handle)
                        .await
                        .is_err()
                    {
                        warn!("Job {} did not stop in time, aborting", job_id);
                        abort.abort();
                    }
                }
            }
        }
    }
}
