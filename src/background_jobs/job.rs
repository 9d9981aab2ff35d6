use super::context::JobContext;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Schedule for when a job should run.
#[derive(Debug, Clone)]
pub enum JobSchedule {
    /// Run at fixed intervals
    Interval(Duration),
    /// Run only in response to hooks
    Hook(HookEvent),
    /// Combination of interval and hook-triggered
    Combined {
        interval: Option<Duration>,
        hooks: Vec<HookEvent>,
    },
}

impl JobSchedule {
    pub fn interval(&self) -> Option<Duration> {
        match self {
            JobSchedule::Interval(interval) => Some(*interval),
            JobSchedule::Hook(_) => None,
            JobSchedule::Combined { interval, .. } => *interval,
        }
    }

    pub fn has_hook(&self, event: HookEvent) -> bool {
        match self {
            JobSchedule::Interval(_) => false,
            JobSchedule::Hook(hook) => *hook == event,
            JobSchedule::Combined { hooks, .. } => hooks.contains(&event),
        }
    }
}

/// Events that can trigger hook-based jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    OnStartup,
}

impl std::fmt::Display for HookEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookEvent::OnStartup => write!(f, "OnStartup"),
        }
    }
}

/// How a job should be handled during shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownBehavior {
    /// Job observes cancellation and is given a grace period to stop
    #[default]
    Cancellable,
    /// Wait for job to complete before shutdown
    WaitForCompletion,
}

/// Errors that can occur during job execution.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job is already running")]
    AlreadyRunning,

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Job was cancelled")]
    Cancelled,
}

/// Trait for background jobs.
#[async_trait]
pub trait BackgroundJob: Send + Sync {
    /// Unique identifier for this job.
    fn id(&self) -> &'static str;

    /// Human-readable name for this job.
    fn name(&self) -> &'static str;

    /// Description of what this job does.
    fn description(&self) -> &'static str;

    /// When this job should be scheduled to run.
    fn schedule(&self) -> JobSchedule;

    /// How this job should be handled during shutdown.
    fn shutdown_behavior(&self) -> ShutdownBehavior {
        ShutdownBehavior::Cancellable
    }

    /// Execute the job.
    ///
    /// Long-running implementations should check `ctx.is_cancelled()` and
    /// return early with `JobError::Cancelled` if true.
    async fn execute(&self, ctx: &JobContext) -> Result<(), JobError>;
}
