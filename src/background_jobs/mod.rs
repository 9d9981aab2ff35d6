//! Background job scheduling and execution system.
//!
//! Jobs run on fixed intervals or on startup, each in its own task, and are
//! cancelled through a shared token when the process shuts down.

mod context;
mod job;
pub mod jobs;
mod scheduler;

pub use context::JobContext;
pub use job::{BackgroundJob, HookEvent, JobError, JobSchedule, ShutdownBehavior};
pub use scheduler::JobScheduler;
