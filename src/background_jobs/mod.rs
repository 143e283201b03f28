//! Periodic and event-triggered maintenance of the live snapshot.
//!
//! Jobs are synchronous and run on the blocking pool. The scheduler decides
//! when they run: on an interval, when a hook event arrives, or on demand
//! through a [`SchedulerHandle`].

mod context;
mod handle;
mod job;
pub mod jobs;
mod scheduler;

pub use context::JobContext;
pub use handle::{JobInfo, JobScheduleInfo, SchedulerCommand, SchedulerHandle, SharedJobState};
pub use job::{BackgroundJob, HookEvent, JobError, JobSchedule, ShutdownBehavior};
pub use scheduler::{create_scheduler, JobScheduler};
