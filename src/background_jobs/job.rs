use super::context::JobContext;
use std::time::Duration;

/// When a job should run.
#[derive(Debug, Clone)]
pub enum JobSchedule {
    /// Every `Duration`, first run as soon as the scheduler starts.
    Interval(Duration),
    /// Only when the hook fires.
    Hook(HookEvent),
    Combined {
        interval: Option<Duration>,
        hooks: Vec<HookEvent>,
    },
}

impl JobSchedule {
    pub fn interval(&self) -> Option<Duration> {
        match self {
            JobSchedule::Interval(interval) => Some(*interval),
            JobSchedule::Combined { interval, .. } => *interval,
            JobSchedule::Hook(_) => None,
        }
    }

    pub fn listens_to(&self, event: HookEvent) -> bool {
        match self {
            JobSchedule::Hook(hook) => *hook == event,
            JobSchedule::Combined { hooks, .. } => hooks.contains(&event),
            JobSchedule::Interval(_) => false,
        }
    }
}

/// Events that can trigger hook-based jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    OnStartup,
    /// The catalog source was modified (import, external sync).
    OnCatalogChange,
}

impl std::fmt::Display for HookEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookEvent::OnStartup => write!(f, "OnStartup"),
            HookEvent::OnCatalogChange => write!(f, "OnCatalogChange"),
        }
    }
}

/// What happens to a running job when the scheduler shuts down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownBehavior {
    #[default]
    Cancellable,
    WaitForCompletion,
}

#[derive(Debug)]
pub enum JobError {
    NotFound,
    AlreadyRunning,
    ExecutionFailed(String),
    Cancelled,
}

impl std::fmt::Display for JobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobError::NotFound => write!(f, "Job not found"),
            JobError::AlreadyRunning => write!(f, "Job is already running"),
            JobError::ExecutionFailed(msg) => write!(f, "Execution failed: {}", msg),
            JobError::Cancelled => write!(f, "Job was cancelled"),
        }
    }
}

impl std::error::Error for JobError {}

/// A unit of background work.
///
/// `execute` is called through `spawn_blocking`. Long-running jobs should
/// check `ctx.is_cancelled()` between steps and return
/// `JobError::Cancelled` when it is set.
pub trait BackgroundJob: Send + Sync {
    fn id(&self) -> &'static str;

    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn schedule(&self) -> JobSchedule;

    fn shutdown_behavior(&self) -> ShutdownBehavior {
        ShutdownBehavior::Cancellable
    }

    fn execute(&self, ctx: &JobContext) -> Result<(), JobError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_interval() {
        let every_minute = Duration::from_secs(60);
        assert_eq!(
            JobSchedule::Interval(every_minute).interval(),
            Some(every_minute)
        );
        assert_eq!(JobSchedule::Hook(HookEvent::OnStartup).interval(), None);
        let combined = JobSchedule::Combined {
            interval: Some(every_minute),
            hooks: vec![HookEvent::OnStartup],
        };
        assert_eq!(combined.interval(), Some(every_minute));
    }

    #[test]
    fn test_schedule_listens_to() {
        let combined = JobSchedule::Combined {
            interval: None,
            hooks: vec![HookEvent::OnStartup, HookEvent::OnCatalogChange],
        };
        assert!(combined.listens_to(HookEvent::OnCatalogChange));
        assert!(JobSchedule::Hook(HookEvent::OnStartup).listens_to(HookEvent::OnStartup));
        assert!(!JobSchedule::Hook(HookEvent::OnStartup).listens_to(HookEvent::OnCatalogChange));
        assert!(!JobSchedule::Interval(Duration::from_secs(1)).listens_to(HookEvent::OnStartup));
    }

    #[test]
    fn test_job_error_display() {
        assert_eq!(JobError::AlreadyRunning.to_string(), "Job is already running");
        assert_eq!(
            JobError::ExecutionFailed("boom".to_string()).to_string(),
            "Execution failed: boom"
        );
    }
}
