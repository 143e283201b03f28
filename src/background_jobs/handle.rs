use super::job::{BackgroundJob, JobError, JobSchedule};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, RwLock};

/// Snapshot of a registered job, as printed by the binaries.
#[derive(Debug, Clone, Serialize)]
pub struct JobInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub schedule: JobScheduleInfo,
    pub is_running: bool,
    pub last_run: Option<JobRunInfo>,
    pub next_run_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobScheduleInfo {
    #[serde(rename = "type")]
    pub schedule_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hooks: Option<Vec<String>>,
}

impl From<JobSchedule> for JobScheduleInfo {
    fn from(schedule: JobSchedule) -> Self {
        match schedule {
            JobSchedule::Interval(duration) => JobScheduleInfo {
                schedule_type: "interval".to_string(),
                value_secs: Some(duration.as_secs()),
                hooks: None,
            },
            JobSchedule::Hook(event) => JobScheduleInfo {
                schedule_type: "hook".to_string(),
                value_secs: None,
                hooks: Some(vec![event.to_string()]),
            },
            JobSchedule::Combined { interval, hooks } => JobScheduleInfo {
                schedule_type: "combined".to_string(),
                value_secs: interval.map(|d| d.as_secs()),
                hooks: Some(hooks.iter().map(|h| h.to_string()).collect()),
            },
        }
    }
}

/// Outcome of the most recent run of a job.
#[derive(Debug, Clone, Serialize)]
pub struct JobRunInfo {
    pub started_at: String,
    pub finished_at: Option<String>,
    /// "running", "success", "cancelled", "failed" or "panic"
    pub status: String,
    pub error_message: Option<String>,
    pub triggered_by: String,
}

impl JobRunInfo {
    pub(crate) fn started(at: DateTime<Utc>, triggered_by: &str) -> Self {
        Self {
            started_at: at.to_rfc3339(),
            finished_at: None,
            status: "running".to_string(),
            error_message: None,
            triggered_by: triggered_by.to_string(),
        }
    }

    pub(crate) fn finish(&mut self, status: &str, error_message: Option<String>) {
        self.finished_at = Some(Utc::now().to_rfc3339());
        self.status = status.to_string();
        self.error_message = error_message;
    }
}

pub enum SchedulerCommand {
    TriggerJob {
        job_id: String,
        response: oneshot::Sender<Result<(), JobError>>,
    },
}

/// State shared between the scheduler loop and its handles.
#[derive(Default)]
pub struct SharedJobState {
    pub jobs: HashMap<String, Arc<dyn BackgroundJob>>,
    pub running_jobs: HashSet<String>,
    /// Next due time of interval jobs. Missing means due now.
    pub next_runs: HashMap<String, DateTime<Utc>>,
    pub last_runs: HashMap<String, JobRunInfo>,
}

impl SharedJobState {
    fn info(&self, job_id: &str, job: &Arc<dyn BackgroundJob>) -> JobInfo {
        JobInfo {
            id: job_id.to_string(),
            name: job.name().to_string(),
            description: job.description().to_string(),
            schedule: job.schedule().into(),
            is_running: self.running_jobs.contains(job_id),
            last_run: self.last_runs.get(job_id).cloned(),
            next_run_at: self.next_runs.get(job_id).map(|at| at.to_rfc3339()),
        }
    }
}

/// Cloneable entry point to a running scheduler.
#[derive(Clone)]
pub struct SchedulerHandle {
    command_tx: mpsc::Sender<SchedulerCommand>,
    shared_state: Arc<RwLock<SharedJobState>>,
}

impl SchedulerHandle {
    pub fn new(
        command_tx: mpsc::Sender<SchedulerCommand>,
        shared_state: Arc<RwLock<SharedJobState>>,
    ) -> Self {
        Self {
            command_tx,
            shared_state,
        }
    }

    /// All registered jobs, ordered by id.
    pub async fn list_jobs(&self) -> Vec<JobInfo> {
        let state = self.shared_state.read().await;
        let mut jobs: Vec<JobInfo> = state
            .jobs
            .iter()
            .map(|(job_id, job)| state.info(job_id, job))
            .collect();
        jobs.sort_by(|a, b| a.id.cmp(&b.id));
        jobs
    }

    pub async fn get_job(&self, job_id: &str) -> Option<JobInfo> {
        let state = self.shared_state.read().await;
        state.jobs.get(job_id).map(|job| state.info(job_id, job))
    }

    /// Asks the scheduler to start a job now.
    pub async fn trigger_job(&self, job_id: &str) -> Result<(), JobError> {
        let (response_tx, response_rx) = oneshot::channel();

        self.command_tx
            .send(SchedulerCommand::TriggerJob {
                job_id: job_id.to_string(),
                response: response_tx,
            })
            .await
            .map_err(|_| JobError::ExecutionFailed("Scheduler not available".to_string()))?;

        response_rx
            .await
            .map_err(|_| JobError::ExecutionFailed("Scheduler did not respond".to_string()))?
    }

    pub async fn is_job_running(&self, job_id: &str) -> bool {
        self.shared_state.read().await.running_jobs.contains(job_id)
    }

    pub async fn job_exists(&self, job_id: &str) -> bool {
        self.shared_state.read().await.jobs.contains_key(job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background_jobs::job::HookEvent;
    use std::time::Duration;

    #[test]
    fn test_schedule_info_from_interval() {
        let info: JobScheduleInfo = JobSchedule::Interval(Duration::from_secs(3600)).into();
        assert_eq!(info.schedule_type, "interval");
        assert_eq!(info.value_secs, Some(3600));
        assert!(info.hooks.is_none());
    }

    #[test]
    fn test_schedule_info_from_combined() {
        let info: JobScheduleInfo = JobSchedule::Combined {
            interval: Some(Duration::from_secs(1800)),
            hooks: vec![HookEvent::OnStartup, HookEvent::OnCatalogChange],
        }
        .into();
        assert_eq!(info.schedule_type, "combined");
        assert_eq!(info.value_secs, Some(1800));
        assert_eq!(
            info.hooks,
            Some(vec!["OnStartup".to_string(), "OnCatalogChange".to_string()])
        );
    }

    #[test]
    fn test_schedule_info_serialization() {
        let info: JobScheduleInfo = JobSchedule::Hook(HookEvent::OnCatalogChange).into();
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["type"], "hook");
        assert_eq!(json["hooks"][0], "OnCatalogChange");
        assert!(json.get("value_secs").is_none());
    }

    #[test]
    fn test_run_info_finish() {
        let mut run = JobRunInfo::started(Utc::now(), "manual");
        assert_eq!(run.status, "running");
        assert!(run.finished_at.is_none());

        run.finish("failed", Some("boom".to_string()));
        assert_eq!(run.status, "failed");
        assert!(run.finished_at.is_some());
        assert_eq!(run.error_message.as_deref(), Some("boom"));
    }
}
