use super::context::JobContext;
use super::handle::{JobRunInfo, SchedulerCommand, SchedulerHandle, SharedJobState};
use super::job::{BackgroundJob, HookEvent, JobError, ShutdownBehavior};
use crate::metrics;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Upper bound on how long the loop sleeps when nothing is due.
const IDLE_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Jobs still running at shutdown get this long to finish.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

pub struct JobScheduler {
    shared_state: Arc<RwLock<SharedJobState>>,

    /// Owned by the loop, not shared with handles.
    running_handles: HashMap<String, JoinHandle<()>>,
    job_cancel_tokens: HashMap<String, CancellationToken>,

    hook_receiver: mpsc::Receiver<HookEvent>,
    command_receiver: mpsc::Receiver<SchedulerCommand>,
    shutdown_token: CancellationToken,
    job_context: JobContext,
}

impl JobScheduler {
    pub fn new(
        hook_receiver: mpsc::Receiver<HookEvent>,
        command_receiver: mpsc::Receiver<SchedulerCommand>,
        shutdown_token: CancellationToken,
        job_context: JobContext,
        shared_state: Arc<RwLock<SharedJobState>>,
    ) -> Self {
        Self {
            shared_state,
            running_handles: HashMap::new(),
            job_cancel_tokens: HashMap::new(),
            hook_receiver,
            command_receiver,
            shutdown_token,
            job_context,
        }
    }

    pub async fn register_job(&mut self, job: Arc<dyn BackgroundJob>) {
        let job_id = job.id().to_string();
        info!("Registering job: {} - {}", job_id, job.description());
        let mut state = self.shared_state.write().await;
        state.jobs.insert(job_id, job);
    }

    pub async fn job_count(&self) -> usize {
        self.shared_state.read().await.jobs.len()
    }

    /// Runs until the shutdown token is cancelled.
    pub async fn run(&mut self) {
        let job_count = self.job_count().await;
        info!("Starting job scheduler with {} registered jobs", job_count);

        self.trigger_jobs_for_hook(HookEvent::OnStartup).await;

        loop {
            self.cleanup_completed_jobs().await;

            let sleep_duration = self.time_until_next_scheduled_job().await;
            debug!(
                "Scheduler sleeping for {:?} until next scheduled job",
                sleep_duration
            );

            tokio::select! {
                _ = tokio::time::sleep(sleep_duration) => {
                    self.run_due_jobs().await;
                }
                Some(event) = self.hook_receiver.recv() => {
                    debug!("Received hook event: {}", event);
                    self.trigger_jobs_for_hook(event).await;
                }
                Some(cmd) = self.command_receiver.recv() => {
                    self.handle_command(cmd).await;
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

    async fn handle_command(&mut self, cmd: SchedulerCommand) {
        match cmd {
            SchedulerCommand::TriggerJob { job_id, response } => {
                let result = self.trigger_job(&job_id).await;
                let _ = response.send(result);
            }
        }
    }

    async fn trigger_job(&mut self, job_id: &str) -> Result<(), JobError> {
        let state = self.shared_state.read().await;
        if !state.jobs.contains_key(job_id) {
            return Err(JobError::NotFound);
        }
        if state.running_jobs.contains(job_id) {
            return Err(JobError::AlreadyRunning);
        }
        drop(state);

        self.spawn_job(job_id, "manual").await;
        Ok(())
    }

    async fn time_until_next_scheduled_job(&self) -> Duration {
        let mut min_duration = IDLE_CHECK_INTERVAL;
        let now = Utc::now();

        let state = self.shared_state.read().await;
        for (job_id, job) in &state.jobs {
            if state.running_jobs.contains(job_id) || job.schedule().interval().is_none() {
                continue;
            }
            match state.next_runs.get(job_id) {
                Some(next_run) if *next_run > now => {
                    let duration = (*next_run - now).to_std().unwrap_or(Duration::from_secs(1));
                    min_duration = min_duration.min(duration);
                }
                // Never ran, or overdue
                _ => return Duration::ZERO,
            }
        }

        min_duration
    }

    async fn run_due_jobs(&mut self) {
        let now = Utc::now();
        let due: Vec<String> = {
            let state = self.shared_state.read().await;
            state
                .jobs
                .iter()
                .filter(|(job_id, job)| {
                    !state.running_jobs.contains(*job_id)
                        && job.schedule().interval().is_some()
                        && state
                            .next_runs
                            .get(*job_id)
                            .map_or(true, |next_run| *next_run <= now)
                })
                .map(|(job_id, _)| job_id.clone())
                .collect()
        };

        for job_id in due {
            self.spawn_job(&job_id, "schedule").await;
        }
    }

    async fn trigger_jobs_for_hook(&mut self, event: HookEvent) {
        let mut jobs_to_trigger = Vec::new();
        {
            let state = self.shared_state.read().await;
            for (job_id, job) in &state.jobs {
                if !job.schedule().listens_to(event) {
                    continue;
                }
                if state.running_jobs.contains(job_id) {
                    debug!("Skipping hook trigger for already running job: {}", job_id);
                    continue;
                }
                jobs_to_trigger.push(job_id.clone());
            }
        }

        let trigger = format!("hook:{}", event);
        for job_id in jobs_to_trigger {
            self.spawn_job(&job_id, &trigger).await;
        }
    }

    async fn spawn_job(&mut self, job_id: &str, triggered_by: &str) {
        let job = {
            let state = self.shared_state.read().await;
            match state.jobs.get(job_id) {
                Some(job) => Arc::clone(job),
                None => {
                    error!("Attempted to spawn unknown job: {}", job_id);
                    return;
                }
            }
        };

        info!("Starting job: {} (triggered_by: {})", job_id, triggered_by);

        {
            let mut state = self.shared_state.write().await;
            state.running_jobs.insert(job_id.to_string());
            // Push the next due time out now so the loop does not respin
            // while this run is in flight.
            if let Some(interval) = job.schedule().interval() {
                state
                    .next_runs
                    .insert(job_id.to_string(), next_run_after(interval));
            }
            state.last_runs.insert(
                job_id.to_string(),
                JobRunInfo::started(Utc::now(), triggered_by),
            );
        }

        metrics::set_job_running(job_id, true);

        let cancel_token = self.job_context.cancellation_token.child_token();
        self.job_cancel_tokens
            .insert(job_id.to_string(), cancel_token.clone());
        let ctx = self.job_context.with_token(cancel_token);

        let job_id_owned = job_id.to_string();
        let shared_state = Arc::clone(&self.shared_state);

        let handle = tokio::spawn(async move {
            let start_time = Instant::now();
            let result = tokio::task::spawn_blocking(move || job.execute(&ctx)).await;
            let elapsed = start_time.elapsed();

            let (status_label, error_msg) = match result {
                Ok(Ok(())) => {
                    info!(
                        "Job {} completed successfully in {:?}",
                        job_id_owned, elapsed
                    );
                    ("success", None)
                }
                Ok(Err(JobError::Cancelled)) => {
                    info!("Job {} was cancelled after {:?}", job_id_owned, elapsed);
                    ("cancelled", Some("Cancelled".to_string()))
                }
                Ok(Err(e)) => {
                    error!("Job {} failed after {:?}: {}", job_id_owned, elapsed, e);
                    ("failed", Some(e.to_string()))
                }
                Err(e) => {
                    error!("Job {} panicked after {:?}: {}", job_id_owned, elapsed, e);
                    ("panic", Some(format!("Task panic: {}", e)))
                }
            };

            metrics::record_job_execution(&job_id_owned, status_label);
            metrics::set_job_running(&job_id_owned, false);

            let mut state = shared_state.write().await;
            if let Some(run) = state.last_runs.get_mut(&job_id_owned) {
                run.finish(status_label, error_msg);
            }
            state.running_jobs.remove(&job_id_owned);
        });

        self.running_handles.insert(job_id.to_string(), handle);
    }

    /// Interval jobs count their next run from when the last one finished.
    async fn update_schedule_after_run(&self, job_id: &str) {
        let mut state = self.shared_state.write().await;
        let interval = state.jobs.get(job_id).and_then(|job| job.schedule().interval());
        if let Some(interval) = interval {
            state
                .next_runs
                .insert(job_id.to_string(), next_run_after(interval));
        }
    }

    async fn cleanup_completed_jobs(&mut self) {
        let completed: Vec<String> = self
            .running_handles
            .iter()
            .filter(|(_, handle)| handle.is_finished())
            .map(|(job_id, _)| job_id.clone())
            .collect();

        for job_id in completed {
            if let Some(handle) = self.running_handles.remove(&job_id) {
                let _ = handle.await;
            }
            self.job_cancel_tokens.remove(&job_id);
            self.update_schedule_after_run(&job_id).await;
        }
    }

    async fn shutdown(&mut self) {
        info!("Shutting down scheduler...");

        {
            let state = self.shared_state.read().await;
            for job_id in &state.running_jobs {
                let cancellable = state
                    .jobs
                    .get(job_id)
                    .map_or(true, |job| job.shutdown_behavior() == ShutdownBehavior::Cancellable);
                if cancellable {
                    if let Some(token) = self.job_cancel_tokens.get(job_id) {
                        debug!("Cancelling job: {}", job_id);
                        token.cancel();
                    }
                }
            }
        }

        let handles: Vec<(String, JoinHandle<()>)> = self.running_handles.drain().collect();
        for (job_id, handle) in handles {
            let waits = {
                let state = self.shared_state.read().await;
                state
                    .jobs
                    .get(&job_id)
                    .map(|job| job.shutdown_behavior() == ShutdownBehavior::WaitForCompletion)
                    .unwrap_or(false)
            };
            if waits {
                info!("Waiting for job {} to complete...", job_id);
            }
            if tokio::time::timeout(SHUTDOWN_GRACE, handle).await.is_err() {
                error!("Job {} did not stop within {:?}", job_id, SHUTDOWN_GRACE);
            }
        }

        self.job_cancel_tokens.clear();
        info!("Scheduler shutdown complete");
    }
}

fn next_run_after(interval: Duration) -> chrono::DateTime<Utc> {
    Utc::now() + chrono::Duration::from_std(interval).unwrap_or_default()
}

/// Builds a scheduler plus the handle used to talk to it.
pub fn create_scheduler(
    hook_receiver: mpsc::Receiver<HookEvent>,
    shutdown_token: CancellationToken,
    job_context: JobContext,
) -> (JobScheduler, SchedulerHandle) {
    let (command_tx, command_rx) = mpsc::channel(100);
    let shared_state = Arc::new(RwLock::new(SharedJobState::default()));

    let scheduler = JobScheduler::new(
        hook_receiver,
        command_rx,
        shutdown_token,
        job_context,
        Arc::clone(&shared_state),
    );
    let handle = SchedulerHandle::new(command_tx, shared_state);

    (scheduler, handle)
}
