//! Reloads the catalog and swaps a freshly built snapshot in.

use crate::background_jobs::{
    context::JobContext,
    job::{BackgroundJob, HookEvent, JobError, JobSchedule, ShutdownBehavior},
};
use crate::metrics;
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub struct SnapshotRefreshJob {
    interval: Duration,
}

impl SnapshotRefreshJob {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl BackgroundJob for SnapshotRefreshJob {
    fn id(&self) -> &'static str {
        "snapshot_refresh"
    }

    fn name(&self) -> &'static str {
        "Snapshot Refresh"
    }

    fn description(&self) -> &'static str {
        "Rebuild the similarity snapshot from the catalog source"
    }

    fn schedule(&self) -> JobSchedule {
        JobSchedule::Combined {
            interval: Some(self.interval),
            hooks: vec![HookEvent::OnStartup, HookEvent::OnCatalogChange],
        }
    }

    fn shutdown_behavior(&self) -> ShutdownBehavior {
        // An abandoned build never reaches the handle
        ShutdownBehavior::Cancellable
    }

    fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        info!(
            "Refreshing snapshot from {}",
            ctx.factory.source().describe()
        );
        let start = Instant::now();
        match ctx.factory.rebuild() {
            Ok(handle) => {
                metrics::record_snapshot_build(true, start.elapsed());
                let snapshot = handle.current();
                metrics::set_live_snapshot(&snapshot);
                info!(
                    "Snapshot generation {} live: {} tracks, {} terms",
                    snapshot.generation(),
                    snapshot.len(),
                    snapshot.vocabulary_size()
                );
                Ok(())
            }
            Err(e) => {
                metrics::record_snapshot_build(false, start.elapsed());
                warn!("Snapshot refresh failed, previous snapshot stays live: {:#}", e);
                Err(JobError::ExecutionFailed(format!("{:#}", e)))
            }
        }
    }
}
