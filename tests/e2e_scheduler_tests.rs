//! End-to-end tests for the background refresh loop
//!
//! Starts a real scheduler with the refresh job, drives it through hooks
//! and manual triggers, then shuts it down.

mod common;

use common::*;
use pezzottify_recommender::background_jobs::jobs::{EvaluationReportJob, SnapshotRefreshJob};
use pezzottify_recommender::background_jobs::{
    create_scheduler, HookEvent, JobContext, JobError, SchedulerHandle,
};
use pezzottify_recommender::catalog_source::CatalogSource;
use pezzottify_recommender::recommender::{EvaluationOptions, SnapshotFactory, SnapshotOptions};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const LONG_INTERVAL: Duration = Duration::from_secs(3600);

/// Waits until the job's last run succeeded and it is no longer running.
async fn wait_for_idle_success(handle: &SchedulerHandle, job_id: &str) -> bool {
    for _ in 0..(WAIT_TIMEOUT_MS / 10) {
        if let Some(info) = handle.get_job(job_id).await {
            let succeeded = info.last_run.is_some_and(|run| run.status == "success");
            if succeeded && !info.is_running {
                return true;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn test_refresh_on_startup_and_catalog_change() {
    let source = Arc::new(CountingCatalogSource::new(scenario_tracks(), Duration::ZERO));
    let factory = Arc::new(SnapshotFactory::new(
        Arc::clone(&source) as Arc<dyn CatalogSource>,
        SnapshotOptions::default(),
    ));
    let shutdown = CancellationToken::new();
    let (hook_tx, hook_rx) = mpsc::channel(8);
    let context = JobContext::new(
        shutdown.child_token(),
        Arc::clone(&factory),
        EvaluationOptions::default(),
    );

    let (mut scheduler, handle) = create_scheduler(hook_rx, shutdown.clone(), context);
    scheduler
        .register_job(Arc::new(SnapshotRefreshJob::new(LONG_INTERVAL)))
        .await;
    let task = tokio::spawn(async move { scheduler.run().await });

    // Startup hook builds the first snapshot
    assert!(wait_until(|| factory.handle().is_some()).await);
    let live = factory.handle().unwrap();
    let first_generation = live.generation();
    assert_eq!(live.current().len(), SCENARIO_TRACK_COUNT);

    // A hook that lands while the startup run is still marked running is skipped
    assert!(wait_for_idle_success(&handle, "snapshot_refresh").await);

    source.replace(distinct_artist_tracks(6));
    hook_tx.send(HookEvent::OnCatalogChange).await.unwrap();

    assert!(wait_until(|| live.generation() != first_generation).await);
    assert_eq!(live.current().len(), 6);
    assert!(source.loads() >= 2);

    let job = handle.get_job("snapshot_refresh").await.unwrap();
    assert!(job.next_run_at.is_some());

    shutdown.cancel();
    tokio::time::timeout(Duration::from_millis(WAIT_TIMEOUT_MS), task)
        .await
        .expect("scheduler stops after shutdown")
        .unwrap();
}

#[tokio::test]
async fn test_manual_trigger_runs_evaluation_report() {
    let source = Arc::new(CountingCatalogSource::new(scenario_tracks(), Duration::ZERO));
    let factory = Arc::new(SnapshotFactory::new(
        Arc::clone(&source) as Arc<dyn CatalogSource>,
        SnapshotOptions::default(),
    ));
    let shutdown = CancellationToken::new();
    let (_hook_tx, hook_rx) = mpsc::channel(8);
    let context = JobContext::new(
        shutdown.child_token(),
        Arc::clone(&factory),
        EvaluationOptions {
            sample_size: 5,
            top_k: 2,
            ..Default::default()
        },
    );

    let (mut scheduler, handle) = create_scheduler(hook_rx, shutdown.clone(), context);
    scheduler
        .register_job(Arc::new(EvaluationReportJob::new(LONG_INTERVAL)))
        .await;
    let task = tokio::spawn(async move { scheduler.run().await });

    assert!(matches!(
        handle.trigger_job("not_a_job").await,
        Err(JobError::NotFound)
    ));

    // An interval-only job is due right away, a manual trigger may race it
    match handle.trigger_job("evaluation_report").await {
        Ok(()) | Err(JobError::AlreadyRunning) => {}
        Err(e) => panic!("unexpected trigger error: {}", e),
    }

    assert!(wait_for_idle_success(&handle, "evaluation_report").await);
    // Evaluation builds the first snapshot when nothing is live yet
    assert!(factory.handle().is_some());

    shutdown.cancel();
    tokio::time::timeout(Duration::from_millis(WAIT_TIMEOUT_MS), task)
        .await
        .expect("scheduler stops after shutdown")
        .unwrap();
}
