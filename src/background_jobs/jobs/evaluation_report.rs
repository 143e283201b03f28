//! Periodically scores the live snapshot and publishes the results as
//! gauges.

use crate::background_jobs::{
    context::JobContext,
    job::{BackgroundJob, JobError, JobSchedule},
};
use crate::metrics;
use crate::recommender::evaluate_with;
use std::time::Duration;
use tracing::info;

pub struct EvaluationReportJob {
    interval: Duration,
}

impl EvaluationReportJob {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl BackgroundJob for EvaluationReportJob {
    fn id(&self) -> &'static str {
        "evaluation_report"
    }

    fn name(&self) -> &'static str {
        "Evaluation Report"
    }

    fn description(&self) -> &'static str {
        "Sample seed tracks and measure artist, genre and album consistency"
    }

    fn schedule(&self) -> JobSchedule {
        JobSchedule::Interval(self.interval)
    }

    fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        // Waits for an in-flight first build instead of racing it
        let handle = ctx
            .factory
            .get_or_build()
            .map_err(|e| JobError::ExecutionFailed(format!("{:#}", e)))?;
        let snapshot = handle.current();

        let report = evaluate_with(&snapshot, &ctx.evaluation);
        metrics::set_evaluation_report(&report);

        info!(
            "Evaluation of generation {}: {} of {} seeds, artist={:?} genre={:?} album={:?} similarity={:?}",
            snapshot.generation(),
            report.evaluated_seeds,
            report.sampled_seeds,
            report.artist_consistency,
            report.genre_consistency,
            report.album_consistency,
            report.average_similarity
        );
        Ok(())
    }
}
