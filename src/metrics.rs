use crate::recommender::{EvaluationReport, Snapshot};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, GaugeVec, Histogram, HistogramOpts, HistogramVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all recommender metrics
const PREFIX: &str = "pezzottify_recommender";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Snapshot builds
    pub static ref SNAPSHOT_BUILDS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_snapshot_builds_total"), "Total snapshot builds"),
        &["status"]
    ).expect("Failed to create snapshot_builds_total metric");

    pub static ref SNAPSHOT_BUILD_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_snapshot_build_duration_seconds"),
            "Snapshot build duration in seconds"
        )
        .buckets(vec![0.01, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0])
    ).expect("Failed to create snapshot_build_duration_seconds metric");

    pub static ref SNAPSHOT_TRACKS: IntGauge = IntGauge::new(
        format!("{PREFIX}_snapshot_tracks"),
        "Tracks in the live snapshot"
    ).expect("Failed to create snapshot_tracks metric");

    pub static ref SNAPSHOT_VOCABULARY_SIZE: IntGauge = IntGauge::new(
        format!("{PREFIX}_snapshot_vocabulary_size"),
        "Terms in the live snapshot vocabulary"
    ).expect("Failed to create snapshot_vocabulary_size metric");

    pub static ref SNAPSHOT_GENERATION: IntGauge = IntGauge::new(
        format!("{PREFIX}_snapshot_generation"),
        "Generation number of the live snapshot"
    ).expect("Failed to create snapshot_generation metric");

    // Queries
    pub static ref REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_requests_total"), "Total recommendation requests"),
        &["kind", "status"]
    ).expect("Failed to create requests_total metric");

    pub static ref REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_request_duration_seconds"),
            "Recommendation request duration in seconds"
        )
        .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        &["kind"]
    ).expect("Failed to create request_duration_seconds metric");

    // Evaluation
    pub static ref EVALUATION_QUALITY: GaugeVec = GaugeVec::new(
        Opts::new(format!("{PREFIX}_evaluation_quality"), "Latest evaluation metrics"),
        &["metric"]
    ).expect("Failed to create evaluation_quality metric");

    pub static ref EVALUATION_SEEDS: Gauge = Gauge::new(
        format!("{PREFIX}_evaluation_seeds"),
        "Seeds that contributed to the latest evaluation"
    ).expect("Failed to create evaluation_seeds metric");

    // Background jobs
    pub static ref JOB_EXECUTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_job_executions_total"), "Background job executions"),
        &["job_id", "status"]
    ).expect("Failed to create job_executions_total metric");

    pub static ref JOB_RUNNING: GaugeVec = GaugeVec::new(
        Opts::new(format!("{PREFIX}_job_running"), "Whether a background job is running"),
        &["job_id"]
    ).expect("Failed to create job_running metric");
}

/// Registers every metric. Safe to call more than once.
pub fn init_metrics() {
    let _ = REGISTRY.register(Box::new(SNAPSHOT_BUILDS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(SNAPSHOT_BUILD_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(SNAPSHOT_TRACKS.clone()));
    let _ = REGISTRY.register(Box::new(SNAPSHOT_VOCABULARY_SIZE.clone()));
    let _ = REGISTRY.register(Box::new(SNAPSHOT_GENERATION.clone()));
    let _ = REGISTRY.register(Box::new(REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(EVALUATION_QUALITY.clone()));
    let _ = REGISTRY.register(Box::new(EVALUATION_SEEDS.clone()));
    let _ = REGISTRY.register(Box::new(JOB_EXECUTIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(JOB_RUNNING.clone()));

    tracing::info!("Metrics system initialized successfully");
}

pub fn record_snapshot_build(success: bool, duration: Duration) {
    let status = if success { "success" } else { "failure" };
    SNAPSHOT_BUILDS_TOTAL.with_label_values(&[status]).inc();
    SNAPSHOT_BUILD_DURATION_SECONDS.observe(duration.as_secs_f64());
}

/// Publishes size and generation of the snapshot that just went live.
pub fn set_live_snapshot(snapshot: &Snapshot) {
    SNAPSHOT_TRACKS.set(snapshot.len() as i64);
    SNAPSHOT_VOCABULARY_SIZE.set(snapshot.vocabulary_size() as i64);
    SNAPSHOT_GENERATION.set(snapshot.generation() as i64);
}

pub fn record_request(kind: &str, success: bool, duration: Duration) {
    let status = if success { "success" } else { "error" };
    REQUESTS_TOTAL.with_label_values(&[kind, status]).inc();
    REQUEST_DURATION_SECONDS
        .with_label_values(&[kind])
        .observe(duration.as_secs_f64());
}

/// Metrics without a value (no contributing seed) are left untouched.
pub fn set_evaluation_report(report: &EvaluationReport) {
    let values = [
        ("artist_consistency", report.artist_consistency),
        ("genre_consistency", report.genre_consistency),
        ("album_consistency", report.album_consistency),
        ("average_similarity", report.average_similarity),
    ];
    for (name, value) in values {
        if let Some(value) = value {
            EVALUATION_QUALITY.with_label_values(&[name]).set(value);
        }
    }
    EVALUATION_SEEDS.set(report.evaluated_seeds as f64);
}

/// `status` is one of "success", "cancelled", "failed" or "panic".
pub fn record_job_execution(job_id: &str, status: &str) {
    JOB_EXECUTIONS_TOTAL
        .with_label_values(&[job_id, status])
        .inc();
}

pub fn set_job_running(job_id: &str, running: bool) {
    JOB_RUNNING
        .with_label_values(&[job_id])
        .set(if running { 1.0 } else { 0.0 });
}

/// Renders the registry in the Prometheus text format.
pub fn gather_text() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_contains_recorded_metrics() {
        init_metrics();
        record_request("recommend", true, Duration::from_millis(3));
        record_job_execution("snapshot_refresh", "failed");

        let text = gather_text();
        assert!(text.contains("pezzottify_recommender_requests_total"));
        assert!(text.contains("pezzottify_recommender_job_executions_total"));
    }

    #[test]
    fn test_evaluation_report_sets_gauges() {
        init_metrics();
        let report = EvaluationReport {
            artist_consistency: Some(0.25),
            evaluated_seeds: 4,
            ..Default::default()
        };
        set_evaluation_report(&report);
        let text = gather_text();
        assert!(text.contains("metric=\"artist_consistency\""));
    }
}
