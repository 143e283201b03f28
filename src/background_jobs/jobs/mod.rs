//! Jobs that keep the live snapshot fresh and measured.

pub mod evaluation_report;
pub mod snapshot_refresh;

pub use evaluation_report::EvaluationReportJob;
pub use snapshot_refresh::SnapshotRefreshJob;
