//! Pezzottify Recommender Library
//!
//! Content-based "more like this" recommendations over the track catalog,
//! plus the plumbing to keep them fresh: catalog sources, configuration,
//! background refresh jobs and metrics.

pub mod background_jobs;
pub mod catalog_source;
pub mod cli_style;
pub mod config;
pub mod lookup;
pub mod metrics;
pub mod recommender;
pub mod sequential;
pub mod service;
pub mod sqlite_persistence;

pub use catalog_source::{CatalogSource, TrackRecord};
pub use recommender::{
    evaluate, get_item_scores, recommend, RecommenderError, Snapshot, SnapshotFactory,
    SnapshotHandle,
};
pub use service::{RecommenderDefaults, RecommenderService};
