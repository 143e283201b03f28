//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{scenario_snapshot, TRACK_1_ID};
//!
//! #[test]
//! fn test_seed_is_excluded() {
//!     let snapshot = scenario_snapshot();
//!     let recs = pezzottify_recommender::recommend(&snapshot, TRACK_1_ID, 3, 0.5).unwrap();
//!     assert!(recs.iter().all(|r| r.track_id != TRACK_1_ID));
//! }
//! ```

mod constants;
mod fixtures;

pub use constants::*;
#[allow(unused_imports)]
pub use fixtures::{
    create_json_catalog, create_sqlite_catalog, distinct_artist_tracks, scenario_snapshot,
    scenario_tracks, wait_until, CountingCatalogSource,
};
