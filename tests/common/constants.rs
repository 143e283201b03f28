//! Shared constants for end-to-end tests
//!
//! When the scenario catalog changes, update only this file.

#![allow(dead_code)]

// ============================================================================
// Scenario Catalog
// ============================================================================

/// "Opening Song" by Artist A, rock
pub const TRACK_1_ID: &str = "track-1";

/// "Second Song" by Artist A, rock
pub const TRACK_2_ID: &str = "track-2";

/// "Highway Anthem" by Artist B, rock
pub const TRACK_3_ID: &str = "track-3";

/// "Blue Note" by Artist B, jazz
pub const TRACK_4_ID: &str = "track-4";

/// "Delta Morning" by Artist C, blues
pub const TRACK_5_ID: &str = "track-5";

pub const ARTIST_A: &str = "Artist A";
pub const ARTIST_B: &str = "Artist B";
pub const ARTIST_C: &str = "Artist C";

pub const SCENARIO_TRACK_COUNT: usize = 5;

// ============================================================================
// Timing
// ============================================================================

/// Upper bound for anything the tests wait on asynchronously.
pub const WAIT_TIMEOUT_MS: u64 = 5_000;
