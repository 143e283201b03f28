//! CatalogSource trait definition.

use super::models::TrackRecord;
use anyhow::Result;

/// Read-only supplier of the denormalized track view a snapshot is built
/// from. The engine never writes back through this trait.
pub trait CatalogSource: Send + Sync {
    /// Returns every track row, in the order the snapshot should index them.
    fn load_tracks(&self) -> Result<Vec<TrackRecord>>;

    /// Short human-readable description, used in logs.
    fn describe(&self) -> String;
}
