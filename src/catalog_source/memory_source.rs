use super::models::TrackRecord;
use super::trait_def::CatalogSource;
use anyhow::Result;
use std::sync::RwLock;

/// Catalog held in memory, replaceable at runtime.
#[derive(Debug, Default)]
pub struct InMemoryCatalogSource {
    tracks: RwLock<Vec<TrackRecord>>,
}

impl InMemoryCatalogSource {
    pub fn new(tracks: Vec<TrackRecord>) -> Self {
        Self {
            tracks: RwLock::new(tracks),
        }
    }

    /// Replaces the catalog contents. Live snapshots are unaffected until
    /// the next build.
    pub fn replace(&self, tracks: Vec<TrackRecord>) {
        let mut guard = self
            .tracks
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = tracks;
    }

    pub fn len(&self) -> usize {
        self.tracks
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CatalogSource for InMemoryCatalogSource {
    fn load_tracks(&self) -> Result<Vec<TrackRecord>> {
        Ok(self
            .tracks
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    fn describe(&self) -> String {
        format!("in-memory catalog ({} tracks)", self.len())
    }
}
