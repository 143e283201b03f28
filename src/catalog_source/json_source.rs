use super::models::TrackRecord;
use super::trait_def::CatalogSource;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Reads a JSON array of track records from disk on every load.
#[derive(Debug, Clone)]
pub struct JsonCatalogSource {
    path: PathBuf,
}

impl JsonCatalogSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogSource for JsonCatalogSource {
    fn load_tracks(&self) -> Result<Vec<TrackRecord>> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open catalog file {:?}", self.path))?;
        let tracks: Vec<TrackRecord> = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse catalog file {:?}", self.path))?;
        Ok(tracks)
    }

    fn describe(&self) -> String {
        format!("json catalog {:?}", self.path)
    }
}
