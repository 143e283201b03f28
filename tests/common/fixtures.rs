//! Catalog fixtures for end-to-end tests

#![allow(dead_code)]

use super::constants::*;
use anyhow::Result;
use pezzottify_recommender::catalog_source::{
    CatalogSource, InMemoryCatalogSource, SqliteCatalogSource, TrackRecord,
};
use pezzottify_recommender::recommender::{Snapshot, SnapshotOptions};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

fn track(id: &str, title: &str, artist: &str, genre: &str) -> TrackRecord {
    let mut major_genre = genre.to_string();
    major_genre[..1].make_ascii_uppercase();
    TrackRecord::new(id)
        .with_title(title)
        .with_artist(artist)
        .with_genres(genre)
        .with_major_genre(major_genre)
}

/// Five tracks: two rock tracks by Artist A, a rock and a jazz track by
/// Artist B and a blues track by Artist C.
pub fn scenario_tracks() -> Vec<TrackRecord> {
    vec![
        track(TRACK_1_ID, "Opening Song", ARTIST_A, "rock"),
        track(TRACK_2_ID, "Second Song", ARTIST_A, "rock"),
        track(TRACK_3_ID, "Highway Anthem", ARTIST_B, "rock"),
        track(TRACK_4_ID, "Blue Note", ARTIST_B, "jazz"),
        track(TRACK_5_ID, "Delta Morning", ARTIST_C, "blues"),
    ]
}

pub fn scenario_snapshot() -> Snapshot {
    Snapshot::build(scenario_tracks(), &SnapshotOptions::default())
        .expect("scenario catalog builds")
}

/// `n` tracks sharing a few genres, each by its own artist.
pub fn distinct_artist_tracks(n: usize) -> Vec<TrackRecord> {
    let genres = ["rock", "jazz", "pop"];
    (0..n)
        .map(|i| {
            track(
                &format!("solo-{}", i),
                &format!("Solo Piece {}", i),
                &format!("Solo Artist {}", i),
                genres[i % genres.len()],
            )
        })
        .collect()
}

/// Writes `tracks` into a fresh SQLite catalog.
/// Returns (temp_dir, catalog_db_path)
pub fn create_sqlite_catalog(tracks: &[TrackRecord]) -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let path = dir.path().join("catalog.db");
    let source = SqliteCatalogSource::open(&path)?;
    source.insert_tracks(tracks)?;
    Ok((dir, path))
}

/// Writes `tracks` as a JSON array.
/// Returns (temp_dir, catalog_json_path)
pub fn create_json_catalog(tracks: &[TrackRecord]) -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let path = dir.path().join("catalog.json");
    std::fs::write(&path, serde_json::to_string_pretty(tracks)?)?;
    Ok((dir, path))
}

/// In-memory catalog that counts loads and can be slowed down to widen
/// race windows.
pub struct CountingCatalogSource {
    inner: InMemoryCatalogSource,
    loads: AtomicUsize,
    delay: Duration,
}

impl CountingCatalogSource {
    pub fn new(tracks: Vec<TrackRecord>, delay: Duration) -> Self {
        Self {
            inner: InMemoryCatalogSource::new(tracks),
            loads: AtomicUsize::new(0),
            delay,
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn replace(&self, tracks: Vec<TrackRecord>) {
        self.inner.replace(tracks);
    }
}

impl CatalogSource for CountingCatalogSource {
    fn load_tracks(&self) -> Result<Vec<TrackRecord>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.inner.load_tracks()
    }

    fn describe(&self) -> String {
        format!("counting({})", self.inner.describe())
    }
}

/// Polls `condition` every 10ms until it holds or the timeout passes.
pub async fn wait_until<F: FnMut() -> bool>(mut condition: F) -> bool {
    let deadline = std::time::Instant::now() + Duration::from_millis(WAIT_TIMEOUT_MS);
    while std::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
