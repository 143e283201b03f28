//! The immutable bundle a recommendation query runs against.
//!
//! A `Snapshot` is built in one go from an owned vector of track records:
//! documents, term weights and the similarity index are all derived inside
//! `Snapshot::build` and never touched again. Refreshing means building a new
//! snapshot and swapping it in through a `SnapshotHandle`.

use super::document::{build_document_with, DocumentWeights};
use super::error::RecommenderError;
use super::index::{SimilarityIndex, DEFAULT_NEIGHBOR_CAP};
use super::vectorizer::{fit, TfidfModel, TfidfSettings};
use crate::catalog_source::TrackRecord;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{info, warn};

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Debug, PartialEq)]
pub struct SnapshotOptions {
    pub weights: DocumentWeights,
    pub max_features: Option<usize>,
    pub neighbor_cap: usize,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            weights: DocumentWeights::default(),
            max_features: None,
            neighbor_cap: DEFAULT_NEIGHBOR_CAP,
        }
    }
}

#[derive(Debug)]
pub struct Snapshot {
    tracks: Vec<TrackRecord>,
    documents: Vec<String>,
    id_to_row: HashMap<String, usize>,
    model: TfidfModel,
    index: SimilarityIndex,
    generation: u64,
    built_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn build(
        tracks: Vec<TrackRecord>,
        options: &SnapshotOptions,
    ) -> Result<Snapshot, RecommenderError> {
        let start = Instant::now();

        let mut id_to_row = HashMap::with_capacity(tracks.len());
        let mut unique = Vec::with_capacity(tracks.len());
        for mut track in tracks {
            let id = track.track_id.trim();
            if id.is_empty() {
                warn!("Skipping track with blank id");
                continue;
            }
            if id_to_row.contains_key(id) {
                warn!("Skipping duplicate track id {}", id);
                continue;
            }
            // Results echo the stored id, keep it identical to the lookup key
            let id = id.to_string();
            id_to_row.insert(id.clone(), unique.len());
            track.track_id = id;
            unique.push(track);
        }

        if unique.is_empty() {
            return Err(RecommenderError::EmptyCatalog);
        }

        let documents: Vec<String> = unique
            .par_iter()
            .map(|t| build_document_with(t, &options.weights))
            .collect();

        let settings = TfidfSettings {
            max_features: options.max_features,
            ..Default::default()
        };
        let (model, matrix) = fit(&documents, &settings)?;
        let index = SimilarityIndex::build(matrix, options.neighbor_cap);

        let snapshot = Snapshot {
            tracks: unique,
            documents,
            id_to_row,
            model,
            index,
            generation: NEXT_GENERATION.fetch_add(1, Ordering::SeqCst),
            built_at: Utc::now(),
        };

        info!(
            "Built snapshot generation {} with {} tracks, {} terms in {:?}",
            snapshot.generation,
            snapshot.len(),
            snapshot.vocabulary_size(),
            start.elapsed()
        );
        Ok(snapshot)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn row_of(&self, track_id: &str) -> Option<usize> {
        self.id_to_row.get(track_id.trim()).copied()
    }

    pub fn track(&self, row: usize) -> Option<&TrackRecord> {
        self.tracks.get(row)
    }

    pub fn track_by_id(&self, track_id: &str) -> Option<&TrackRecord> {
        self.row_of(track_id).and_then(|row| self.track(row))
    }

    pub fn tracks(&self) -> &[TrackRecord] {
        &self.tracks
    }

    pub fn document(&self, row: usize) -> Option<&str> {
        self.documents.get(row).map(String::as_str)
    }

    pub fn model(&self) -> &TfidfModel {
        &self.model
    }

    pub fn index(&self) -> &SimilarityIndex {
        &self.index
    }

    pub fn vocabulary_size(&self) -> usize {
        self.model.vocabulary_size()
    }

    pub fn neighbor_cap(&self) -> usize {
        self.index.neighbor_cap()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str, artist: &str, genre: &str) -> TrackRecord {
        TrackRecord::new(id)
            .with_artist(artist)
            .with_genres(genre)
            .with_major_genre(genre)
    }

    #[test]
    fn test_empty_catalog_fails() {
        let result = Snapshot::build(vec![], &SnapshotOptions::default());
        assert_eq!(result.err(), Some(RecommenderError::EmptyCatalog));

        let blank_only = vec![TrackRecord::new("  ")];
        let result = Snapshot::build(blank_only, &SnapshotOptions::default());
        assert_eq!(result.err(), Some(RecommenderError::EmptyCatalog));
    }

    #[test]
    fn test_rows_stay_aligned_with_tracks() {
        let tracks = vec![
            track("t1", "A", "rock"),
            track("t2", "B", "jazz"),
            track("t1", "C", "blues"),
        ];
        let snapshot = Snapshot::build(tracks, &SnapshotOptions::default()).unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.row_of("t2"), Some(1));
        assert_eq!(snapshot.track_by_id("t1").unwrap().artist(), "A");
        assert_eq!(snapshot.index().len(), 2);
        assert!(snapshot.document(1).unwrap().contains("jazz"));
        assert_eq!(snapshot.row_of("missing"), None);
    }

    #[test]
    fn test_padded_ids_are_stored_trimmed() {
        let tracks = vec![track(" t1 ", "A", "rock"), track("t2\t", "B", "rock")];
        let snapshot = Snapshot::build(tracks, &SnapshotOptions::default()).unwrap();

        assert_eq!(snapshot.row_of("t1"), Some(0));
        assert_eq!(snapshot.track(0).unwrap().track_id, "t1");
        let recs = crate::recommender::recommend(&snapshot, "t1", 1, 1.0).unwrap();
        assert_eq!(recs[0].track_id, "t2");
    }

    #[test]
    fn test_generations_increase() {
        let a = Snapshot::build(vec![track("t1", "A", "rock")], &SnapshotOptions::default())
            .unwrap();
        let b = Snapshot::build(vec![track("t1", "A", "rock")], &SnapshotOptions::default())
            .unwrap();
        assert!(b.generation() > a.generation());
    }

    #[test]
    fn test_neighbor_cap_is_carried() {
        let options = SnapshotOptions {
            neighbor_cap: 7,
            ..Default::default()
        };
        let snapshot = Snapshot::build(vec![track("t1", "A", "rock")], &options).unwrap();
        assert_eq!(snapshot.neighbor_cap(), 7);
    }
}
