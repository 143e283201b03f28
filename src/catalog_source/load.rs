use super::models::TrackRecord;
use super::trait_def::CatalogSource;
use anyhow::Result;
use std::collections::HashSet;
use std::fmt;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadProblem {
    BlankTrackId { position: usize },
    DuplicateTrackId { track_id: String, position: usize },
}

impl fmt::Display for LoadProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadProblem::BlankTrackId { position } => {
                write!(f, "row {} has a blank track id", position)
            }
            LoadProblem::DuplicateTrackId { track_id, position } => {
                write!(f, "row {} repeats track id {}", position, track_id)
            }
        }
    }
}

/// Drops rows without an id and repeated ids (first occurrence wins).
pub fn sanitize_tracks(tracks: Vec<TrackRecord>) -> (Vec<TrackRecord>, Vec<LoadProblem>) {
    let mut seen = HashSet::with_capacity(tracks.len());
    let mut kept = Vec::with_capacity(tracks.len());
    let mut problems = Vec::new();

    for (position, mut track) in tracks.into_iter().enumerate() {
        let id = track.track_id.trim().to_string();
        if id.is_empty() {
            problems.push(LoadProblem::BlankTrackId { position });
            continue;
        }
        if seen.contains(&id) {
            problems.push(LoadProblem::DuplicateTrackId {
                track_id: id,
                position,
            });
            continue;
        }
        seen.insert(id.clone());
        track.track_id = id;
        kept.push(track);
    }
    (kept, problems)
}

/// Loads and sanitizes the catalog, logging every dropped row.
pub fn load_catalog(source: &dyn CatalogSource) -> Result<Vec<TrackRecord>> {
    let raw = source.load_tracks()?;
    let total = raw.len();
    let (tracks, problems) = sanitize_tracks(raw);
    for problem in &problems {
        warn!("Dropping catalog row: {}", problem);
    }
    info!(
        "Loaded {} of {} tracks from {}",
        tracks.len(),
        total,
        source.describe()
    );
    Ok(tracks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_source::InMemoryCatalogSource;

    #[test]
    fn test_sanitize_drops_blank_and_duplicate_ids() {
        let tracks = vec![
            TrackRecord::new("t1").with_title("first"),
            TrackRecord::new(" "),
            TrackRecord::new(" t2 "),
            TrackRecord::new("t1").with_title("second"),
        ];
        let (kept, problems) = sanitize_tracks(tracks);

        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].title(), "first");
        assert_eq!(kept[1].track_id, "t2");
        assert_eq!(
            problems,
            vec![
                LoadProblem::BlankTrackId { position: 1 },
                LoadProblem::DuplicateTrackId {
                    track_id: "t1".to_string(),
                    position: 3
                },
            ]
        );
    }

    #[test]
    fn test_load_catalog() {
        let source = InMemoryCatalogSource::new(vec![
            TrackRecord::new("a"),
            TrackRecord::new("a"),
        ]);
        assert_eq!(load_catalog(&source).unwrap().len(), 1);
    }
}
