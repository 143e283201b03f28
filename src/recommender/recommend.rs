//! Seed-based similarity queries against a `Snapshot`.

use super::error::RecommenderError;
use super::scoring::{ScoreAdjustment, SameArtistPenalty};
use super::snapshot::Snapshot;
use super::text::clean_text;
use serde::Serialize;

/// Candidates fetched per requested result, leaving room for re-ranking.
pub const OVERFETCH_FACTOR: usize = 3;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecommendedTrack {
    pub track_id: String,
    pub title: String,
    pub artist_name: String,
    pub score: f64,
}

/// Most relevant first.
pub type RecommendationResult = Vec<RecommendedTrack>;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ItemScore {
    pub track_id: String,
    pub score: f64,
}

/// Tracks similar to `seed_track_id`, with candidates by the seed's artist
/// multiplied by `same_artist_penalty`.
pub fn recommend(
    snapshot: &Snapshot,
    seed_track_id: &str,
    top_k: usize,
    same_artist_penalty: f64,
) -> Result<RecommendationResult, RecommenderError> {
    recommend_with(
        snapshot,
        seed_track_id,
        top_k,
        &SameArtistPenalty::new(same_artist_penalty),
    )
}

pub fn recommend_with(
    snapshot: &Snapshot,
    seed_track_id: &str,
    top_k: usize,
    adjustment: &dyn ScoreAdjustment,
) -> Result<RecommendationResult, RecommenderError> {
    let seed_row = snapshot
        .row_of(seed_track_id)
        .ok_or_else(|| RecommenderError::unknown_track(seed_track_id))?;
    if top_k == 0 {
        return Ok(Vec::new());
    }
    let seed = match snapshot.track(seed_row) {
        Some(seed) => seed,
        None => return Err(RecommenderError::unknown_track(seed_track_id)),
    };

    // The index leaves the seed out, so all `fetch` slots go to candidates
    let fetch = top_k.saturating_mul(OVERFETCH_FACTOR);
    let mut scored: Vec<RecommendedTrack> = snapshot
        .index()
        .kneighbors(seed_row, fetch)
        .into_iter()
        .filter_map(|n| {
            let candidate = snapshot.track(n.row)?;
            Some(RecommendedTrack {
                track_id: candidate.track_id.clone(),
                title: candidate.title().to_string(),
                artist_name: candidate.artist().to_string(),
                score: adjustment.adjust(seed, candidate, n.similarity()),
            })
        })
        .collect();

    // sort_by is stable, equal scores keep their neighbor order
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(top_k);
    Ok(scored)
}

/// Raw similarities for the nearest tracks, no adjustment applied.
pub fn get_item_scores(
    snapshot: &Snapshot,
    seed_track_id: &str,
    top_k: usize,
) -> Result<Vec<ItemScore>, RecommenderError> {
    let seed_row = snapshot
        .row_of(seed_track_id)
        .ok_or_else(|| RecommenderError::unknown_track(seed_track_id))?;
    if top_k == 0 {
        return Ok(Vec::new());
    }

    Ok(snapshot
        .index()
        .kneighbors(seed_row, top_k)
        .into_iter()
        .filter_map(|n| {
            snapshot.track(n.row).map(|t| ItemScore {
                track_id: t.track_id.clone(),
                score: n.similarity(),
            })
        })
        .collect())
}

/// Tracks whose documents best match a free-text description, weighted
/// with the snapshot's fitted vocabulary. Text with no known terms matches
/// nothing.
pub fn match_text(snapshot: &Snapshot, text: &str, top_k: usize) -> Vec<ItemScore> {
    let query = snapshot.model().transform(&clean_text(text));
    if query.is_zero() {
        return Vec::new();
    }
    snapshot
        .index()
        .kneighbors_of(&query, top_k)
        .into_iter()
        .filter_map(|n| {
            snapshot.track(n.row).map(|t| ItemScore {
                track_id: t.track_id.clone(),
                score: n.similarity(),
            })
        })
        .collect()
}
