//! Score adjustment strategies applied to raw similarities before the final
//! re-sort.

use super::text::clean_text;
use crate::catalog_source::{present, TrackRecord};

pub trait ScoreAdjustment: Send + Sync {
    fn adjust(&self, seed: &TrackRecord, candidate: &TrackRecord, raw: f64) -> f64;
}

impl<F> ScoreAdjustment for F
where
    F: Fn(&TrackRecord, &TrackRecord, f64) -> f64 + Send + Sync,
{
    fn adjust(&self, seed: &TrackRecord, candidate: &TrackRecord, raw: f64) -> f64 {
        self(seed, candidate, raw)
    }
}

/// Leaves scores untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoAdjustment;

impl ScoreAdjustment for NoAdjustment {
    fn adjust(&self, _seed: &TrackRecord, _candidate: &TrackRecord, raw: f64) -> f64 {
        raw
    }
}

fn clamp_factor(factor: f64) -> f64 {
    if factor.is_nan() {
        1.0
    } else {
        factor.clamp(0.0, 1.0)
    }
}

fn same_value(a: &Option<String>, b: &Option<String>) -> bool {
    match (present(a), present(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Multiplies the score of candidates by the seed's artist. A factor of 0
/// zeroes them, it does not drop them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SameArtistPenalty {
    factor: f64,
}

impl SameArtistPenalty {
    pub fn new(factor: f64) -> Self {
        Self {
            factor: clamp_factor(factor),
        }
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }
}

impl ScoreAdjustment for SameArtistPenalty {
    fn adjust(&self, seed: &TrackRecord, candidate: &TrackRecord, raw: f64) -> f64 {
        if same_value(&seed.artist_name, &candidate.artist_name) {
            raw * self.factor
        } else {
            raw
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SameAlbumPenalty {
    factor: f64,
}

impl SameAlbumPenalty {
    pub fn new(factor: f64) -> Self {
        Self {
            factor: clamp_factor(factor),
        }
    }
}

impl ScoreAdjustment for SameAlbumPenalty {
    fn adjust(&self, seed: &TrackRecord, candidate: &TrackRecord, raw: f64) -> f64 {
        if same_value(&seed.album_title, &candidate.album_title) {
            raw * self.factor
        } else {
            raw
        }
    }
}

/// Multiplies candidates sharing the seed's major genre by `factor` (>= 1).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MajorGenreBoost {
    factor: f64,
}

impl MajorGenreBoost {
    pub fn new(factor: f64) -> Self {
        Self {
            factor: if factor.is_finite() { factor.max(1.0) } else { 1.0 },
        }
    }
}

impl ScoreAdjustment for MajorGenreBoost {
    fn adjust(&self, seed: &TrackRecord, candidate: &TrackRecord, raw: f64) -> f64 {
        let seed_genre = present(&seed.major_genre).map(clean_text);
        let candidate_genre = present(&candidate.major_genre).map(clean_text);
        match (seed_genre, candidate_genre) {
            (Some(a), Some(b)) if a == b => raw * self.factor,
            _ => raw,
        }
    }
}

/// Applies each adjustment in order, feeding each one the previous output.
#[derive(Default)]
pub struct AdjustmentChain {
    steps: Vec<Box<dyn ScoreAdjustment>>,
}

impl AdjustmentChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then<A: ScoreAdjustment + 'static>(mut self, step: A) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl ScoreAdjustment for AdjustmentChain {
    fn adjust(&self, seed: &TrackRecord, candidate: &TrackRecord, raw: f64) -> f64 {
        self.steps
            .iter()
            .fold(raw, |score, step| step.adjust(seed, candidate, score))
    }
}
