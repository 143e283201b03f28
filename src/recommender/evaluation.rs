//! Offline quality report over a reproducible sample of seed tracks.
//!
//! For every sampled seed the recommender is run once and four per-seed
//! numbers are computed: the share of results by the seed's artist, by the
//! seed's major genre, from the seed's album, and the mean adjusted score.
//! Each is then averaged over the seeds that contributed to it.

use super::recommend::{recommend, RecommendedTrack};
use super::snapshot::Snapshot;
use super::text::clean_text;
use crate::catalog_source::{present, TrackRecord};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub const DEFAULT_EVALUATION_SEED: u64 = 42;

/// How seeds without a major genre are treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingGenrePolicy {
    /// Left out of the genre average only, still counted everywhere else.
    #[default]
    ExcludeFromGenreOnly,
    /// Left out of every average.
    ExcludeFromAll,
    /// Counted in the genre average with a ratio of 0.
    CountAsMismatch,
}

impl MissingGenrePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingGenrePolicy::ExcludeFromGenreOnly => "exclude_from_genre_only",
            MissingGenrePolicy::ExcludeFromAll => "exclude_from_all",
            MissingGenrePolicy::CountAsMismatch => "count_as_mismatch",
        }
    }
}

impl fmt::Display for MissingGenrePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MissingGenrePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "exclude_from_genre_only" => Ok(MissingGenrePolicy::ExcludeFromGenreOnly),
            "exclude_from_all" => Ok(MissingGenrePolicy::ExcludeFromAll),
            "count_as_mismatch" => Ok(MissingGenrePolicy::CountAsMismatch),
            other => Err(format!("Unknown missing genre policy: {}", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EvaluationOptions {
    pub sample_size: usize,
    pub top_k: usize,
    pub same_artist_penalty: f64,
    pub seed: u64,
    pub missing_genre_policy: MissingGenrePolicy,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            sample_size: 100,
            top_k: 5,
            same_artist_penalty: 0.5,
            seed: DEFAULT_EVALUATION_SEED,
            missing_genre_policy: MissingGenrePolicy::default(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub artist_consistency: Option<f64>,
    pub genre_consistency: Option<f64>,
    pub album_consistency: Option<f64>,
    pub average_similarity: Option<f64>,
    pub sampled_seeds: usize,
    pub evaluated_seeds: usize,
    pub genre_evaluated_seeds: usize,
}

#[derive(Debug)]
struct SeedMetrics {
    artist: f64,
    genre: Option<f64>,
    album: f64,
    score: f64,
    seed_has_genre: bool,
}

/// Evaluates with the default seed and policy.
pub fn evaluate(
    snapshot: &Snapshot,
    sample_size: usize,
    top_k: usize,
    same_artist_penalty: f64,
) -> EvaluationReport {
    evaluate_with(
        snapshot,
        &EvaluationOptions {
            sample_size,
            top_k,
            same_artist_penalty,
            ..Default::default()
        },
    )
}

pub fn evaluate_with(snapshot: &Snapshot, options: &EvaluationOptions) -> EvaluationReport {
    let seeds = sample_seeds(snapshot, options.sample_size, options.seed);

    let per_seed: Vec<Option<SeedMetrics>> = seeds
        .par_iter()
        .map(|seed| {
            let recs = match recommend(
                snapshot,
                &seed.track_id,
                options.top_k,
                options.same_artist_penalty,
            ) {
                Ok(recs) => recs,
                Err(err) => {
                    debug!("Skipping evaluation seed {}: {}", seed.track_id, err);
                    return None;
                }
            };
            seed_metrics(snapshot, seed, &recs, options.missing_genre_policy)
        })
        .collect();

    let mut report = EvaluationReport {
        sampled_seeds: seeds.len(),
        ..Default::default()
    };
    let (mut artist, mut album, mut score, mut genre) = (0.0, 0.0, 0.0, 0.0);

    for metrics in per_seed.into_iter().flatten() {
        if !metrics.seed_has_genre
            && options.missing_genre_policy == MissingGenrePolicy::ExcludeFromAll
        {
            continue;
        }
        report.evaluated_seeds += 1;
        artist += metrics.artist;
        album += metrics.album;
        score += metrics.score;
        if let Some(ratio) = metrics.genre {
            report.genre_evaluated_seeds += 1;
            genre += ratio;
        }
    }

    report.artist_consistency = mean(artist, report.evaluated_seeds);
    report.album_consistency = mean(album, report.evaluated_seeds);
    report.average_similarity = mean(score, report.evaluated_seeds);
    report.genre_consistency = mean(genre, report.genre_evaluated_seeds);
    report
}

fn mean(sum: f64, count: usize) -> Option<f64> {
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Draws `min(sample_size, len)` distinct tracks with a fixed seed.
pub fn sample_seeds(snapshot: &Snapshot, sample_size: usize, seed: u64) -> Vec<&TrackRecord> {
    let n = snapshot.len();
    let amount = sample_size.min(n);
    if amount == 0 {
        return Vec::new();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    rand::seq::index::sample(&mut rng, n, amount)
        .into_iter()
        .filter_map(|row| snapshot.track(row))
        .collect()
}

fn seed_metrics(
    snapshot: &Snapshot,
    seed: &TrackRecord,
    recs: &[RecommendedTrack],
    policy: MissingGenrePolicy,
) -> Option<SeedMetrics> {
    if recs.is_empty() {
        return None;
    }
    let candidates: Vec<&TrackRecord> = recs
        .iter()
        .filter_map(|r| snapshot.track_by_id(&r.track_id))
        .collect();
    let n = recs.len() as f64;

    let seed_artist = present(&seed.artist_name);
    let same_artist = candidates
        .iter()
        .filter(|c| seed_artist.is_some() && present(&c.artist_name) == seed_artist)
        .count();

    let seed_album = present(&seed.album_title);
    let same_album = candidates
        .iter()
        .filter(|c| seed_album.is_some() && present(&c.album_title) == seed_album)
        .count();

    let seed_genre = present(&seed.major_genre).map(clean_text);
    let genre = match &seed_genre {
        Some(seed_genre) => {
            let with_genre: Vec<String> = candidates
                .iter()
                .filter_map(|c| present(&c.major_genre).map(clean_text))
                .collect();
            if with_genre.is_empty() {
                None
            } else {
                let matching = with_genre.iter().filter(|g| *g == seed_genre).count();
                Some(matching as f64 / with_genre.len() as f64)
            }
        }
        None if policy == MissingGenrePolicy::CountAsMismatch => Some(0.0),
        None => None,
    };

    Some(SeedMetrics {
        artist: same_artist as f64 / n,
        genre,
        album: same_album as f64 / n,
        score: recs.iter().map(|r| r.score).sum::<f64>() / n,
        seed_has_genre: seed_genre.is_some(),
    })
}
