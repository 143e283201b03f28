//! End-to-end tests for seed-based recommendations and evaluation
//!
//! These run the full pipeline: catalog rows to documents, TF-IDF fit,
//! similarity index, then the query functions on top.

mod common;

use common::*;
use pezzottify_recommender::recommender::{
    evaluate_with, EvaluationOptions, MissingGenrePolicy, Snapshot, SnapshotOptions,
};
use pezzottify_recommender::{evaluate, get_item_scores, recommend, RecommenderError};

fn ids<T>(items: &[T], id_of: impl Fn(&T) -> &str) -> Vec<String> {
    items.iter().map(|i| id_of(i).to_string()).collect()
}

// =============================================================================
// Recommendations
// =============================================================================

#[test]
fn test_penalty_pushes_other_artist_above_same_artist() {
    let snapshot = scenario_snapshot();

    let recs = recommend(&snapshot, TRACK_1_ID, 2, 0.5).unwrap();

    // Track 2 is the closest raw match but shares the seed's artist
    let order = ids(&recs, |r| r.track_id.as_str());
    assert_eq!(order, vec![TRACK_3_ID, TRACK_2_ID]);
    assert!(recs[0].score > 0.8);
    assert!(recs[1].score > 0.4 && recs[1].score < 0.5);
    assert_eq!(recs[0].artist_name, ARTIST_B);
    assert_eq!(recs[0].title, "Highway Anthem");
}

#[test]
fn test_full_penalty_keeps_raw_order() {
    let snapshot = scenario_snapshot();

    let recs = recommend(&snapshot, TRACK_1_ID, 4, 1.0).unwrap();
    let scores = get_item_scores(&snapshot, TRACK_1_ID, 4).unwrap();

    assert_eq!(recs.len(), scores.len());
    for (rec, raw) in recs.iter().zip(scores.iter()) {
        assert_eq!(rec.track_id, raw.track_id);
        assert!((rec.score - raw.score).abs() < 1e-12);
    }
    assert_eq!(recs[0].track_id, TRACK_2_ID);
}

#[test]
fn test_zero_penalty_zeroes_same_artist_but_keeps_it() {
    let snapshot = scenario_snapshot();

    let recs = recommend(&snapshot, TRACK_1_ID, 4, 0.0).unwrap();

    assert_eq!(recs[0].track_id, TRACK_3_ID);
    let same_artist = recs
        .iter()
        .find(|r| r.track_id == TRACK_2_ID)
        .expect("same-artist track is downranked, not removed");
    assert_eq!(same_artist.score, 0.0);
}

#[test]
fn test_shared_genre_beats_shared_artist_without_penalty_headroom() {
    let snapshot = scenario_snapshot();

    let recs = recommend(&snapshot, TRACK_1_ID, 3, 0.0).unwrap();

    // Zeroed candidates keep neighbor order, so track 2 leads the tail
    let order = ids(&recs, |r| r.track_id.as_str());
    assert_eq!(order, vec![TRACK_3_ID, TRACK_2_ID, TRACK_4_ID]);
    assert!(recs[0].score > 0.0);
    assert!(recs[1..].iter().all(|r| r.score == 0.0));
}

#[test]
fn test_seed_never_recommended_and_length_is_bounded() {
    let snapshot = scenario_snapshot();

    for seed in [TRACK_1_ID, TRACK_2_ID, TRACK_3_ID, TRACK_4_ID, TRACK_5_ID] {
        for top_k in [1, 2, 3, 4, 10] {
            let recs = recommend(&snapshot, seed, top_k, 0.5).unwrap();
            assert!(recs.iter().all(|r| r.track_id != seed));
            assert_eq!(recs.len(), top_k.min(SCENARIO_TRACK_COUNT - 1));
            assert!(recs.windows(2).all(|w| w[0].score >= w[1].score));
        }
    }
}

#[test]
fn test_unrelated_tracks_score_zero() {
    let snapshot = scenario_snapshot();

    let scores = get_item_scores(&snapshot, TRACK_1_ID, 4).unwrap();

    for item in scores.iter().filter(|s| s.track_id == TRACK_4_ID || s.track_id == TRACK_5_ID) {
        assert_eq!(item.score, 0.0);
    }
    assert!(scores.iter().all(|s| (0.0..=1.0 + 1e-9).contains(&s.score)));
}

#[test]
fn test_unknown_seed_is_an_error() {
    let snapshot = scenario_snapshot();

    let err = recommend(&snapshot, "does-not-exist", 3, 0.5).unwrap_err();
    assert_eq!(err, RecommenderError::unknown_track("does-not-exist"));
    assert!(get_item_scores(&snapshot, "does-not-exist", 3).is_err());
}

#[test]
fn test_zero_top_k_returns_nothing() {
    let snapshot = scenario_snapshot();

    assert!(recommend(&snapshot, TRACK_1_ID, 0, 0.5).unwrap().is_empty());
    assert!(get_item_scores(&snapshot, TRACK_1_ID, 0).unwrap().is_empty());
}

#[test]
fn test_results_are_deterministic_across_builds() {
    let first = scenario_snapshot();
    let second = scenario_snapshot();

    for seed in [TRACK_1_ID, TRACK_3_ID, TRACK_5_ID] {
        assert_eq!(
            recommend(&first, seed, 4, 0.5).unwrap(),
            recommend(&second, seed, 4, 0.5).unwrap()
        );
    }
}

#[test]
fn test_single_track_catalog_has_no_recommendations() {
    let snapshot = Snapshot::build(
        scenario_tracks().into_iter().take(1).collect(),
        &SnapshotOptions::default(),
    )
    .unwrap();

    assert!(recommend(&snapshot, TRACK_1_ID, 5, 0.5).unwrap().is_empty());
}

// =============================================================================
// Evaluation
// =============================================================================

#[test]
fn test_distinct_artists_have_zero_artist_consistency() {
    let snapshot =
        Snapshot::build(distinct_artist_tracks(12), &SnapshotOptions::default()).unwrap();

    let report = evaluate(&snapshot, 12, 3, 0.5);

    assert_eq!(report.artist_consistency, Some(0.0));
    assert_eq!(report.evaluated_seeds, 12);
    let genre = report.genre_consistency.unwrap();
    assert!((0.0..=1.0).contains(&genre));
}

#[test]
fn test_evaluation_is_reproducible_for_a_seed() {
    let snapshot =
        Snapshot::build(distinct_artist_tracks(30), &SnapshotOptions::default()).unwrap();
    let options = EvaluationOptions {
        sample_size: 10,
        top_k: 3,
        seed: 7,
        ..Default::default()
    };

    assert_eq!(
        evaluate_with(&snapshot, &options),
        evaluate_with(&snapshot, &options)
    );
}

#[test]
fn test_sample_larger_than_catalog_uses_every_track() {
    let snapshot = scenario_snapshot();

    let report = evaluate(&snapshot, 100, 2, 0.5);

    assert_eq!(report.sampled_seeds, SCENARIO_TRACK_COUNT);
    let average = report.average_similarity.unwrap();
    assert!((0.0..=1.0).contains(&average));
}

#[test]
fn test_missing_genre_policies_differ_only_on_genre_metric() {
    let mut tracks = scenario_tracks();
    tracks[4].major_genre = None;
    let snapshot = Snapshot::build(tracks, &SnapshotOptions::default()).unwrap();

    let genre_only = evaluate_with(
        &snapshot,
        &EvaluationOptions {
            sample_size: 5,
            top_k: 2,
            missing_genre_policy: MissingGenrePolicy::ExcludeFromGenreOnly,
            ..Default::default()
        },
    );
    let from_all = evaluate_with(
        &snapshot,
        &EvaluationOptions {
            sample_size: 5,
            top_k: 2,
            missing_genre_policy: MissingGenrePolicy::ExcludeFromAll,
            ..Default::default()
        },
    );

    assert_eq!(genre_only.evaluated_seeds, 5);
    assert_eq!(genre_only.genre_evaluated_seeds, 4);
    assert_eq!(from_all.evaluated_seeds, 4);
}
