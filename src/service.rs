//! Consumer-facing entry point over the live snapshot.
//!
//! Applies the configured defaults, records request metrics and logs. The
//! engine functions in [`crate::recommender`] stay free of both.

use crate::catalog_source::TrackRecord;
use crate::config::{RecommenderSettings, DEFAULT_SAME_ARTIST_PENALTY, DEFAULT_TOP_K};
use crate::lookup::fetch_in_order;
use crate::metrics;
use crate::recommender::{
    evaluate_with, get_item_scores, match_text, recommend, EvaluationOptions, EvaluationReport,
    ItemScore, RecommendationResult, RecommenderError, Snapshot, SnapshotHandle,
};
use crate::sequential::{guarded_predict, NoopSequentialRecommender, SequentialRecommender};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Values used when a request leaves a parameter out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecommenderDefaults {
    pub top_k: usize,
    pub same_artist_penalty: f64,
}

impl Default for RecommenderDefaults {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            same_artist_penalty: DEFAULT_SAME_ARTIST_PENALTY,
        }
    }
}

impl From<&RecommenderSettings> for RecommenderDefaults {
    fn from(settings: &RecommenderSettings) -> Self {
        Self {
            top_k: settings.top_k,
            same_artist_penalty: settings.same_artist_penalty,
        }
    }
}

pub struct RecommenderService {
    handle: Arc<SnapshotHandle>,
    defaults: RecommenderDefaults,
    sequential: Arc<dyn SequentialRecommender>,
}

impl RecommenderService {
    pub fn new(handle: Arc<SnapshotHandle>, defaults: RecommenderDefaults) -> Self {
        Self {
            handle,
            defaults,
            sequential: Arc::new(NoopSequentialRecommender),
        }
    }

    pub fn with_sequential(mut self, sequential: Arc<dyn SequentialRecommender>) -> Self {
        self.sequential = sequential;
        self
    }

    pub fn handle(&self) -> &Arc<SnapshotHandle> {
        &self.handle
    }

    pub fn defaults(&self) -> RecommenderDefaults {
        self.defaults
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.handle.current()
    }

    pub fn recommend(
        &self,
        seed_track_id: &str,
        top_k: Option<usize>,
        same_artist_penalty: Option<f64>,
    ) -> Result<RecommendationResult, RecommenderError> {
        let snapshot = self.handle.current();
        self.recommend_on(&snapshot, seed_track_id, top_k, same_artist_penalty)
    }

    fn recommend_on(
        &self,
        snapshot: &Snapshot,
        seed_track_id: &str,
        top_k: Option<usize>,
        same_artist_penalty: Option<f64>,
    ) -> Result<RecommendationResult, RecommenderError> {
        let top_k = top_k.unwrap_or(self.defaults.top_k);
        let penalty = same_artist_penalty.unwrap_or(self.defaults.same_artist_penalty);

        let start = Instant::now();
        let result = recommend(snapshot, seed_track_id, top_k, penalty);
        metrics::record_request("recommend", result.is_ok(), start.elapsed());

        match &result {
            Ok(recs) => debug!(
                "recommend seed={} top_k={} penalty={} -> {} results (generation {})",
                seed_track_id,
                top_k,
                penalty,
                recs.len(),
                snapshot.generation()
            ),
            Err(e) => warn!("recommend seed={} failed: {}", seed_track_id, e),
        }
        result
    }

    pub fn item_scores(
        &self,
        seed_track_id: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<ItemScore>, RecommenderError> {
        let top_k = top_k.unwrap_or(self.defaults.top_k);
        let snapshot = self.handle.current();

        let start = Instant::now();
        let result = get_item_scores(&snapshot, seed_track_id, top_k);
        metrics::record_request("item_scores", result.is_ok(), start.elapsed());

        if let Err(e) = &result {
            warn!("item_scores seed={} failed: {}", seed_track_id, e);
        }
        result
    }

    /// Tracks matching a free-text description such as "dreamy synth pop".
    pub fn match_text(&self, text: &str, top_k: Option<usize>) -> Vec<ItemScore> {
        let top_k = top_k.unwrap_or(self.defaults.top_k);
        let snapshot = self.handle.current();

        let start = Instant::now();
        let matches = match_text(&snapshot, text, top_k);
        metrics::record_request("match_text", true, start.elapsed());
        debug!("match_text {:?} -> {} results", text, matches.len());
        matches
    }

    pub fn evaluate(&self, options: &EvaluationOptions) -> EvaluationReport {
        let snapshot = self.handle.current();
        let start = Instant::now();
        let report = evaluate_with(&snapshot, options);
        metrics::record_request("evaluate", true, start.elapsed());
        metrics::set_evaluation_report(&report);
        report
    }

    /// Full records for the recommended tracks, most relevant first. Ids and
    /// records come from the same snapshot even if a refresh swaps mid-call.
    pub fn recommend_tracks(
        &self,
        seed_track_id: &str,
        top_k: Option<usize>,
        same_artist_penalty: Option<f64>,
    ) -> Result<Vec<TrackRecord>, RecommenderError> {
        let snapshot = self.handle.current();
        self.recommend_tracks_on(&snapshot, seed_track_id, top_k, same_artist_penalty)
    }

    fn recommend_tracks_on(
        &self,
        snapshot: &Snapshot,
        seed_track_id: &str,
        top_k: Option<usize>,
        same_artist_penalty: Option<f64>,
    ) -> Result<Vec<TrackRecord>, RecommenderError> {
        let ids: Vec<String> = self
            .recommend_on(snapshot, seed_track_id, top_k, same_artist_penalty)?
            .into_iter()
            .map(|rec| rec.track_id)
            .collect();

        // Bulk lookup in catalog order, put back in recommendation order
        Ok(fetch_in_order(
            &ids,
            |wanted| {
                let wanted: HashSet<&str> = wanted.iter().map(String::as_str).collect();
                snapshot
                    .tracks()
                    .iter()
                    .filter(|track| wanted.contains(track.track_id.as_str()))
                    .cloned()
                    .collect()
            },
            |track: &TrackRecord| track.track_id.clone(),
        ))
    }

    /// Next-track predictions from a listening history. Empty when the
    /// session model is not ready or the history is empty.
    pub fn predict_from_history(&self, history: &[String], top_k: Option<usize>) -> Vec<String> {
        let top_k = top_k.unwrap_or(self.defaults.top_k);
        let start = Instant::now();
        let predictions = guarded_predict(self.sequential.as_ref(), history, top_k);
        metrics::record_request("predict", true, start.elapsed());
        predictions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommender::SnapshotOptions;
    use crate::sequential::MockSequentialRecommender;

    fn service() -> RecommenderService {
        let tracks = vec![
            TrackRecord::new("t1")
                .with_title("Night Drive")
                .with_artist("Neon")
                .with_genres("synthwave|electronic")
                .with_major_genre("Electronic"),
            TrackRecord::new("t2")
                .with_title("City Lights")
                .with_artist("Neon")
                .with_genres("synthwave|electronic")
                .with_major_genre("Electronic"),
            TrackRecord::new("t3")
                .with_title("Chrome")
                .with_artist("Velvet")
                .with_genres("synthwave|electronic")
                .with_major_genre("Electronic"),
            TrackRecord::new("t4")
                .with_title("Dust Road")
                .with_artist("Hollow Creek")
                .with_genres("folk|country")
                .with_major_genre("Folk"),
        ];
        let snapshot = Snapshot::build(tracks, &SnapshotOptions::default()).unwrap();
        RecommenderService::new(
            Arc::new(SnapshotHandle::new(snapshot)),
            RecommenderDefaults {
                top_k: 2,
                same_artist_penalty: 0.5,
            },
        )
    }

    #[test]
    fn test_defaults_apply() {
        let service = service();
        let recs = service.recommend("t1", None, None).unwrap();
        assert_eq!(recs.len(), 2);
        // t2 shares the seed artist and is penalized below t3
        assert_eq!(recs[0].track_id, "t3");

        let recs = service.recommend("t1", Some(1), Some(1.0)).unwrap();
        assert_eq!(recs.len(), 1);
    }

    #[test]
    fn test_unknown_seed() {
        let service = service();
        let err = service.recommend("missing", None, None).unwrap_err();
        assert_eq!(
            err,
            RecommenderError::UnknownTrack {
                track_id: "missing".to_string()
            }
        );
        assert!(service.item_scores("missing", None).is_err());
    }

    #[test]
    fn test_recommend_tracks_keeps_order() {
        let service = service();
        let ids: Vec<String> = service
            .recommend("t1", Some(3), None)
            .unwrap()
            .into_iter()
            .map(|r| r.track_id)
            .collect();
        let tracks = service.recommend_tracks("t1", Some(3), None).unwrap();
        let track_ids: Vec<String> = tracks.into_iter().map(|t| t.track_id).collect();
        assert_eq!(track_ids, ids);
    }

    #[test]
    fn test_recommend_tracks_stays_on_one_snapshot() {
        let service = service();
        let pinned = service.snapshot();

        // A refresh lands mid-request with t3 gone and t2 retitled
        let refreshed = vec![
            TrackRecord::new("t1")
                .with_title("Night Drive")
                .with_artist("Neon")
                .with_genres("synthwave|electronic"),
            TrackRecord::new("t2")
                .with_title("Renamed")
                .with_artist("Neon")
                .with_genres("synthwave|electronic"),
        ];
        service
            .handle()
            .swap(Snapshot::build(refreshed, &SnapshotOptions::default()).unwrap());

        let tracks = service
            .recommend_tracks_on(&pinned, "t1", Some(3), None)
            .unwrap();
        let ids: Vec<&str> = tracks.iter().map(|t| t.track_id.as_str()).collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(ids[0], "t3");
        let t2 = tracks.iter().find(|t| t.track_id == "t2").unwrap();
        assert_eq!(t2.title(), "City Lights");

        // Fresh calls see the refreshed catalog
        let live = service.recommend_tracks("t1", Some(3), None).unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].title(), "Renamed");
    }

    #[test]
    fn test_item_scores_are_raw() {
        let service = service();
        let scores = service.item_scores("t1", Some(3)).unwrap();
        // No penalty: same-artist t2 is as close as t3
        assert_eq!(scores.len(), 3);
        assert!(scores[0].score >= scores[1].score);
        assert!(scores.iter().all(|s| s.track_id != "t1"));
    }

    #[test]
    fn test_match_text() {
        let service = service();
        let matches = service.match_text("folk country", None);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].track_id, "t4");
        assert!(service.match_text("zzz", None).is_empty());
    }

    #[test]
    fn test_predict_without_model_is_empty() {
        let service = service();
        assert!(service
            .predict_from_history(&["t1".to_string()], None)
            .is_empty());
    }

    #[test]
    fn test_predict_uses_default_top_k() {
        let mut mock = MockSequentialRecommender::new();
        mock.expect_is_ready().return_const(true);
        mock.expect_predict()
            .withf(|_, top_k| *top_k == 2)
            .times(1)
            .returning(|_, _| vec!["t4".to_string()]);
        let service = service().with_sequential(Arc::new(mock));

        assert_eq!(
            service.predict_from_history(&["t1".to_string()], None),
            vec!["t4"]
        );
    }

    #[test]
    fn test_evaluate() {
        let service = service();
        let report = service.evaluate(&EvaluationOptions {
            sample_size: 10,
            top_k: 2,
            ..Default::default()
        });
        assert_eq!(report.sampled_seeds, 4);
        assert_eq!(report.evaluated_seeds, 4);
    }
}
