//! Calling contract for the history-driven (session) recommender.
//!
//! The model itself lives elsewhere. Callers check `is_ready` and never pass
//! an empty history; `guarded_predict` does both.

#[cfg(any(test, feature = "mock"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "mock"), automock)]
pub trait SequentialRecommender: Send + Sync {
    fn is_ready(&self) -> bool;

    /// Track ids predicted from `history` (oldest first). Empty when the
    /// history carries no usable signal.
    fn predict(&self, history: &[String], top_k: usize) -> Vec<String>;
}

/// Never ready, never predicts. Used when no session model is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSequentialRecommender;

impl SequentialRecommender for NoopSequentialRecommender {
    fn is_ready(&self) -> bool {
        false
    }

    fn predict(&self, _history: &[String], _top_k: usize) -> Vec<String> {
        Vec::new()
    }
}

/// Calls `predict` only when the model is ready and the history is not
/// empty.
pub fn guarded_predict(
    recommender: &dyn SequentialRecommender,
    history: &[String],
    top_k: usize,
) -> Vec<String> {
    if history.is_empty() || top_k == 0 || !recommender.is_ready() {
        return Vec::new();
    }
    recommender.predict(history, top_k)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_ready_is_never_called() {
        let mut mock = MockSequentialRecommender::new();
        mock.expect_is_ready().return_const(false);
        mock.expect_predict().never();

        let history = vec!["lofi".to_string()];
        assert!(guarded_predict(&mock, &history, 5).is_empty());
    }

    #[test]
    fn test_empty_history_is_never_called() {
        let mut mock = MockSequentialRecommender::new();
        mock.expect_is_ready().return_const(true);
        mock.expect_predict().never();

        assert!(guarded_predict(&mock, &[], 5).is_empty());
    }

    #[test]
    fn test_ready_model_is_called_with_history() {
        let mut mock = MockSequentialRecommender::new();
        mock.expect_is_ready().return_const(true);
        mock.expect_predict()
            .withf(|history, top_k| history.len() == 2 && *top_k == 3)
            .times(1)
            .returning(|_, _| vec!["t9".to_string(), "t4".to_string()]);

        let history = vec!["jazz".to_string(), "piano".to_string()];
        assert_eq!(guarded_predict(&mock, &history, 3), vec!["t9", "t4"]);
    }

    #[test]
    fn test_noop_recommender() {
        let noop = NoopSequentialRecommender;
        assert!(!noop.is_ready());
        assert!(guarded_predict(&noop, &["a".to_string()], 3).is_empty());
    }
}
