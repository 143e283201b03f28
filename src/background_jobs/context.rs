use crate::recommender::{EvaluationOptions, SnapshotFactory};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// What a job gets to work with.
#[derive(Clone)]
pub struct JobContext {
    pub cancellation_token: CancellationToken,

    /// Owns the catalog source and the live snapshot handle.
    pub factory: Arc<SnapshotFactory>,

    pub evaluation: EvaluationOptions,
}

impl JobContext {
    pub fn new(
        cancellation_token: CancellationToken,
        factory: Arc<SnapshotFactory>,
        evaluation: EvaluationOptions,
    ) -> Self {
        Self {
            cancellation_token,
            factory,
            evaluation,
        }
    }

    /// Same resources, different token. Used to give each run its own child
    /// token.
    pub fn with_token(&self, cancellation_token: CancellationToken) -> Self {
        Self {
            cancellation_token,
            factory: Arc::clone(&self.factory),
            evaluation: self.evaluation.clone(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }
}
