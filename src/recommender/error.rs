use thiserror::Error;

/// The only failures that cross the engine boundary. Everything else
/// degrades to an empty but valid result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecommenderError {
    #[error("Unknown track id: {track_id}")]
    UnknownTrack { track_id: String },

    #[error("Cannot build a snapshot from an empty catalog")]
    EmptyCatalog,
}

impl RecommenderError {
    pub fn unknown_track<S: Into<String>>(track_id: S) -> Self {
        RecommenderError::UnknownTrack {
            track_id: track_id.into(),
        }
    }
}
