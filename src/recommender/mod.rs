//! Content-based track similarity.
//!
//! Catalog rows become weighted token documents, the documents are turned
//! into TF-IDF rows, and an exact cosine index over those rows answers
//! "tracks like this one" queries. All of it lives in an immutable
//! [`Snapshot`]; refreshes build a new one and swap it in through a
//! [`SnapshotHandle`].

mod document;
mod error;
mod evaluation;
mod handle;
mod index;
mod recommend;
mod scoring;
mod snapshot;
mod stopwords;
mod text;
mod vectorizer;

pub use document::{
    build_document, build_document_with, DocumentWeights, ALBUM_PREFIX, ARTIST_PREFIX,
    MAJOR_GENRE_PREFIX,
};
pub use error::RecommenderError;
pub use evaluation::{
    evaluate, evaluate_with, sample_seeds, EvaluationOptions, EvaluationReport,
    MissingGenrePolicy, DEFAULT_EVALUATION_SEED,
};
pub use handle::{SnapshotFactory, SnapshotHandle};
pub use index::{Neighbor, SimilarityIndex, DEFAULT_NEIGHBOR_CAP};
pub use recommend::{
    get_item_scores, match_text, recommend, recommend_with, ItemScore, RecommendationResult,
    RecommendedTrack, OVERFETCH_FACTOR,
};
pub use scoring::{
    AdjustmentChain, MajorGenreBoost, NoAdjustment, SameAlbumPenalty, SameArtistPenalty,
    ScoreAdjustment,
};
pub use snapshot::{Snapshot, SnapshotOptions};
pub use stopwords::{is_stopword, ENGLISH_STOP_WORDS};
pub use text::{clean_optional, clean_text, split_delimited, split_multi_value};
pub use vectorizer::{fit, SparseRow, TermWeightMatrix, TfidfModel, TfidfSettings};
