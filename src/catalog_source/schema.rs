//! SQLite schema of the denormalized track view.
//!
//! One row per track, multi-valued columns stored as `|` delimited text.

use crate::sqlite_column;
use crate::sqlite_persistence::{SqlType, Table, VersionedSchema};

const TRACK_FEATURES_TABLE: Table = Table {
    name: "track_features",
    columns: &[
        sqlite_column!(
            "track_id",
            &SqlType::Text,
            is_primary_key = true,
            non_null = true
        ),
        sqlite_column!("track_title", &SqlType::Text),
        sqlite_column!("artist_name", &SqlType::Text),
        sqlite_column!("album_title", &SqlType::Text),
        sqlite_column!("genre_title", &SqlType::Text),
        sqlite_column!("language_name", &SqlType::Text),
        sqlite_column!("genres_list", &SqlType::Text),
        sqlite_column!("tags_list", &SqlType::Text),
        sqlite_column!("languages_list", &SqlType::Text),
        sqlite_column!("major_genre", &SqlType::Text),
        sqlite_column!("track_duration", &SqlType::Real),
        sqlite_column!("track_interest", &SqlType::Real),
        sqlite_column!("track_composer", &SqlType::Text),
    ],
    indices: &[("idx_track_features_artist", "artist_name")],
    unique_constraints: &[],
};

pub const TRACK_FEATURES_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[TRACK_FEATURES_TABLE],
    migration: None,
}];
