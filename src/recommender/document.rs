//! Turns one catalog row into the token document fed to the vectorizer.
//!
//! Term weighting downstream counts raw frequency, so a token group's
//! importance is expressed by how many times it is repeated here.

use super::text::{clean_optional, clean_text, split_multi_value};
use crate::catalog_source::{present, TrackRecord};

pub const MAJOR_GENRE_PREFIX: &str = "majgenre_";
pub const ARTIST_PREFIX: &str = "artist_";
pub const ALBUM_PREFIX: &str = "album_";

/// Repeat factors for each token group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentWeights {
    pub genres: usize,
    pub tags: usize,
    pub major_genre: usize,
    pub artist: usize,
    /// Album tokens are off unless explicitly enabled.
    pub album: usize,
}

impl Default for DocumentWeights {
    fn default() -> Self {
        Self {
            genres: 4,
            tags: 2,
            major_genre: 5,
            artist: 1,
            album: 0,
        }
    }
}

/// Builds the document with the default weights.
pub fn build_document(row: &TrackRecord) -> String {
    build_document_with(row, &DocumentWeights::default())
}

pub fn build_document_with(row: &TrackRecord, weights: &DocumentWeights) -> String {
    let mut parts: Vec<String> = Vec::new();

    let genres = split_multi_value(row.genres_list.as_ref());
    push_repeated(&mut parts, &genres, weights.genres);

    let tags = split_multi_value(row.tags_list.as_ref());
    push_repeated(&mut parts, &tags, weights.tags);

    let major_genre = clean_optional(row.major_genre.as_deref());
    if !major_genre.is_empty() {
        let token = format!("{}{}", MAJOR_GENRE_PREFIX, major_genre);
        push_repeated(&mut parts, std::slice::from_ref(&token), weights.major_genre);
    }

    if let Some(token) = prefixed_token(ARTIST_PREFIX, &row.artist_name) {
        push_repeated(&mut parts, std::slice::from_ref(&token), weights.artist);
    }

    if let Some(token) = prefixed_token(ALBUM_PREFIX, &row.album_title) {
        push_repeated(&mut parts, std::slice::from_ref(&token), weights.album);
    }

    for free_text in [&row.genre_title, &row.language_name, &row.track_title] {
        let cleaned = clean_optional(free_text.as_deref());
        if !cleaned.is_empty() {
            parts.push(cleaned);
        }
    }

    parts.join(" ")
}

fn push_repeated(parts: &mut Vec<String>, group: &[String], times: usize) {
    for _ in 0..times {
        parts.extend(group.iter().cloned());
    }
}

// A raw value that is blank before cleaning contributes nothing. One that only
// cleans to empty still yields the bare prefix.
fn prefixed_token(prefix: &str, value: &Option<String>) -> Option<String> {
    let raw = present(value)?;
    Some(format!("{}{}", prefix, clean_text(raw).replace(' ', "_")))
}
