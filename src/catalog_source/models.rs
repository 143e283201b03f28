//! Track metadata records consumed by the recommender.
//!
//! One `TrackRecord` is one row of the denormalized track view: identity,
//! display fields, multi-valued genre/tag/language columns and a few
//! passthrough columns the similarity model never looks at.

use serde::{Deserialize, Serialize};

/// A multi-valued column, either still delimited or already split.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MultiValue {
    /// Raw string using `| , ; /` or whitespace as separators.
    Delimited(String),
    /// Pre-split values.
    List(Vec<String>),
}

impl From<&str> for MultiValue {
    fn from(value: &str) -> Self {
        MultiValue::Delimited(value.to_string())
    }
}

impl From<String> for MultiValue {
    fn from(value: String) -> Self {
        MultiValue::Delimited(value)
    }
}

impl From<Vec<String>> for MultiValue {
    fn from(values: Vec<String>) -> Self {
        MultiValue::List(values)
    }
}

impl MultiValue {
    /// Flattens the value back to a single `|` separated string for storage.
    pub fn to_delimited(&self) -> String {
        match self {
            MultiValue::Delimited(s) => s.clone(),
            MultiValue::List(values) => values.join("|"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackRecord {
    pub track_id: String,
    pub track_title: Option<String>,
    pub artist_name: Option<String>,
    pub album_title: Option<String>,
    pub genre_title: Option<String>,
    pub language_name: Option<String>,
    pub genres_list: Option<MultiValue>,
    pub tags_list: Option<MultiValue>,
    pub languages_list: Option<MultiValue>,
    #[serde(alias = "track_genre_maj")]
    pub major_genre: Option<String>,

    // Passthrough, not used for similarity
    pub track_duration: Option<f64>,
    pub track_interest: Option<f64>,
    pub track_composer: Option<String>,
}

impl TrackRecord {
    pub fn new<S: Into<String>>(track_id: S) -> Self {
        TrackRecord {
            track_id: track_id.into(),
            ..Default::default()
        }
    }

    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.track_title = Some(title.into());
        self
    }

    pub fn with_artist<S: Into<String>>(mut self, artist: S) -> Self {
        self.artist_name = Some(artist.into());
        self
    }

    pub fn with_album<S: Into<String>>(mut self, album: S) -> Self {
        self.album_title = Some(album.into());
        self
    }

    pub fn with_genres<V: Into<MultiValue>>(mut self, genres: V) -> Self {
        self.genres_list = Some(genres.into());
        self
    }

    pub fn with_tags<V: Into<MultiValue>>(mut self, tags: V) -> Self {
        self.tags_list = Some(tags.into());
        self
    }

    pub fn with_major_genre<S: Into<String>>(mut self, major_genre: S) -> Self {
        self.major_genre = Some(major_genre.into());
        self
    }

    pub fn with_genre_title<S: Into<String>>(mut self, genre_title: S) -> Self {
        self.genre_title = Some(genre_title.into());
        self
    }

    pub fn with_language<S: Into<String>>(mut self, language_name: S) -> Self {
        self.language_name = Some(language_name.into());
        self
    }

    /// Display title, empty when missing.
    pub fn title(&self) -> &str {
        self.track_title.as_deref().unwrap_or("")
    }

    /// Display artist, empty when missing.
    pub fn artist(&self) -> &str {
        self.artist_name.as_deref().unwrap_or("")
    }
}

/// Returns the trimmed value when present and non-blank.
pub fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_value_deserializes_string_or_list() {
        let json = r#"[
            {"track_id": "t1", "genres_list": "rock|pop"},
            {"track_id": "t2", "genres_list": ["jazz", "blues"], "track_genre_maj": "Jazz"}
        ]"#;
        let tracks: Vec<TrackRecord> = serde_json::from_str(json).unwrap();

        assert_eq!(
            tracks[0].genres_list,
            Some(MultiValue::Delimited("rock|pop".to_string()))
        );
        assert_eq!(
            tracks[1].genres_list,
            Some(MultiValue::List(vec!["jazz".to_string(), "blues".to_string()]))
        );
        assert_eq!(tracks[1].major_genre.as_deref(), Some("Jazz"));
        assert!(tracks[0].artist_name.is_none());
    }

    #[test]
    fn test_present_filters_blank_values() {
        assert_eq!(present(&Some("  Artist ".to_string())), Some("Artist"));
        assert_eq!(present(&Some("   ".to_string())), None);
        assert_eq!(present(&None), None);
    }

    #[test]
    fn test_to_delimited() {
        let list = MultiValue::List(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(list.to_delimited(), "a|b");
        assert_eq!(MultiValue::from("x,y").to_delimited(), "x,y");
    }
}
