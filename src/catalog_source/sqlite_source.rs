use super::models::{MultiValue, TrackRecord};
use super::schema::TRACK_FEATURES_VERSIONED_SCHEMAS;
use super::trait_def::CatalogSource;
use crate::sqlite_persistence::migrate_if_needed;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, Row};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

const SELECT_TRACKS: &str = "SELECT track_id, track_title, artist_name, album_title, genre_title, \
    language_name, genres_list, tags_list, languages_list, major_genre, track_duration, \
    track_interest, track_composer FROM track_features ORDER BY rowid";

const INSERT_TRACK: &str = "INSERT OR REPLACE INTO track_features (track_id, track_title, \
    artist_name, album_title, genre_title, language_name, genres_list, tags_list, \
    languages_list, major_genre, track_duration, track_interest, track_composer) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)";

/// Track view stored in a SQLite `track_features` table.
pub struct SqliteCatalogSource {
    path: Option<PathBuf>,
    conn: Mutex<Connection>,
}

impl SqliteCatalogSource {
    /// Opens the database, creating the schema when the file is new.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();
        let is_new = !path.exists();
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open catalog database {:?}", path))?;
        migrate_if_needed(&conn, TRACK_FEATURES_VERSIONED_SCHEMAS)
            .with_context(|| format!("Invalid catalog database {:?}", path))?;
        if is_new {
            info!("Created new catalog database at {:?}", path);
        }
        Ok(Self {
            path: Some(path),
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrate_if_needed(&conn, TRACK_FEATURES_VERSIONED_SCHEMAS)?;
        Ok(Self {
            path: None,
            conn: Mutex::new(conn),
        })
    }

    /// Writes rows in one transaction, replacing rows with the same id.
    /// Used for seeding and imports, never by the engine.
    pub fn insert_tracks(&self, tracks: &[TrackRecord]) -> Result<usize> {
        let mut conn = self
            .conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(INSERT_TRACK)?;
            for track in tracks {
                stmt.execute(params![
                    track.track_id,
                    track.track_title,
                    track.artist_name,
                    track.album_title,
                    track.genre_title,
                    track.language_name,
                    track.genres_list.as_ref().map(MultiValue::to_delimited),
                    track.tags_list.as_ref().map(MultiValue::to_delimited),
                    track.languages_list.as_ref().map(MultiValue::to_delimited),
                    track.major_genre,
                    track.track_duration,
                    track.track_interest,
                    track.track_composer,
                ])
                .with_context(|| format!("Failed to insert track {}", track.track_id))?;
            }
        }
        tx.commit()?;
        Ok(tracks.len())
    }

    pub fn count(&self) -> Result<usize> {
        let conn = self
            .conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM track_features", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn row_to_track(row: &Row) -> rusqlite::Result<TrackRecord> {
        let multi = |idx: usize| -> rusqlite::Result<Option<MultiValue>> {
            Ok(row.get::<_, Option<String>>(idx)?.map(MultiValue::Delimited))
        };
        Ok(TrackRecord {
            track_id: row.get(0)?,
            track_title: row.get(1)?,
            artist_name: row.get(2)?,
            album_title: row.get(3)?,
            genre_title: row.get(4)?,
            language_name: row.get(5)?,
            genres_list: multi(6)?,
            tags_list: multi(7)?,
            languages_list: multi(8)?,
            major_genre: row.get(9)?,
            track_duration: row.get(10)?,
            track_interest: row.get(11)?,
            track_composer: row.get(12)?,
        })
    }
}

impl CatalogSource for SqliteCatalogSource {
    fn load_tracks(&self) -> Result<Vec<TrackRecord>> {
        let conn = self
            .conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut stmt = conn.prepare(SELECT_TRACKS)?;
        let tracks = stmt
            .query_map([], Self::row_to_track)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read track_features")?;
        Ok(tracks)
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("sqlite catalog {:?}", path),
            None => "in-memory sqlite catalog".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<TrackRecord> {
        vec![
            TrackRecord::new("t2")
                .with_title("Second")
                .with_artist("B")
                .with_genres(vec!["jazz".to_string(), "blues".to_string()]),
            TrackRecord::new("t1")
                .with_title("First")
                .with_artist("A")
                .with_genres("rock|pop")
                .with_major_genre("Rock"),
        ]
    }

    #[test]
    fn test_round_trip_keeps_insert_order() {
        let source = SqliteCatalogSource::in_memory().unwrap();
        assert_eq!(source.insert_tracks(&sample()).unwrap(), 2);

        let tracks = source.load_tracks().unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].track_id, "t2");
        assert_eq!(
            tracks[0].genres_list,
            Some(MultiValue::Delimited("jazz|blues".to_string()))
        );
        assert_eq!(tracks[1].major_genre.as_deref(), Some("Rock"));
        assert!(tracks[1].album_title.is_none());
    }

    #[test]
    fn test_open_creates_and_reopens_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.db");
        {
            let source = SqliteCatalogSource::open(&path).unwrap();
            source.insert_tracks(&sample()).unwrap();
        }
        let reopened = SqliteCatalogSource::open(&path).unwrap();
        assert_eq!(reopened.count().unwrap(), 2);
        assert!(reopened.describe().contains("catalog.db"));
    }

    #[test]
    fn test_open_rejects_foreign_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute("CREATE TABLE something (x TEXT)", []).unwrap();
        }
        assert!(SqliteCatalogSource::open(&path).is_err());
    }
}
