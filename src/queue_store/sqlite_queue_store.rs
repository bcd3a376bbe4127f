use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use super::models::{NewTrack, Track, TrackStatus, VenueSetting, VenueSettingUpdate};
use super::QueueStore;
use crate::provider::Service;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tracks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    track_id TEXT NOT NULL,
    service TEXT NOT NULL,
    title TEXT NOT NULL,
    artist TEXT NOT NULL,
    album TEXT,
    duration INTEGER NOT NULL,
    thumbnail_url TEXT,
    requested_by TEXT NOT NULL,
    requested_at TEXT NOT NULL,
    position INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending'
);

CREATE INDEX IF NOT EXISTS idx_tracks_status_position ON tracks (status, position);

CREATE TABLE IF NOT EXISTS venue_settings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    service_name TEXT NOT NULL UNIQUE,
    is_active INTEGER NOT NULL DEFAULT 0,
    auth_token TEXT,
    last_updated TEXT NOT NULL
);
";

/// Services enabled out of the box. Apple stays off until a developer
/// token is configured.
const DEFAULT_SETTINGS: &[(Service, bool)] = &[
    (Service::Spotify, true),
    (Service::Youtube, true),
    (Service::Apple, false),
];

pub struct SqliteQueueStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteQueueStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        if !path.exists() {
            info!("Creating new queue database at {:?}", path);
        }
        let conn = Connection::open(path).context("Failed to open queue database")?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Failed to initialize queue database schema")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("Queue database lock poisoned"))
    }

    fn row_to_track(row: &rusqlite::Row) -> rusqlite::Result<Track> {
        let service_str: String = row.get("service")?;
        let status_str: String = row.get("status")?;
        let requested_at_str: String = row.get("requested_at")?;

        Ok(Track {
            id: row.get("id")?,
            track_id: row.get("track_id")?,
            service: Service::parse(&service_str).unwrap_or(Service::Spotify),
            title: row.get("title")?,
            artist: row.get("artist")?,
            album: row.get("album")?,
            duration: row.get("duration")?,
            thumbnail_url: row.get("thumbnail_url")?,
            requested_by: row.get("requested_by")?,
            requested_at: DateTime::parse_from_rfc3339(&requested_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            position: row.get("position")?,
            status: TrackStatus::parse(&status_str).unwrap_or(TrackStatus::Pending),
        })
    }

    fn row_to_setting(row: &rusqlite::Row) -> rusqlite::Result<VenueSetting> {
        let last_updated_str: String = row.get("last_updated")?;

        Ok(VenueSetting {
            id: row.get("id")?,
            service_name: row.get("service_name")?,
            is_active: row.get("is_active")?,
            auth_token: row.get("auth_token")?,
            last_updated: DateTime::parse_from_rfc3339(&last_updated_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

impl QueueStore for SqliteQueueStore {
    fn create_track(&self, track: &NewTrack, position: i64) -> Result<Track> {
        let conn = self.lock_conn()?;
        let requested_at = Utc::now();
        conn.execute(
            "INSERT INTO tracks (track_id, service, title, artist, album, duration,
                                 thumbnail_url, requested_by, requested_at, position, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                track.track_id,
                track.service.as_str(),
                track.title,
                track.artist,
                track.album,
                track.duration,
                track.thumbnail_url,
                track.requested_by,
                requested_at.to_rfc3339(),
                position,
                TrackStatus::Pending.as_str(),
            ],
        )?;
        let id = conn.last_insert_rowid();

        Ok(Track {
            id,
            track_id: track.track_id.clone(),
            service: track.service,
            title: track.title.clone(),
            artist: track.artist.clone(),
            album: track.album.clone(),
            duration: track.duration,
            thumbnail_url: track.thumbnail_url.clone(),
            requested_by: track.requested_by.clone(),
            requested_at,
            position,
            status: TrackStatus::Pending,
        })
    }

    fn get_track(&self, id: i64) -> Result<Option<Track>> {
        let conn = self.lock_conn()?;
        let track = conn
            .query_row(
                "SELECT * FROM tracks WHERE id = ?1",
                params![id],
                Self::row_to_track,
            )
            .optional()?;
        Ok(track)
    }

    fn get_pending_tracks(&self) -> Result<Vec<Track>> {
        let conn = self.lock_conn()?;
        let mut stmt =
            conn.prepare("SELECT * FROM tracks WHERE status = 'pending' ORDER BY position ASC")?;
        let tracks = stmt
            .query_map([], Self::row_to_track)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tracks)
    }

    fn update_track_status(&self, id: i64, status: TrackStatus) -> Result<Option<Track>> {
        {
            let conn = self.lock_conn()?;
            let updated = conn.execute(
                "UPDATE tracks SET status = ?1 WHERE id = ?2",
                params![status.as_str(), id],
            )?;
            if updated == 0 {
                return Ok(None);
            }
        }
        self.get_track(id)
    }

    fn set_positions(&self, track_ids: &[i64]) -> Result<()> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        for (position, id) in track_ids.iter().enumerate() {
            tx.execute(
                "UPDATE tracks SET position = ?1 WHERE id = ?2",
                params![position as i64, id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_track(&self, id: i64) -> Result<bool> {
        let conn = self.lock_conn()?;
        let deleted = conn.execute("DELETE FROM tracks WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    fn clear_pending(&self) -> Result<usize> {
        let conn = self.lock_conn()?;
        let deleted = conn.execute("DELETE FROM tracks WHERE status = 'pending'", [])?;
        Ok(deleted)
    }

    fn renumber_pending(&self) -> Result<()> {
        let ids = {
            let conn = self.lock_conn()?;
            let mut stmt = conn
                .prepare("SELECT id FROM tracks WHERE status = 'pending' ORDER BY position ASC")?;
            let ids = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<i64>>>()?;
            ids
        };
        self.set_positions(&ids)
    }

    fn get_venue_setting(&self, service_name: &str) -> Result<Option<VenueSetting>> {
        let conn = self.lock_conn()?;
        let setting = conn
            .query_row(
                "SELECT * FROM venue_settings WHERE service_name = ?1",
                params![service_name],
                Self::row_to_setting,
            )
            .optional()?;
        Ok(setting)
    }

    fn get_all_venue_settings(&self) -> Result<Vec<VenueSetting>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare("SELECT * FROM venue_settings ORDER BY service_name ASC")?;
        let settings = stmt
            .query_map([], Self::row_to_setting)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(settings)
    }

    fn update_venue_setting(
        &self,
        service_name: &str,
        update: &VenueSettingUpdate,
    ) -> Result<Option<VenueSetting>> {
        {
            let conn = self.lock_conn()?;
            let updated = conn.execute(
                "UPDATE venue_settings
                 SET is_active = COALESCE(?1, is_active),
                     auth_token = COALESCE(?2, auth_token),
                     last_updated = ?3
                 WHERE service_name = ?4",
                params![
                    update.is_active,
                    update.auth_token,
                    Utc::now().to_rfc3339(),
                    service_name
                ],
            )?;
            if updated == 0 {
                return Ok(None);
            }
        }
        self.get_venue_setting(service_name)
    }

    fn seed_default_settings(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM venue_settings", [], |row| {
            row.get(0)
        })?;
        if count > 0 {
            return Ok(());
        }

        info!("Seeding default venue settings");
        for (service, is_active) in DEFAULT_SETTINGS {
            conn.execute(
                "INSERT INTO venue_settings (service_name, is_active, auth_token, last_updated)
                 VALUES (?1, ?2, NULL, ?3)",
                params![service.as_str(), is_active, Utc::now().to_rfc3339()],
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn new_track(track_id: &str, title: &str) -> NewTrack {
        NewTrack {
            track_id: track_id.to_string(),
            service: Service::Spotify,
            title: title.to_string(),
            artist: "Artist".to_string(),
            album: None,
            duration: 200,
            thumbnail_url: None,
            requested_by: "tester".to_string(),
        }
    }

    #[test]
    fn creates_and_reads_back_tracks() {
        let store = SqliteQueueStore::open_in_memory().unwrap();
        let created = store.create_track(&new_track("spotify_1", "One"), 0).unwrap();

        let fetched = store.get_track(created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.status, TrackStatus::Pending);
        assert_eq!(fetched.position, 0);
    }

    #[test]
    fn persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("queue.db");

        {
            let store = SqliteQueueStore::new(&db_path).unwrap();
            store.create_track(&new_track("spotify_1", "One"), 0).unwrap();
        }

        let store = SqliteQueueStore::new(&db_path).unwrap();
        let pending = store.get_pending_tracks().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].title, "One");
    }

    #[test]
    fn pending_tracks_ordered_by_position() {
        let store = SqliteQueueStore::open_in_memory().unwrap();
        store.create_track(&new_track("a", "A"), 1).unwrap();
        store.create_track(&new_track("b", "B"), 0).unwrap();
        store.create_track(&new_track("c", "C"), 2).unwrap();

        let titles: Vec<String> = store
            .get_pending_tracks()
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["B", "A", "C"]);
    }

    #[test]
    fn status_update_excludes_track_from_pending() {
        let store = SqliteQueueStore::open_in_memory().unwrap();
        let track = store.create_track(&new_track("a", "A"), 0).unwrap();

        let updated = store
            .update_track_status(track.id, TrackStatus::Playing)
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, TrackStatus::Playing);
        assert!(store.get_pending_tracks().unwrap().is_empty());

        assert!(store
            .update_track_status(999, TrackStatus::Played)
            .unwrap()
            .is_none());
    }

    #[test]
    fn renumber_restores_contiguous_positions() {
        let store = SqliteQueueStore::open_in_memory().unwrap();
        let a = store.create_track(&new_track("a", "A"), 0).unwrap();
        store.create_track(&new_track("b", "B"), 1).unwrap();
        store.create_track(&new_track("c", "C"), 2).unwrap();

        store.delete_track(a.id).unwrap();
        store.renumber_pending().unwrap();

        let pending = store.get_pending_tracks().unwrap();
        let positions: Vec<i64> = pending.iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![0, 1]);
        assert_eq!(pending[0].title, "B");
    }

    #[test]
    fn renumber_after_consuming_a_track() {
        let store = SqliteQueueStore::open_in_memory().unwrap();
        let a = store.create_track(&new_track("a", "A"), 0).unwrap();
        store.create_track(&new_track("b", "B"), 1).unwrap();
        store.create_track(&new_track("c", "C"), 2).unwrap();

        store.update_track_status(a.id, TrackStatus::Playing).unwrap();
        store.renumber_pending().unwrap();

        let positions: Vec<i64> = store
            .get_pending_tracks()
            .unwrap()
            .iter()
            .map(|t| t.position)
            .collect();
        assert_eq!(positions, vec![0, 1]);
    }

    #[test]
    fn set_positions_reorders() {
        let store = SqliteQueueStore::open_in_memory().unwrap();
        let a = store.create_track(&new_track("a", "A"), 0).unwrap();
        let b = store.create_track(&new_track("b", "B"), 1).unwrap();
        let c = store.create_track(&new_track("c", "C"), 2).unwrap();

        store.set_positions(&[c.id, a.id, b.id]).unwrap();

        let titles: Vec<String> = store
            .get_pending_tracks()
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["C", "A", "B"]);
    }

    #[test]
    fn clear_pending_leaves_non_pending_rows() {
        let store = SqliteQueueStore::open_in_memory().unwrap();
        let playing = store.create_track(&new_track("a", "A"), 0).unwrap();
        store
            .update_track_status(playing.id, TrackStatus::Playing)
            .unwrap();
        store.create_track(&new_track("b", "B"), 0).unwrap();
        store.create_track(&new_track("c", "C"), 1).unwrap();

        assert_eq!(store.clear_pending().unwrap(), 2);
        assert!(store.get_pending_tracks().unwrap().is_empty());
        assert!(store.get_track(playing.id).unwrap().is_some());
    }

    #[test]
    fn seeds_default_settings_once() {
        let store = SqliteQueueStore::open_in_memory().unwrap();
        store.seed_default_settings().unwrap();
        store.seed_default_settings().unwrap();

        let settings = store.get_all_venue_settings().unwrap();
        assert_eq!(settings.len(), 3);

        let spotify = store.get_venue_setting("spotify").unwrap().unwrap();
        assert!(spotify.is_active);
        let apple = store.get_venue_setting("apple").unwrap().unwrap();
        assert!(!apple.is_active);
    }

    #[test]
    fn partial_setting_update_keeps_other_fields() {
        let store = SqliteQueueStore::open_in_memory().unwrap();
        store.seed_default_settings().unwrap();

        let updated = store
            .update_venue_setting(
                "apple",
                &VenueSettingUpdate {
                    is_active: None,
                    auth_token: Some("token".to_string()),
                },
            )
            .unwrap()
            .unwrap();
        assert!(!updated.is_active);
        assert_eq!(updated.auth_token.as_deref(), Some("token"));

        assert!(store
            .update_venue_setting("tidal", &VenueSettingUpdate::default())
            .unwrap()
            .is_none());
    }
}
