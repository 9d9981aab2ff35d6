//! SQLite snapshot store implementation.

use super::models::{MetadataRecord, PlaylistSnapshot};
use super::trait_def::SnapshotStore;
use crate::sqlite_persistence::SharedConnection;
use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use std::sync::MutexGuard;
use tracing::warn;

const TRACK_SNAPSHOTS: &str = "track_snapshots";
const PLAYLIST_METADATA: &str = "playlist_metadata";

/// Snapshot store keeping one JSON document per playlist and record kind.
#[derive(Clone)]
pub struct SqliteSnapshotStore {
    conn: SharedConnection,
}

impl SqliteSnapshotStore {
    /// Create a store on top of an already initialized tracker database.
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Snapshot store connection lock poisoned"))
    }

    /// Read and decode a payload, dropping the row if it cannot be decoded.
    fn load_payload<T: DeserializeOwned>(
        conn: &Connection,
        table: &str,
        playlist_id: &str,
    ) -> Result<Option<T>> {
        let payload: Option<String> = conn
            .query_row(
                &format!("SELECT payload FROM {} WHERE playlist_id = ?1", table),
                params![playlist_id],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("Failed to read {} for {}", table, playlist_id))?;

        let Some(payload) = payload else {
            return Ok(None);
        };

        match serde_json::from_str(&payload) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(
                    "Corrupt {} record for playlist {}, resetting it: {}",
                    table, playlist_id, e
                );
                conn.execute(
                    &format!("DELETE FROM {} WHERE playlist_id = ?1", table),
                    params![playlist_id],
                )?;
                Ok(None)
            }
        }
    }

    fn write_payload(conn: &Connection, table: &str, playlist_id: &str, payload: &str) -> Result<()> {
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {} (playlist_id, payload, updated_at) VALUES (?1, ?2, ?3)",
                table
            ),
            params![playlist_id, payload, chrono::Utc::now().timestamp()],
        )
        .with_context(|| format!("Failed to write {} for {}", table, playlist_id))?;
        Ok(())
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    fn load_track_snapshot(&self, playlist_id: &str) -> Result<PlaylistSnapshot> {
        let conn = self.lock()?;
        Ok(Self::load_payload(&conn, TRACK_SNAPSHOTS, playlist_id)?.unwrap_or_default())
    }

    fn save_track_snapshot(&self, playlist_id: &str, snapshot: &PlaylistSnapshot) -> Result<()> {
        let payload = serde_json::to_string(snapshot)?;
        let conn = self.lock()?;
        Self::write_payload(&conn, TRACK_SNAPSHOTS, playlist_id, &payload)
    }

    fn load_metadata(&self, playlist_id: &str) -> Result<Option<MetadataRecord>> {
        let conn = self.lock()?;
        Self::load_payload(&conn, PLAYLIST_METADATA, playlist_id)
    }

    fn save_metadata(&self, playlist_id: &str, record: &MetadataRecord) -> Result<()> {
        let payload = serde_json::to_string(record)?;
        let conn = self.lock()?;
        Self::write_payload(&conn, PLAYLIST_METADATA, playlist_id, &payload)
    }

    fn save_entity(
        &self,
        playlist_id: &str,
        metadata: &MetadataRecord,
        snapshot: &PlaylistSnapshot,
    ) -> Result<()> {
        let metadata_payload = serde_json::to_string(metadata)?;
        let snapshot_payload = serde_json::to_string(snapshot)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        Self::write_payload(&tx, PLAYLIST_METADATA, playlist_id, &metadata_payload)?;
        Self::write_payload(&tx, TRACK_SNAPSHOTS, playlist_id, &snapshot_payload)?;
        tx.commit()
            .with_context(|| format!("Failed to commit snapshots for {}", playlist_id))?;
        Ok(())
    }

    fn forget_entity(&self, playlist_id: &str) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM track_snapshots WHERE playlist_id = ?1",
            params![playlist_id],
        )?;
        tx.execute(
            "DELETE FROM playlist_metadata WHERE playlist_id = ?1",
            params![playlist_id],
        )?;
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot_store::TrackRecord;
    use crate::sqlite_persistence::in_memory_tracker_db;
    use chrono::{TimeZone, Utc};

    fn create_test_store() -> (SqliteSnapshotStore, SharedConnection) {
        let conn = in_memory_tracker_db().unwrap();
        (SqliteSnapshotStore::new(conn.clone()), conn)
    }

    fn track(id: &str) -> TrackRecord {
        TrackRecord {
            id: id.to_string(),
            name: format!("Song {}", id),
            artist: "Someone".to_string(),
            added_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()),
            url: Some(format!("https://open.spotify.com/track/{}", id)),
        }
    }

    fn snapshot(ids: &[&str]) -> PlaylistSnapshot {
        PlaylistSnapshot {
            track_ids: ids.iter().map(|id| id.to_string()).collect(),
            track_details: ids.iter().map(|id| (id.to_string(), track(id))).collect(),
        }
    }

    fn metadata(name: &str) -> MetadataRecord {
        MetadataRecord {
            id: "pl1".to_string(),
            name: name.to_string(),
            description: "desc".to_string(),
            image_base_url: Some("https://i.scdn.co/image/abc".to_string()),
            image_content_id: Some("abc".to_string()),
            image_last_checked_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            snapshot_token: "s1".to_string(),
        }
    }

    #[test]
    fn test_missing_snapshot_is_empty() {
        let (store, _) = create_test_store();
        let loaded = store.load_track_snapshot("nope").unwrap();
        assert!(loaded.track_ids.is_empty());
        assert!(loaded.track_details.is_empty());
        assert!(store.load_metadata("nope").unwrap().is_none());
    }

    #[test]
    fn test_save_and_load_track_snapshot() {
        let (store, _) = create_test_store();
        let saved = snapshot(&["a", "b"]);
        store.save_track_snapshot("pl1", &saved).unwrap();

        let loaded = store.load_track_snapshot("pl1").unwrap();
        assert_eq!(loaded, saved);
        assert_eq!(loaded.track_ids, vec!["a", "b"]);
    }

    #[test]
    fn test_save_replaces_whole_record() {
        let (store, _) = create_test_store();
        store.save_track_snapshot("pl1", &snapshot(&["a", "b"])).unwrap();
        store.save_track_snapshot("pl1", &snapshot(&["c"])).unwrap();

        let loaded = store.load_track_snapshot("pl1").unwrap();
        assert_eq!(loaded.track_ids, vec!["c"]);
        assert_eq!(loaded.track_details.len(), 1);
    }

    #[test]
    fn test_corrupt_snapshot_resets_to_empty() {
        let (store, conn) = create_test_store();
        conn.lock()
            .unwrap()
            .execute(
                "INSERT INTO track_snapshots (playlist_id, payload) VALUES ('pl1', '{not json')",
                [],
            )
            .unwrap();

        let loaded = store.load_track_snapshot("pl1").unwrap();
        assert!(loaded.track_ids.is_empty());

        let remaining: i64 = conn
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM track_snapshots", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn test_corrupt_metadata_is_absent() {
        let (store, conn) = create_test_store();
        conn.lock()
            .unwrap()
            .execute(
                "INSERT INTO playlist_metadata (playlist_id, payload) VALUES ('pl1', '[]')",
                [],
            )
            .unwrap();

        assert!(store.load_metadata("pl1").unwrap().is_none());
    }

    #[test]
    fn test_save_entity_writes_both_records() {
        let (store, _) = create_test_store();
        store
            .save_entity("pl1", &metadata("Chill"), &snapshot(&["a"]))
            .unwrap();

        assert_eq!(store.load_metadata("pl1").unwrap(), Some(metadata("Chill")));
        assert_eq!(store.load_track_snapshot("pl1").unwrap(), snapshot(&["a"]));
    }

    #[test]
    fn test_forget_entity() {
        let (store, _) = create_test_store();
        store
            .save_entity("pl1", &metadata("Chill"), &snapshot(&["a"]))
            .unwrap();
        store
            .save_entity("pl2", &metadata("Other"), &snapshot(&["b"]))
            .unwrap();

        store.forget_entity("pl1").unwrap();

        assert!(store.load_metadata("pl1").unwrap().is_none());
        assert!(store.load_track_snapshot("pl1").unwrap().is_empty());
        assert!(store.load_metadata("pl2").unwrap().is_some());
    }
}
