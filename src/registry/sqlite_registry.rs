use super::{PlaylistRegistry, TrackedPlaylist};
use crate::sqlite_persistence::SharedConnection;
use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::MutexGuard;
use tracing::info;

/// Playlist registry stored in the `tracked_playlists` table.
#[derive(Clone)]
pub struct SqlitePlaylistRegistry {
    conn: SharedConnection,
}

impl SqlitePlaylistRegistry {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Registry connection lock poisoned"))
    }
}

impl PlaylistRegistry for SqlitePlaylistRegistry {
    fn list(&self) -> Result<Vec<TrackedPlaylist>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT playlist_id, name FROM tracked_playlists ORDER BY position ASC")?;
        let playlists = stmt
            .query_map([], |row| {
                Ok(TrackedPlaylist {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(playlists)
    }

    fn add(&self, playlist_id: &str, name: Option<&str>) -> Result<bool> {
        let conn = self.lock()?;
        let existing: Option<i64> = conn
            .query_row(
                "SELECT position FROM tracked_playlists WHERE playlist_id = ?1",
                params![playlist_id],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Ok(false);
        }

        conn.execute(
            "INSERT INTO tracked_playlists (playlist_id, name) VALUES (?1, ?2)",
            params![playlist_id, name],
        )?;
        info!("Now tracking playlist {}", playlist_id);
        Ok(true)
    }

    fn remove(&self, playlist_id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM tracked_playlists WHERE playlist_id = ?1",
            params![playlist_id],
        )?;
        if deleted > 0 {
            info!("Stopped tracking playlist {}", playlist_id);
        }
        Ok(deleted > 0)
    }

    fn set_name(&self, playlist_id: &str, name: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE tracked_playlists SET name = ?2 WHERE playlist_id = ?1",
            params![playlist_id, name],
        )?;
        Ok(())
    }
}
