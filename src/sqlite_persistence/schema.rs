//! Schema definition for the tracker database.

use super::versioned_schema::{Column, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP};
use crate::sqlite_column;

const TRACK_SNAPSHOTS_TABLE_V_0: Table = Table {
    name: "track_snapshots",
    columns: &[
        sqlite_column!("playlist_id", &SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!("payload", &SqlType::Text, non_null = true),
        sqlite_column!(
            "updated_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
};

const PLAYLIST_METADATA_TABLE_V_0: Table = Table {
    name: "playlist_metadata",
    columns: &[
        sqlite_column!("playlist_id", &SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!("payload", &SqlType::Text, non_null = true),
        sqlite_column!(
            "updated_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
};

const TRACKED_PLAYLISTS_TABLE_V_0: Table = Table {
    name: "tracked_playlists",
    columns: &[
        sqlite_column!("position", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("playlist_id", &SqlType::Text, non_null = true),
        sqlite_column!("name", &SqlType::Text),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_tracked_playlists_playlist_id", "playlist_id")],
};

pub const TRACKER_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        TRACK_SNAPSHOTS_TABLE_V_0,
        PLAYLIST_METADATA_TABLE_V_0,
        TRACKED_PLAYLISTS_TABLE_V_0,
    ],
    migration: None,
}];
