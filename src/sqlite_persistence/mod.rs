//! SQLite plumbing shared by the snapshot store and the playlist registry.
//!
//! Both live in the same `tracker.db` file; each store receives a clone of the
//! shared connection handle.

mod schema;
mod versioned_schema;

pub use schema::TRACKER_VERSIONED_SCHEMAS;
pub use versioned_schema::{open_versioned, VersionedSchema, BASE_DB_VERSION};

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Connection handle shared between stores backed by the tracker database.
pub type SharedConnection = Arc<Mutex<Connection>>;

/// Open the tracker database at `db_path`, creating or migrating it as needed.
pub fn open_tracker_db<P: AsRef<Path>>(db_path: P) -> Result<SharedConnection> {
    let conn = open_versioned(db_path, TRACKER_VERSIONED_SCHEMAS)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// Create an in-memory tracker database with the latest schema.
pub fn in_memory_tracker_db() -> Result<SharedConnection> {
    let conn = Connection::open_in_memory()?;
    TRACKER_VERSIONED_SCHEMAS
        .last()
        .context("No schemas defined")?
        .create(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}
