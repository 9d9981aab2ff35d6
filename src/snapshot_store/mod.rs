//! Persistence of playlist track snapshots and metadata records.

pub mod models;
mod store;
mod trait_def;

pub use models::*;
pub use store::SqliteSnapshotStore;
pub use trait_def::SnapshotStore;
