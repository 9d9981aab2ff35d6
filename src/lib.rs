//! Playlist Tracker Library
//!
//! Tracks remote playlists, detects track and metadata changes between
//! polling passes and reports them as change events.

pub mod background_jobs;
pub mod bot;
pub mod config;
pub mod events;
pub mod fetcher;
pub mod metadata;
pub mod notifier;
pub mod registry;
pub mod server;
pub mod snapshot_store;
pub mod sqlite_persistence;
pub mod tracker;
pub mod tracks;

// Re-export commonly used types for convenience
pub use events::{ChangeEvent, MetadataField};
pub use fetcher::{FetchError, FetchedPlaylist, PlaylistFetcher, RawMetadata};
pub use notifier::{LogNotifier, Notifier, NotifyError};
pub use registry::{PlaylistRegistry, SqlitePlaylistRegistry, TrackedPlaylist};
pub use server::run_server;
pub use snapshot_store::{SnapshotStore, SqliteSnapshotStore};
pub use tracker::{PassSummary, PlaylistTracker, TrackerService, TrackerSettings};
