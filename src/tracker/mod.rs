//! Change event assembly for tracked playlists.
//!
//! [`PlaylistTracker`] runs the per-playlist diff; [`TrackerService`] wraps it
//! with the registry and the notifier and makes sure only one pass runs at a
//! time.

mod assembler;
mod service;

pub use assembler::{EntityError, EntityOutcome, PassReport, PlaylistTracker, TrackerSettings};
pub use service::{PassSummary, TrackerService};
