//! Track set reconciliation between a stored snapshot and a fresh fetch.

mod reconciler;

pub use reconciler::{reconcile_tracks, TrackReconciliation};
