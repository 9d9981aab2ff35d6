//! Change events produced by a reconciliation pass.

mod models;

pub use models::{ChangeEvent, MetadataField};
