//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestHarness, PLAYLIST_1_ID};
//!
//! #[tokio::test]
//! async fn test_first_check() {
//!     let harness = TestHarness::new();
//!     harness.track(PLAYLIST_1_ID).await;
//!     harness.fetcher.set_tracks(PLAYLIST_1_ID, &["a", "b"]);
//!     let summary = harness.check().await;
//!     assert!(summary.any_change_detected);
//! }
//! ```

mod constants;
mod fakes;
mod harness;

pub use constants::*;
pub use fakes::{FakeFetcher, RecordingNotifier};
pub use harness::{TestHarness, TestServer};
