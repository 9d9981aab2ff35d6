//! Playlist fetching from the external provider.
//!
//! The reconciliation core only sees [`FetchedPlaylist`] values; everything
//! provider-specific (authentication, paging, payload shapes) stays here.

mod models;
mod spotify;

pub use models::{FetchedPlaylist, RawMetadata};
pub use spotify::SpotifyClient;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while fetching a playlist.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Playlist not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Provider returned status {status} for {playlist_id}")]
    Status { playlist_id: String, status: u16 },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Source of current playlist state.
#[async_trait]
pub trait PlaylistFetcher: Send + Sync {
    /// Fetch metadata and tracks of a playlist.
    ///
    /// Implementations apply their own timeout policy and drop tracks that
    /// have no id.
    async fn fetch_playlist(&self, playlist_id: &str) -> Result<FetchedPlaylist, FetchError>;
}
