//! Spotify Web API client using the client-credentials flow.

use super::models::{FetchedPlaylist, RawMetadata};
use super::{FetchError, PlaylistFetcher};
use crate::snapshot_store::TrackRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

const SPOTIFY_ACCOUNTS_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";

/// Tokens are refreshed this long before Spotify would expire them.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Upper bound on followed `next` links, to stay clear of paging loops.
const MAX_TRACK_PAGES: usize = 100;

const UNAVAILABLE_TRACK_NAME: &str = "Unavailable Track";
const UNKNOWN_ARTIST_NAME: &str = "Unknown Artist";

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

pub struct SpotifyClient {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<CachedToken>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct PlaylistResponse {
    id: String,
    name: String,
    description: Option<String>,
    images: Option<Vec<ImageObject>>,
    snapshot_id: String,
    tracks: TracksPage,
}

#[derive(Deserialize)]
struct ImageObject {
    url: String,
}

#[derive(Deserialize)]
struct TracksPage {
    items: Vec<PlaylistItem>,
    next: Option<String>,
}

#[derive(Deserialize)]
struct PlaylistItem {
    added_at: Option<DateTime<Utc>>,
    track: Option<TrackObject>,
}

#[derive(Deserialize)]
struct TrackObject {
    id: Option<String>,
    name: Option<String>,
    artists: Option<Vec<ArtistObject>>,
    external_urls: Option<ExternalUrls>,
}

#[derive(Deserialize)]
struct ArtistObject {
    name: String,
}

#[derive(Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

/// Map a playlist item to a track, dropping items without a track id.
fn convert_item(item: PlaylistItem) -> Option<TrackRecord> {
    let track = item.track?;
    let id = track.id.filter(|id| !id.is_empty())?;

    let artist = track
        .artists
        .map(|artists| {
            artists
                .into_iter()
                .map(|a| a.name)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .filter(|joined| !joined.is_empty())
        .unwrap_or_else(|| UNKNOWN_ARTIST_NAME.to_string());

    Some(TrackRecord {
        id,
        name: track
            .name
            .unwrap_or_else(|| UNAVAILABLE_TRACK_NAME.to_string()),
        artist,
        added_at: item.added_at,
        url: track.external_urls.and_then(|urls| urls.spotify),
    })
}

fn convert_items(items: Vec<PlaylistItem>, out: &mut Vec<TrackRecord>) {
    let total = items.len();
    let before = out.len();
    out.extend(items.into_iter().filter_map(convert_item));
    let dropped = total - (out.len() - before);
    if dropped > 0 {
        debug!("Dropped {} playlist items without a track id", dropped);
    }
}

impl SpotifyClient {
    pub fn new(client_id: String, client_secret: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            client_id,
            client_secret,
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, FetchError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.access_token.clone());
            }
        }

        let response = self
            .client
            .post(SPOTIFY_ACCOUNTS_TOKEN_URL)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| FetchError::Connection(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(FetchError::Unauthorized(format!(
                "Token request failed with status {}",
                response.status()
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| FetchError::InvalidResponse(format!("Token response: {}", e)))?;

        let lifetime = Duration::from_secs(body.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *cached = Some(CachedToken {
            access_token: body.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        debug!("Obtained Spotify access token valid for {:?}", lifetime);

        Ok(body.access_token)
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        playlist_id: &str,
    ) -> Result<T, FetchError> {
        let mut retried = false;
        loop {
            let token = self.access_token().await?;
            let response = self
                .client
                .get(url)
                .bearer_auth(&token)
                .send()
                .await
                .map_err(|e| FetchError::Connection(e.to_string()))?;

            match response.status() {
                status if status.is_success() => {
                    return response
                        .json()
                        .await
                        .map_err(|e| FetchError::InvalidResponse(e.to_string()));
                }
                StatusCode::UNAUTHORIZED if !retried => {
                    warn!("Spotify rejected the access token, requesting a new one");
                    self.invalidate_token().await;
                    retried = true;
                }
                StatusCode::UNAUTHORIZED => {
                    self.invalidate_token().await;
                    return Err(FetchError::Unauthorized(playlist_id.to_string()));
                }
                StatusCode::NOT_FOUND => {
                    return Err(FetchError::NotFound(playlist_id.to_string()));
                }
                status => {
                    return Err(FetchError::Status {
                        playlist_id: playlist_id.to_string(),
                        status: status.as_u16(),
                    });
                }
            }
        }
    }
}

/// Fail the fetch past `MAX_TRACK_PAGES`. A partial track list must never
/// reach the reconciler.
fn ensure_page_limit(playlist_id: &str, pages_read: usize) -> Result<(), FetchError> {
    if pages_read >= MAX_TRACK_PAGES {
        warn!(
            "Playlist {} has more than {} track pages, skipping it",
            playlist_id, MAX_TRACK_PAGES
        );
        return Err(FetchError::InvalidResponse(format!(
            "playlist {} exceeds {} track pages",
            playlist_id, MAX_TRACK_PAGES
        )));
    }
    Ok(())
}

#[async_trait]
impl PlaylistFetcher for SpotifyClient {
    async fn fetch_playlist(&self, playlist_id: &str) -> Result<FetchedPlaylist, FetchError> {
        let url = format!("{}/playlists/{}", SPOTIFY_API_BASE, playlist_id);
        let playlist: PlaylistResponse = self.get_json(&url, playlist_id).await?;

        let mut tracks = Vec::with_capacity(playlist.tracks.items.len());
        convert_items(playlist.tracks.items, &mut tracks);

        let mut next = playlist.tracks.next;
        let mut pages = 1;
        while let Some(next_url) = next {
            ensure_page_limit(playlist_id, pages)?;
            let page: TracksPage = self.get_json(&next_url, playlist_id).await?;
            convert_items(page.items, &mut tracks);
            next = page.next;
            pages += 1;
        }

        Ok(FetchedPlaylist {
            metadata: RawMetadata {
                id: playlist.id,
                name: playlist.name,
                description: playlist.description.unwrap_or_default(),
                image_url: playlist
                    .images
                    .and_then(|images| images.into_iter().next())
                    .map(|image| image.url),
                snapshot_token: playlist.snapshot_id,
            },
            tracks,
        })
    }
}
