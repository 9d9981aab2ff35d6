#![allow(dead_code)]

use async_trait::async_trait;
use playlist_tracker::snapshot_store::TrackRecord;
use playlist_tracker::{
    ChangeEvent, FetchError, FetchedPlaylist, Notifier, NotifyError, PlaylistFetcher, RawMetadata,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use super::constants::IMAGE_1_URL;

pub fn track(id: &str) -> TrackRecord {
    TrackRecord {
        id: id.to_string(),
        name: format!("Song {}", id),
        artist: format!("Artist {}", id),
        added_at: None,
        url: Some(format!("https://open.spotify.com/track/{}", id)),
    }
}

/// Scriptable fetcher. Playlists must be set up before they are fetched.
#[derive(Default)]
pub struct FakeFetcher {
    playlists: Mutex<HashMap<String, FetchedPlaylist>>,
    failing: Mutex<HashSet<String>>,
}

impl FakeFetcher {
    /// Set the full state of a playlist.
    pub fn set_playlist(&self, id: &str, name: &str, image_url: Option<&str>, token: &str, track_ids: &[&str]) {
        let playlist = FetchedPlaylist {
            metadata: RawMetadata {
                id: id.to_string(),
                name: name.to_string(),
                description: String::new(),
                image_url: image_url.map(str::to_string),
                snapshot_token: token.to_string(),
            },
            tracks: track_ids.iter().map(|t| track(t)).collect(),
        };
        self.playlists
            .lock()
            .unwrap()
            .insert(id.to_string(), playlist);
    }

    /// Replace the tracks of a playlist, bumping its snapshot token.
    pub fn set_tracks(&self, id: &str, track_ids: &[&str]) {
        let mut playlists = self.playlists.lock().unwrap();
        let playlist = playlists.entry(id.to_string()).or_insert_with(|| FetchedPlaylist {
            metadata: RawMetadata {
                id: id.to_string(),
                name: format!("Playlist {}", id),
                description: String::new(),
                image_url: Some(IMAGE_1_URL.to_string()),
                snapshot_token: "0".to_string(),
            },
            tracks: Vec::new(),
        });
        playlist.tracks = track_ids.iter().map(|t| track(t)).collect();
        let next = playlist.metadata.snapshot_token.parse::<u64>().unwrap_or(0) + 1;
        playlist.metadata.snapshot_token = next.to_string();
    }

    /// Change metadata without touching the snapshot token.
    pub fn update_metadata(&self, id: &str, update: impl FnOnce(&mut RawMetadata)) {
        let mut playlists = self.playlists.lock().unwrap();
        let playlist = playlists.get_mut(id).expect("playlist not set up");
        update(&mut playlist.metadata);
    }

    pub fn set_failing(&self, id: &str, failing: bool) {
        let mut set = self.failing.lock().unwrap();
        if failing {
            set.insert(id.to_string());
        } else {
            set.remove(id);
        }
    }
}

#[async_trait]
impl PlaylistFetcher for FakeFetcher {
    async fn fetch_playlist(&self, playlist_id: &str) -> Result<FetchedPlaylist, FetchError> {
        if self.failing.lock().unwrap().contains(playlist_id) {
            return Err(FetchError::Connection("simulated outage".to_string()));
        }
        self.playlists
            .lock()
            .unwrap()
            .get(playlist_id)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(playlist_id.to_string()))
    }
}

/// Notifier that keeps every batch it receives.
#[derive(Default)]
pub struct RecordingNotifier {
    batches: Mutex<Vec<Vec<ChangeEvent>>>,
    fail: Mutex<bool>,
    delay: Mutex<Option<Duration>>,
}

impl RecordingNotifier {
    pub fn batches(&self) -> Vec<Vec<ChangeEvent>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn last_batch(&self) -> Vec<ChangeEvent> {
        self.batches
            .lock()
            .unwrap()
            .last()
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    /// Make each delivery take `delay` before the batch is recorded.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, events: &[ChangeEvent]) -> Result<(), NotifyError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.batches.lock().unwrap().push(events.to_vec());
        if *self.fail.lock().unwrap() {
            return Err(NotifyError::Http("simulated outage".to_string()));
        }
        Ok(())
    }
}
