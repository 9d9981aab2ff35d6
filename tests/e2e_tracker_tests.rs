//! End-to-end tests for tracking passes over a file-backed database.

mod common;

use common::{
    TestHarness, TestServer, IMAGE_1_URL, IMAGE_2_URL, PLAYLIST_1_ID, PLAYLIST_1_NAME,
    PLAYLIST_2_ID, PLAYLIST_2_NAME, WEBHOOK_SECRET,
};
use playlist_tracker::{ChangeEvent, MetadataField, TrackerSettings};
use reqwest::StatusCode;
use std::time::Duration;

fn track_ids(event: &ChangeEvent) -> Vec<String> {
    match event {
        ChangeEvent::TracksAdded { tracks, .. } | ChangeEvent::TracksRemoved { tracks, .. } => {
            tracks.iter().map(|t| t.id.clone()).collect()
        }
        ChangeEvent::MetadataChanged { .. } => Vec::new(),
    }
}

#[tokio::test]
async fn test_first_check_reports_every_track_as_added() {
    let harness = TestHarness::new();
    harness.track(PLAYLIST_1_ID).await;
    harness
        .fetcher
        .set_playlist(PLAYLIST_1_ID, PLAYLIST_1_NAME, Some(IMAGE_1_URL), "s1", &["a", "b", "c"]);

    let summary = harness.check().await;

    assert_eq!(summary.entities_processed, 1);
    assert!(summary.any_change_detected);
    let events = harness.notifier.last_batch();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind(), "tracks_added");
    assert_eq!(track_ids(&events[0]), vec!["a", "b", "c"]);
    assert_eq!(events[0].playlist_name(), PLAYLIST_1_NAME);
}

#[tokio::test]
async fn test_unchanged_playlist_is_quiet() {
    let harness = TestHarness::new();
    harness.track(PLAYLIST_1_ID).await;
    harness
        .fetcher
        .set_playlist(PLAYLIST_1_ID, PLAYLIST_1_NAME, Some(IMAGE_1_URL), "s1", &["a", "b"]);
    harness.check().await;

    let summary = harness.check().await;

    assert!(!summary.any_change_detected);
    assert_eq!(summary.events, 0);
    // Only the first pass produced something to deliver
    assert_eq!(harness.notifier.batches().len(), 1);
}

#[tokio::test]
async fn test_added_and_removed_tracks() {
    let harness = TestHarness::new();
    harness.track(PLAYLIST_1_ID).await;
    harness
        .fetcher
        .set_playlist(PLAYLIST_1_ID, PLAYLIST_1_NAME, Some(IMAGE_1_URL), "s1", &["a", "b", "c"]);
    harness.check().await;

    harness.fetcher.set_tracks(PLAYLIST_1_ID, &["b", "c", "d"]);
    let summary = harness.check().await;

    assert!(summary.any_change_detected);
    let events = harness.notifier.last_batch();
    let kinds: Vec<&str> = events.iter().map(|e| e.kind()).collect();
    assert_eq!(kinds, vec!["tracks_removed", "tracks_added"]);
    assert_eq!(track_ids(&events[0]), vec!["a"]);
    assert_eq!(track_ids(&events[1]), vec!["d"]);

    // Removed tracks keep the details captured when they were added
    match &events[0] {
        ChangeEvent::TracksRemoved { tracks, .. } => {
            assert_eq!(tracks[0].name, "Song a");
            assert_eq!(tracks[0].artist, "Artist a");
        }
        other => panic!("Unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_state_survives_restart() {
    let mut harness = TestHarness::new();
    harness.track(PLAYLIST_1_ID).await;
    harness
        .fetcher
        .set_playlist(PLAYLIST_1_ID, PLAYLIST_1_NAME, Some(IMAGE_1_URL), "s1", &["a", "b"]);
    harness.check().await;

    harness.restart();
    harness.fetcher.set_tracks(PLAYLIST_1_ID, &["a", "b", "c"]);
    harness.check().await;

    let events = harness.notifier.last_batch();
    assert_eq!(events.len(), 1);
    assert_eq!(track_ids(&events[0]), vec!["c"]);
}

#[tokio::test]
async fn test_rename_is_reported_before_track_changes() {
    let harness = TestHarness::new();
    harness.track(PLAYLIST_1_ID).await;
    harness
        .fetcher
        .set_playlist(PLAYLIST_1_ID, "Chill", Some(IMAGE_1_URL), "s1", &["a"]);
    harness.check().await;

    harness
        .fetcher
        .set_playlist(PLAYLIST_1_ID, "Chill Vibes", Some(IMAGE_1_URL), "s2", &["a", "b"]);
    harness.check().await;

    let events = harness.notifier.last_batch();
    assert_eq!(events.len(), 2);
    assert!(matches!(
        &events[0],
        ChangeEvent::MetadataChanged { field: MetadataField::Name, old_value, new_value, .. }
            if old_value.as_deref() == Some("Chill") && new_value.as_deref() == Some("Chill Vibes")
    ));
    assert_eq!(events[1].kind(), "tracks_added");
    assert_eq!(events[1].playlist_name(), "Chill Vibes");

    let playlists = harness.service.list_playlists().unwrap();
    assert_eq!(playlists[0].name.as_deref(), Some("Chill Vibes"));
}

#[tokio::test]
async fn test_image_flap_without_new_token_is_suppressed() {
    let harness = TestHarness::new();
    harness.track(PLAYLIST_1_ID).await;
    harness
        .fetcher
        .set_playlist(PLAYLIST_1_ID, PLAYLIST_1_NAME, Some(IMAGE_1_URL), "s1", &["a"]);
    harness.check().await;

    harness.fetcher.update_metadata(PLAYLIST_1_ID, |m| {
        m.image_url = Some(format!("{}?cache=2", IMAGE_2_URL));
    });
    let summary = harness.check().await;

    assert!(!summary.any_change_detected);
    assert_eq!(harness.notifier.batches().len(), 1);
}

#[tokio::test]
async fn test_image_change_with_new_token_is_reported() {
    let harness = TestHarness::new();
    harness.track(PLAYLIST_1_ID).await;
    harness
        .fetcher
        .set_playlist(PLAYLIST_1_ID, PLAYLIST_1_NAME, Some(IMAGE_1_URL), "s1", &["a"]);
    harness.check().await;

    harness
        .fetcher
        .set_playlist(PLAYLIST_1_ID, PLAYLIST_1_NAME, Some(IMAGE_2_URL), "s2", &["a"]);
    harness.check().await;

    let events = harness.notifier.last_batch();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        ChangeEvent::MetadataChanged { field: MetadataField::Image, old_value, new_value, .. }
            if old_value.as_deref() == Some(IMAGE_1_URL) && new_value.as_deref() == Some(IMAGE_2_URL)
    ));
}

#[tokio::test]
async fn test_image_change_accepted_once_window_elapsed() {
    let harness = TestHarness::with_settings(TrackerSettings {
        image_debounce: Duration::ZERO,
        ..TrackerSettings::default()
    });
    harness.track(PLAYLIST_1_ID).await;
    harness
        .fetcher
        .set_playlist(PLAYLIST_1_ID, PLAYLIST_1_NAME, Some(IMAGE_1_URL), "s1", &["a"]);
    harness.check().await;

    tokio::time::sleep(Duration::from_millis(5)).await;
    harness.fetcher.update_metadata(PLAYLIST_1_ID, |m| {
        m.image_url = Some(IMAGE_2_URL.to_string());
    });
    harness.check().await;

    let events = harness.notifier.last_batch();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind(), "metadata_changed");
}

#[tokio::test]
async fn test_failing_playlist_does_not_block_others() {
    let harness = TestHarness::new();
    harness.track(PLAYLIST_1_ID).await;
    harness.track(PLAYLIST_2_ID).await;
    harness
        .fetcher
        .set_playlist(PLAYLIST_1_ID, PLAYLIST_1_NAME, Some(IMAGE_1_URL), "s1", &["a"]);
    harness
        .fetcher
        .set_playlist(PLAYLIST_2_ID, PLAYLIST_2_NAME, None, "s1", &["x"]);
    harness.check().await;

    harness.fetcher.set_failing(PLAYLIST_1_ID, true);
    harness.fetcher.set_tracks(PLAYLIST_1_ID, &[]);
    harness.fetcher.set_tracks(PLAYLIST_2_ID, &["x", "y"]);
    let summary = harness.check().await;

    assert_eq!(summary.entities_processed, 1);
    assert_eq!(summary.failed, vec![PLAYLIST_1_ID.to_string()]);
    let events = harness.notifier.last_batch();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].playlist_id(), PLAYLIST_2_ID);

    // The skipped playlist diffs against its last good snapshot
    harness.fetcher.set_failing(PLAYLIST_1_ID, false);
    harness.fetcher.set_tracks(PLAYLIST_1_ID, &["a", "b"]);
    harness.check().await;
    let events = harness.notifier.last_batch();
    assert_eq!(events.len(), 1);
    assert_eq!(track_ids(&events[0]), vec!["b"]);
}

#[tokio::test]
async fn test_events_follow_registry_order() {
    let harness = TestHarness::new();
    harness.track(PLAYLIST_2_ID).await;
    harness.track(PLAYLIST_1_ID).await;
    harness.fetcher.set_tracks(PLAYLIST_1_ID, &["a"]);
    harness.fetcher.set_tracks(PLAYLIST_2_ID, &["x"]);

    harness.check().await;

    let ids: Vec<String> = harness
        .notifier
        .last_batch()
        .iter()
        .map(|e| e.playlist_id().to_string())
        .collect();
    assert_eq!(ids, vec![PLAYLIST_2_ID, PLAYLIST_1_ID]);
}

#[tokio::test]
async fn test_notification_failure_keeps_new_snapshot() {
    let harness = TestHarness::new();
    harness.track(PLAYLIST_1_ID).await;
    harness.fetcher.set_tracks(PLAYLIST_1_ID, &["a"]);
    harness.notifier.set_failing(true);

    let summary = harness.check().await;
    assert!(summary.notification_failed);

    harness.notifier.set_failing(false);
    let summary = harness.check().await;
    assert!(!summary.any_change_detected);
}

#[tokio::test]
async fn test_empty_fetch_suppressed_when_configured() {
    let harness = TestHarness::with_settings(TrackerSettings {
        suppress_empty_fetch: true,
        ..TrackerSettings::default()
    });
    harness.track(PLAYLIST_1_ID).await;
    harness.fetcher.set_tracks(PLAYLIST_1_ID, &["a", "b"]);
    harness.check().await;

    harness.fetcher.set_tracks(PLAYLIST_1_ID, &[]);
    let summary = harness.check().await;

    assert_eq!(summary.failed, vec![PLAYLIST_1_ID.to_string()]);
    assert!(!summary.any_change_detected);
}

#[tokio::test]
async fn test_removed_playlist_starts_over_when_tracked_again() {
    let harness = TestHarness::new();
    harness.track(PLAYLIST_1_ID).await;
    harness.fetcher.set_tracks(PLAYLIST_1_ID, &["a", "b"]);
    harness.check().await;

    assert!(harness.service.remove_playlist(PLAYLIST_1_ID).await.unwrap());
    assert!(!harness.service.remove_playlist(PLAYLIST_1_ID).await.unwrap());
    assert!(harness.service.list_playlists().unwrap().is_empty());

    harness.track(PLAYLIST_1_ID).await;
    harness.check().await;

    let events = harness.notifier.last_batch();
    assert_eq!(events.len(), 1);
    assert_eq!(track_ids(&events[0]), vec!["a", "b"]);
}

#[tokio::test]
async fn test_http_trigger_runs_check() {
    let harness = TestHarness::new();
    harness.track(PLAYLIST_1_ID).await;
    harness.fetcher.set_tracks(PLAYLIST_1_ID, &["a"]);
    let server = TestServer::spawn(&harness).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/check-playlists?token=wrong", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(harness.notifier.batches().is_empty());

    let response = client
        .get(format!(
            "{}/check-playlists?token={}",
            server.base_url, WEBHOOK_SECRET
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["entities_processed"], 1);
    assert_eq!(body["any_change_detected"], true);
    assert_eq!(harness.notifier.batches().len(), 1);
}

#[tokio::test]
async fn test_concurrent_checks_do_not_double_report() {
    let harness = TestHarness::new();
    harness.track(PLAYLIST_1_ID).await;
    harness.fetcher.set_tracks(PLAYLIST_1_ID, &["a", "b"]);

    let (first, second) = tokio::join!(harness.check(), harness.check());

    assert!(first.any_change_detected != second.any_change_detected);
    assert_eq!(harness.notifier.batches().len(), 1);
}

#[tokio::test]
async fn test_http_caller_timeout_still_delivers_events() {
    let harness = TestHarness::new();
    harness.track(PLAYLIST_1_ID).await;
    harness.fetcher.set_tracks(PLAYLIST_1_ID, &["a"]);
    harness.check().await;

    harness.fetcher.set_tracks(PLAYLIST_1_ID, &["a", "b"]);
    harness.notifier.set_delay(Duration::from_millis(500));
    let server = TestServer::spawn(&harness).await;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();

    let result = client
        .get(format!(
            "{}/check-playlists?token={}",
            server.base_url, WEBHOOK_SECRET
        ))
        .send()
        .await;
    assert!(result.is_err());

    harness.service.wait_until_idle().await;
    let batches = harness.notifier.batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(track_ids(&batches[1][0]), vec!["b"]);

    let summary = harness.check().await;
    assert!(!summary.any_change_detected);
}
