#![allow(dead_code)]

use playlist_tracker::server::{make_app, ServerState};
use playlist_tracker::sqlite_persistence::open_tracker_db;
use playlist_tracker::{
    PassSummary, SqlitePlaylistRegistry, SqliteSnapshotStore, TrackerService, TrackerSettings,
};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use super::constants::WEBHOOK_SECRET;
use super::fakes::{FakeFetcher, RecordingNotifier};

/// A tracker service over a database file in a temporary directory.
pub struct TestHarness {
    pub fetcher: Arc<FakeFetcher>,
    pub notifier: Arc<RecordingNotifier>,
    pub service: Arc<TrackerService>,
    settings: TrackerSettings,
    db_path: PathBuf,
    _temp_dir: TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_settings(TrackerSettings::default())
    }

    pub fn with_settings(settings: TrackerSettings) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("tracker.db");
        let fetcher = Arc::new(FakeFetcher::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let service = Self::build_service(&db_path, &fetcher, &notifier, &settings);

        Self {
            fetcher,
            notifier,
            service,
            settings,
            db_path,
            _temp_dir: temp_dir,
        }
    }

    fn build_service(
        db_path: &PathBuf,
        fetcher: &Arc<FakeFetcher>,
        notifier: &Arc<RecordingNotifier>,
        settings: &TrackerSettings,
    ) -> Arc<TrackerService> {
        let conn = open_tracker_db(db_path).expect("Failed to open tracker db");
        Arc::new(TrackerService::new(
            fetcher.clone(),
            Arc::new(SqliteSnapshotStore::new(conn.clone())),
            Arc::new(SqlitePlaylistRegistry::new(conn)),
            notifier.clone(),
            settings.clone(),
        ))
    }

    /// Simulate a process restart: same database file, fresh service.
    pub fn restart(&mut self) {
        self.service = Self::build_service(&self.db_path, &self.fetcher, &self.notifier, &self.settings);
    }

    pub fn db_path(&self) -> &PathBuf {
        &self.db_path
    }

    pub async fn track(&self, playlist_id: &str) {
        self.service
            .add_playlist(playlist_id)
            .await
            .expect("Failed to add playlist");
    }

    pub async fn check(&self) -> PassSummary {
        self.service
            .run_check(&CancellationToken::new())
            .await
            .expect("Check failed")
    }
}

/// HTTP server over a [`TestHarness`] service, bound to a random port.
pub struct TestServer {
    pub base_url: String,
    shutdown_token: CancellationToken,
}

impl TestServer {
    pub async fn spawn(harness: &TestHarness) -> Self {
        let shutdown_token = CancellationToken::new();
        let state = ServerState::new(
            harness.service.clone(),
            Some(WEBHOOK_SECRET.to_string()),
            shutdown_token.clone(),
        );
        let app = make_app(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let port = listener.local_addr().unwrap().port();

        let token = shutdown_token.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
                .expect("Test server failed");
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            shutdown_token,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown_token.cancel();
    }
}
