use anyhow::Result;
use axum::{
    body::Body,
    extract::{Query, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::metrics::metrics_handler;
use super::state::ServerState;
use crate::tracker::PassSummary;

#[derive(Serialize)]
struct ServerStats {
    pub status: &'static str,
    pub uptime: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug)]
struct CheckQuery {
    token: Option<String>,
}

#[derive(Serialize)]
struct CheckResponse {
    success: bool,
    message: &'static str,
    #[serde(flatten)]
    summary: PassSummary,
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    Json(ServerStats {
        status: "Playlist tracker is running",
        uptime: format_uptime(state.start_time.elapsed()),
    })
}

async fn check_playlists(
    State(state): State<ServerState>,
    Query(query): Query<CheckQuery>,
) -> Response {
    let authorized = match (&state.webhook_secret, &query.token) {
        (Some(secret), Some(token)) => secret == token,
        _ => false,
    };
    if !authorized {
        warn!("Rejected playlist check trigger with a missing or wrong token");
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                success: false,
                error: "Unauthorized".to_string(),
            }),
        )
            .into_response();
    }

    info!("Playlist check triggered over HTTP");
    match state.tracker.spawn_check(&state.shutdown_token).await {
        Ok(summary) => Json(CheckResponse {
            success: true,
            message: "Playlist check triggered successfully",
            summary,
        })
        .into_response(),
        Err(e) => {
            error!("Playlist check failed: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    success: false,
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

async fn log_requests(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    debug!(
        "<<< {} {} {} ({}ms)",
        method,
        path,
        response.status().as_u16(),
        start.elapsed().as_millis()
    );
    response
}

pub fn make_app(state: ServerState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/check-playlists", get(check_playlists))
        .route("/metrics", get(metrics_handler))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

/// Serve until `shutdown_token` is cancelled.
pub async fn run_server(state: ServerState, port: u16, shutdown_token: CancellationToken) -> Result<()> {
    let app = make_app(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("HTTP server listening on port {}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown_token.cancelled().await })
        .await?;
    Ok(())
}
