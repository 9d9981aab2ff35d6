use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all tracker metrics
const PREFIX: &str = "playlist_tracker";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref PASSES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_passes_total"), "Completed reconciliation passes"),
        &["result"]
    ).expect("Failed to create passes_total metric");

    pub static ref PASS_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_pass_duration_seconds"),
            "Duration of a reconciliation pass in seconds"
        )
        .buckets(vec![0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0])
    ).expect("Failed to create pass_duration_seconds metric");

    pub static ref EVENTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_events_total"), "Change events emitted"),
        &["kind"]
    ).expect("Failed to create events_total metric");

    pub static ref FETCH_FAILURES_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_fetch_failures_total"),
        "Playlists skipped because fetching failed"
    ).expect("Failed to create fetch_failures_total metric");

    pub static ref IMAGE_CHANGES_SUPPRESSED_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_image_changes_suppressed_total"),
        "Image differences held back by the debounce window"
    ).expect("Failed to create image_changes_suppressed_total metric");

    pub static ref NOTIFY_FAILURES_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_notify_failures_total"),
        "Passes whose events could not be fully delivered"
    ).expect("Failed to create notify_failures_total metric");

    pub static ref BACKGROUND_JOB_EXECUTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_background_job_executions_total"), "Background job runs"),
        &["job_id", "status"]
    ).expect("Failed to create background_job_executions_total metric");

    pub static ref BACKGROUND_JOB_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_background_job_duration_seconds"),
            "Background job duration in seconds"
        )
        .buckets(vec![0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
        &["job_id"]
    ).expect("Failed to create background_job_duration_seconds metric");

    pub static ref BOT_COMMANDS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_bot_commands_total"), "Chat commands received"),
        &["command", "status"]
    ).expect("Failed to create bot_commands_total metric");

    pub static ref TRACKED_PLAYLISTS: Gauge = Gauge::new(
        format!("{PREFIX}_tracked_playlists"),
        "Number of tracked playlists"
    ).expect("Failed to create tracked_playlists metric");
}

/// Register all metrics with the Prometheus registry
pub fn init_metrics() {
    // Already registered metrics are ignored (tests call this repeatedly)
    let _ = REGISTRY.register(Box::new(PASSES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PASS_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(EVENTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(FETCH_FAILURES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(IMAGE_CHANGES_SUPPRESSED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(NOTIFY_FAILURES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(BACKGROUND_JOB_EXECUTIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(BACKGROUND_JOB_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(BOT_COMMANDS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(TRACKED_PLAYLISTS.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Record a finished pass
pub fn record_pass(duration: Duration, failed_entities: usize) {
    let result = if failed_entities == 0 {
        "success"
    } else {
        "partial"
    };
    PASSES_TOTAL.with_label_values(&[result]).inc();
    PASS_DURATION_SECONDS.observe(duration.as_secs_f64());
}

pub fn record_event(kind: &str) {
    EVENTS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn record_fetch_failure() {
    FETCH_FAILURES_TOTAL.inc();
}

pub fn record_image_change_suppressed() {
    IMAGE_CHANGES_SUPPRESSED_TOTAL.inc();
}

pub fn record_notify_failure() {
    NOTIFY_FAILURES_TOTAL.inc();
}

/// Record a background job run
pub fn record_background_job_execution(job_id: &str, status: &str, duration: Duration) {
    BACKGROUND_JOB_EXECUTIONS_TOTAL
        .with_label_values(&[job_id, status])
        .inc();

    BACKGROUND_JOB_DURATION_SECONDS
        .with_label_values(&[job_id])
        .observe(duration.as_secs_f64());
}

pub fn record_bot_command(command: &str, status: &str) {
    BOT_COMMANDS_TOTAL.with_label_values(&[command, status]).inc();
}

pub fn set_tracked_playlists(count: usize) {
    TRACKED_PLAYLISTS.set(count as f64);
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
