//! Prometheus metrics for the HTTP surface.
//!
//! Domain counters live in `fulfillment_core::metrics` and are registered
//! here alongside request metrics and gauges refreshed at scrape time.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};

use fulfillment_core::TaskState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "fulfillment_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("fulfillment_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "fulfillment_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// Worker authentication failures.
pub static AUTH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "fulfillment_auth_failures_total",
            "Total worker authentication failures",
        ),
        &["reason"],
    )
    .unwrap()
});

/// Rejected order webhook signatures.
pub static WEBHOOK_SIGNATURE_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "fulfillment_webhook_signature_failures_total",
            "Order webhooks rejected for a bad signature",
        ),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// Pipeline gauges (collected dynamically)
// =============================================================================

pub static TASKS_BY_STATE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("fulfillment_tasks_by_state", "Current task count by state"),
        &["state"],
    )
    .unwrap()
});

/// Worker liveness (1 = online, 0 = offline).
pub static WORKER_ONLINE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "fulfillment_worker_online",
        "Whether the automation worker is online (1) or offline (0)",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();
    registry
        .register(Box::new(AUTH_FAILURES_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(WEBHOOK_SIGNATURE_FAILURES.clone()))
        .unwrap();

    // Pipeline
    registry
        .register(Box::new(TASKS_BY_STATE.clone()))
        .unwrap();
    registry.register(Box::new(WORKER_ONLINE.clone())).unwrap();

    // Core counters (ingestion, queue, liveness, notifications)
    for metric in fulfillment_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Refresh gauges from the database before a scrape.
///
/// Reads the stored worker flag without refreshing it, so scraping never
/// sends offline alerts.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    for task_state in TaskState::ALL {
        if let Ok(count) = state.tasks().count_by_state(task_state) {
            TASKS_BY_STATE
                .with_label_values(&[task_state.as_str()])
                .set(count);
        }
    }

    if let Ok(status) = state.monitor().status() {
        WORKER_ONLINE.set(if status.is_online { 1 } else { 0 });
    }
}

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    static NUMERIC: Lazy<regex_lite::Regex> =
        Lazy::new(|| regex_lite::Regex::new(r"/\d+(/|$)").unwrap());

    // Applied twice: adjacent numeric segments share a slash, so one pass
    // only replaces every other one.
    let result = NUMERIC.replace_all(path, "/{id}$1");
    NUMERIC.replace_all(&result, "/{id}$1").into_owned()
}
