//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Order ingestion (orders by result, tasks by initial state)
//! - Queue protocol (lease attempts, state reports)
//! - Worker liveness and notification delivery

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Ingestion Metrics
// =============================================================================

/// Orders received by result.
pub static ORDERS_INGESTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("fulfillment_orders_ingested_total", "Total orders received"),
        &["result"], // "created", "replayed", "rejected", "failed"
    )
    .unwrap()
});

/// Tasks created during ingestion by initial state.
pub static TASKS_CREATED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "fulfillment_tasks_created_total",
            "Total tasks created by initial state",
        ),
        &["state"], // "queued", "needs_mapping"
    )
    .unwrap()
});

/// Line items per ingested order.
pub static ORDER_LINE_ITEMS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "fulfillment_order_line_items",
            "Number of line items per ingested order",
        )
        .buckets(vec![1.0, 2.0, 3.0, 5.0, 10.0, 25.0]),
        &[],
    )
    .unwrap()
});

// =============================================================================
// Queue Metrics
// =============================================================================

/// Lease requests by result.
pub static LEASE_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("fulfillment_lease_attempts_total", "Total lease requests"),
        &["result"], // "leased", "empty"
    )
    .unwrap()
});

/// State reports accepted by reported state.
pub static STATE_REPORTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "fulfillment_state_reports_total",
            "Total task state reports by state",
        ),
        &["state"],
    )
    .unwrap()
});

// =============================================================================
// Worker & Notification Metrics
// =============================================================================

/// Heartbeats received.
pub static HEARTBEATS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "fulfillment_worker_heartbeats_total",
        "Total worker heartbeats received",
    )
    .unwrap()
});

/// Offline alerts raised.
pub static OFFLINE_ALERTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "fulfillment_worker_offline_alerts_total",
        "Total worker offline alerts raised",
    )
    .unwrap()
});

/// Notification deliveries by channel and result.
pub static NOTIFICATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "fulfillment_notifications_total",
            "Total notification deliveries",
        ),
        &["channel", "result"], // result: "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Ingestion
        Box::new(ORDERS_INGESTED.clone()),
        Box::new(TASKS_CREATED.clone()),
        Box::new(ORDER_LINE_ITEMS.clone()),
        // Queue
        Box::new(LEASE_ATTEMPTS.clone()),
        Box::new(STATE_REPORTS.clone()),
        // Worker & notifications
        Box::new(HEARTBEATS.clone()),
        Box::new(OFFLINE_ALERTS.clone()),
        Box::new(NOTIFICATIONS.clone()),
    ]
}
