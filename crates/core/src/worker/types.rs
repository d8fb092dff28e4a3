//! Worker liveness types and the offline/alert decision.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::WorkerConfig;

/// Action recorded for a heartbeat that names none.
pub const DEFAULT_HEARTBEAT_ACTION: &str = "Heartbeat";

/// The single worker status record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerStatus {
    pub is_online: bool,
    pub last_heartbeat_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_action: Option<String>,
    pub last_offline_notification_at: Option<DateTime<Utc>>,
}

/// Thresholds for deciding liveness and alert cadence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LivenessPolicy {
    /// Heartbeat age at which the worker counts as offline.
    pub offline_threshold: Duration,
    /// Minimum gap between two offline alerts.
    pub alert_interval: Duration,
}

impl Default for LivenessPolicy {
    fn default() -> Self {
        Self {
            offline_threshold: Duration::seconds(120),
            alert_interval: Duration::seconds(3600),
        }
    }
}

impl From<&WorkerConfig> for LivenessPolicy {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            offline_threshold: Duration::seconds(config.offline_threshold_secs as i64),
            alert_interval: Duration::seconds(config.offline_alert_interval_secs as i64),
        }
    }
}

/// Outcome of evaluating a status at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub online: bool,
    pub send_alert: bool,
}

/// Decide whether the worker is online at `now` and whether to alert.
///
/// A worker that never sent a heartbeat is offline but never alerted about.
pub fn evaluate(status: &WorkerStatus, now: DateTime<Utc>, policy: &LivenessPolicy) -> Evaluation {
    let Some(last_heartbeat) = status.last_heartbeat_at else {
        return Evaluation {
            online: false,
            send_alert: false,
        };
    };

    let online = now - last_heartbeat < policy.offline_threshold;
    let alert_due = match status.last_offline_notification_at {
        None => true,
        Some(last_alert) => now - last_alert >= policy.alert_interval,
    };

    Evaluation {
        online,
        send_alert: !online && alert_due,
    }
}

/// Result of a status refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct Refresh {
    /// Status after the refresh was applied.
    pub status: WorkerStatus,
    /// Whether this refresh claimed the right to send an offline alert.
    pub alert: bool,
}

/// Status view for dashboards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub worker_online: bool,
    pub last_heartbeat_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_action: Option<String>,
    /// Tasks in `queued`.
    pub queue_size: i64,
    /// Tasks in `verification_required`.
    pub verification_count: i64,
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Database error: {0}")]
    Database(String),
}
