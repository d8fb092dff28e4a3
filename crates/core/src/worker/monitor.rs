//! Worker liveness monitor.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{LivenessPolicy, StatusReport, WorkerError, WorkerStatus, WorkerStatusStore};
use crate::db::format_timestamp;
use crate::metrics;
use crate::notify::{Notification, NotificationHandle};
use crate::task::{TaskState, TaskStore};

/// Tracks worker heartbeats and raises offline alerts.
///
/// Staleness is only detected when [`LivenessMonitor::refresh_status`] runs;
/// there is no timer of its own.
pub struct LivenessMonitor {
    store: Arc<dyn WorkerStatusStore>,
    tasks: Arc<dyn TaskStore>,
    notifications: NotificationHandle,
    policy: LivenessPolicy,
}

impl LivenessMonitor {
    pub fn new(
        store: Arc<dyn WorkerStatusStore>,
        tasks: Arc<dyn TaskStore>,
        notifications: NotificationHandle,
        policy: LivenessPolicy,
    ) -> Self {
        Self {
            store,
            tasks,
            notifications,
            policy,
        }
    }

    pub fn heartbeat(
        &self,
        action: Option<&str>,
        error: Option<&str>,
    ) -> Result<WorkerStatus, WorkerError> {
        self.heartbeat_at(Utc::now(), action, error)
    }

    pub fn heartbeat_at(
        &self,
        now: DateTime<Utc>,
        action: Option<&str>,
        error: Option<&str>,
    ) -> Result<WorkerStatus, WorkerError> {
        let status = self.store.heartbeat(now, action, error)?;
        metrics::HEARTBEATS.inc();
        tracing::debug!(action = ?status.last_action, "Worker heartbeat");
        Ok(status)
    }

    /// The stored status, as of the last heartbeat or refresh.
    pub fn status(&self) -> Result<WorkerStatus, WorkerError> {
        self.store.get()
    }

    /// Recompute the online flag, alerting if the worker just went quiet.
    pub fn refresh_status(&self) -> Result<bool, WorkerError> {
        self.refresh_status_at(Utc::now())
    }

    pub fn refresh_status_at(&self, now: DateTime<Utc>) -> Result<bool, WorkerError> {
        let refresh = self.store.refresh(now, &self.policy)?;

        if refresh.alert {
            let last_heartbeat = refresh.status.last_heartbeat_at.map(|t| format_timestamp(&t));
            tracing::info!(
                last_heartbeat = last_heartbeat.as_deref().unwrap_or("never"),
                "Worker offline, sending alert"
            );
            metrics::OFFLINE_ALERTS.inc();
            self.notifications
                .try_emit(Notification::worker_offline(last_heartbeat.as_deref()));
        }

        Ok(refresh.status.is_online)
    }

    /// Refresh liveness and gather the dashboard status.
    pub fn status_report(&self) -> Result<StatusReport, WorkerError> {
        self.refresh_status()?;
        let status = self.store.get()?;

        let queue_size = self
            .tasks
            .count_by_state(TaskState::Queued)
            .map_err(|e| WorkerError::Database(e.to_string()))?;
        let verification_count = self
            .tasks
            .count_by_state(TaskState::VerificationRequired)
            .map_err(|e| WorkerError::Database(e.to_string()))?;

        Ok(StatusReport {
            worker_online: status.is_online,
            last_heartbeat_at: status.last_heartbeat_at,
            last_error: status.last_error,
            last_action: status.last_action,
            queue_size,
            verification_count,
        })
    }
}
