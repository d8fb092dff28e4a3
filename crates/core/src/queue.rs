//! Queue lease protocol used by the purchase worker.

use std::sync::Arc;

use crate::metrics;
use crate::notify::{Notification, NotificationHandle};
use crate::task::{LeasedTask, StateReport, TaskError, TaskState, TaskStore, TaskView};

/// Worker-facing task queue.
///
/// Wraps a [`TaskStore`] and emits the notifications tied to reported states.
pub struct TaskQueue {
    tasks: Arc<dyn TaskStore>,
    notifications: NotificationHandle,
}

impl TaskQueue {
    pub fn new(tasks: Arc<dyn TaskStore>, notifications: NotificationHandle) -> Self {
        Self {
            tasks,
            notifications,
        }
    }

    /// Claim the oldest queued task, if any.
    pub fn lease_next(&self) -> Result<Option<LeasedTask>, TaskError> {
        let leased = self.tasks.lease_next()?;

        match &leased {
            Some(lease) => {
                tracing::info!(
                    task_id = lease.task.id,
                    order = %lease.shopify_order_number,
                    "Task leased"
                );
                metrics::LEASE_ATTEMPTS.with_label_values(&["leased"]).inc();
            }
            None => {
                tracing::debug!("Queue empty");
                metrics::LEASE_ATTEMPTS.with_label_values(&["empty"]).inc();
            }
        }

        Ok(leased)
    }

    /// Persist a worker-reported state, then notify if the state calls for it.
    pub fn report_state(&self, id: i64, report: &StateReport) -> Result<TaskView, TaskError> {
        let view = self.tasks.report_state(id, report)?;

        tracing::info!(task_id = id, state = %report.state, "Task state reported");
        metrics::STATE_REPORTS
            .with_label_values(&[report.state.as_str()])
            .inc();

        if let Some(notification) = state_notification(&view, report) {
            self.notifications.try_emit(notification);
        }

        Ok(view)
    }
}

fn state_notification(view: &TaskView, report: &StateReport) -> Option<Notification> {
    let order = view.shopify_order_number.as_str();
    let task_id = view.task.id;

    match report.state {
        TaskState::VerificationRequired => {
            Some(Notification::verification_required(order, task_id))
        }
        TaskState::Failed => Some(Notification::task_failed(
            order,
            task_id,
            report.error_message.as_deref(),
        )),
        TaskState::Purchased => Some(Notification::purchased(
            order,
            task_id,
            report.amazon_order_id.as_deref(),
        )),
        _ => None,
    }
}
