//! Task storage trait.

use super::{LeasedTask, StateReport, Task, TaskError, TaskState, TaskView};

/// `last_action` stamped on a task when the worker leases it.
pub const LEASE_ACTION: &str = "Worker pulled task";

/// Trait for task storage backends.
///
/// Tasks are created by order ingestion (see `OrderStore::ingest`); this
/// trait covers the queue protocol and read views.
pub trait TaskStore: Send + Sync {
    /// Atomically claim the oldest `queued` task.
    ///
    /// The claimed task moves to `processing_opened_url`. Concurrent callers
    /// never receive the same task. Returns `None` when nothing is queued.
    fn lease_next(&self) -> Result<Option<LeasedTask>, TaskError>;

    /// Overwrite a task's state and optional fields.
    fn report_state(&self, id: i64, report: &StateReport) -> Result<TaskView, TaskError>;

    /// Get a task by ID.
    fn get(&self, id: i64) -> Result<Option<Task>, TaskError>;

    /// Tasks in `state`, most recently updated first.
    fn list_by_state(&self, state: TaskState) -> Result<Vec<TaskView>, TaskError>;

    /// Tasks belonging to one order, in creation order.
    fn list_for_order(&self, order_id: i64) -> Result<Vec<Task>, TaskError>;

    /// Number of tasks in `state`.
    fn count_by_state(&self, state: TaskState) -> Result<i64, TaskError>;
}
