//! Worker status storage.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, TransactionBehavior};

use super::{
    evaluate, LivenessPolicy, Refresh, WorkerError, WorkerStatus, DEFAULT_HEARTBEAT_ACTION,
};
use crate::db::{format_timestamp, parse_optional_timestamp, Database};

/// Storage for the singleton worker status record.
pub trait WorkerStatusStore: Send + Sync {
    fn get(&self) -> Result<WorkerStatus, WorkerError>;

    /// Mark the worker online as of `now`.
    ///
    /// `action` defaults to `"Heartbeat"`. A `None` error keeps the stored one.
    fn heartbeat(
        &self,
        now: DateTime<Utc>,
        action: Option<&str>,
        error: Option<&str>,
    ) -> Result<WorkerStatus, WorkerError>;

    /// Re-evaluate liveness at `now` and persist the outcome atomically.
    ///
    /// When an alert is due, the alert timestamp is stamped in the same
    /// transaction, so concurrent refreshes claim at most one alert.
    fn refresh(&self, now: DateTime<Utc>, policy: &LivenessPolicy)
        -> Result<Refresh, WorkerError>;
}

pub struct SqliteWorkerStatusStore {
    db: Database,
}

impl SqliteWorkerStatusStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn read(conn: &Connection) -> Result<WorkerStatus, WorkerError> {
        conn.query_row(
            "SELECT is_online, last_heartbeat_at, last_error, last_action, last_offline_notification_at FROM worker_status WHERE id = 1",
            [],
            |row| {
                Ok(WorkerStatus {
                    is_online: row.get(0)?,
                    last_heartbeat_at: parse_optional_timestamp(1, row.get(1)?)?,
                    last_error: row.get(2)?,
                    last_action: row.get(3)?,
                    last_offline_notification_at: parse_optional_timestamp(4, row.get(4)?)?,
                })
            },
        )
        .map_err(|e| WorkerError::Database(e.to_string()))
    }
}

impl WorkerStatusStore for SqliteWorkerStatusStore {
    fn get(&self) -> Result<WorkerStatus, WorkerError> {
        let conn = self
            .db
            .lock()
            .map_err(|e| WorkerError::Database(e.to_string()))?;
        Self::read(&conn)
    }

    fn heartbeat(
        &self,
        now: DateTime<Utc>,
        action: Option<&str>,
        error: Option<&str>,
    ) -> Result<WorkerStatus, WorkerError> {
        let mut conn = self
            .db
            .lock()
            .map_err(|e| WorkerError::Database(e.to_string()))?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| WorkerError::Database(e.to_string()))?;

        tx.execute(
            r#"
            UPDATE worker_status
            SET is_online = 1,
                last_heartbeat_at = ?,
                last_action = ?,
                last_error = COALESCE(?, last_error)
            WHERE id = 1
            "#,
            params![
                format_timestamp(&now),
                action.unwrap_or(DEFAULT_HEARTBEAT_ACTION),
                error,
            ],
        )
        .map_err(|e| WorkerError::Database(e.to_string()))?;

        let status = Self::read(&tx)?;
        tx.commit()
            .map_err(|e| WorkerError::Database(e.to_string()))?;
        Ok(status)
    }

    fn refresh(
        &self,
        now: DateTime<Utc>,
        policy: &LivenessPolicy,
    ) -> Result<Refresh, WorkerError> {
        let mut conn = self
            .db
            .lock()
            .map_err(|e| WorkerError::Database(e.to_string()))?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| WorkerError::Database(e.to_string()))?;

        let mut status = Self::read(&tx)?;
        let evaluation = evaluate(&status, now, policy);

        if evaluation.send_alert {
            tx.execute(
                "UPDATE worker_status SET last_offline_notification_at = ? WHERE id = 1",
                params![format_timestamp(&now)],
            )
            .map_err(|e| WorkerError::Database(e.to_string()))?;
            status.last_offline_notification_at = Some(now);
        }

        if evaluation.online != status.is_online {
            tx.execute(
                "UPDATE worker_status SET is_online = ? WHERE id = 1",
                params![evaluation.online],
            )
            .map_err(|e| WorkerError::Database(e.to_string()))?;
            status.is_online = evaluation.online;
        }

        tx.commit()
            .map_err(|e| WorkerError::Database(e.to_string()))?;

        Ok(Refresh {
            status,
            alert: evaluation.send_alert,
        })
    }
}
