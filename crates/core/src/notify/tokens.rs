//! Registered push device tokens.

use chrono::Utc;
use rusqlite::params;

use super::NotifyError;
use crate::db::{format_timestamp, Database};

/// Label stored when a device subscribes without one.
pub const DEFAULT_DEVICE_LABEL: &str = "Unknown";

/// Storage for push device registrations.
pub trait PushTokenStore: Send + Sync {
    /// Register a device token, replacing the label if it is already known.
    fn upsert(&self, token: &str, device_label: Option<&str>) -> Result<(), NotifyError>;

    /// All registered tokens.
    fn tokens(&self) -> Result<Vec<String>, NotifyError>;
}

pub struct SqlitePushTokenStore {
    db: Database,
}

impl SqlitePushTokenStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl PushTokenStore for SqlitePushTokenStore {
    fn upsert(&self, token: &str, device_label: Option<&str>) -> Result<(), NotifyError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(NotifyError::InvalidInput("No token provided".to_string()));
        }
        let label = device_label
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_DEVICE_LABEL);

        let conn = self
            .db
            .lock()
            .map_err(|e| NotifyError::Database(e.to_string()))?;

        conn.execute(
            r#"
            INSERT INTO push_tokens (token, device_label, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(token) DO UPDATE SET device_label = excluded.device_label
            "#,
            params![token, label, format_timestamp(&Utc::now())],
        )
        .map_err(|e| NotifyError::Database(e.to_string()))?;

        Ok(())
    }

    fn tokens(&self) -> Result<Vec<String>, NotifyError> {
        let conn = self
            .db
            .lock()
            .map_err(|e| NotifyError::Database(e.to_string()))?;

        let mut stmt = conn
            .prepare("SELECT token FROM push_tokens ORDER BY id")
            .map_err(|e| NotifyError::Database(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| NotifyError::Database(e.to_string()))?;

        rows.collect::<rusqlite::Result<Vec<String>>>()
            .map_err(|e| NotifyError::Database(e.to_string()))
    }
}
