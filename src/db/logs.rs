//! Audit log repository.

use super::DbError;
use roster_engine::model::LogEntry;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// One persisted audit line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub id: String,
    pub timestamp: i64,
    pub action: String,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
}

impl LogRecord {
    /// Wrap an engine log entry with an id and timestamp.
    pub fn from_entry(entry: LogEntry, timestamp: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp,
            action: entry.action,
            details: entry.details,
            author_name: entry.author_name,
        }
    }
}

/// Repository for audit log entries.
pub struct LogRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> LogRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Append one audit line.
    pub async fn append(&self, record: &LogRecord) -> Result<(), DbError> {
        let data = serde_json::to_string(record)
            .map_err(|e| DbError::Document(record.id.clone(), e))?;
        sqlx::query("INSERT INTO logs (id, timestamp, data) VALUES (?, ?, ?)")
            .bind(&record.id)
            .bind(record.timestamp)
            .bind(&data)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Most recent entries, newest first.
    pub async fn recent(&self, limit: i64) -> Result<Vec<LogRecord>, DbError> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT id, data FROM logs ORDER BY timestamp DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, data)| serde_json::from_str(&data).map_err(|e| DbError::Document(id, e)))
            .collect()
    }
}
