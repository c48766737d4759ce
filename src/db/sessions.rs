//! Session repository.
//!
//! Sessions persist as whole JSON documents so the roster lists survive a
//! restart exactly as the engine last produced them.

use super::DbError;
use roster_engine::model::Session;
use sqlx::SqlitePool;

/// Repository for session documents.
pub struct SessionRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SessionRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Load every session, ordered by date then kickoff time.
    pub async fn load_all(&self) -> Result<Vec<Session>, DbError> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT id, data FROM sessions ORDER BY date, time",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, data)| serde_json::from_str(&data).map_err(|e| DbError::Document(id, e)))
            .collect()
    }

    /// Insert or replace one session document.
    pub async fn upsert(&self, session: &Session) -> Result<(), DbError> {
        let data = serde_json::to_string(session)
            .map_err(|e| DbError::Document(session.id.clone(), e))?;
        sqlx::query(
            r#"
            INSERT INTO sessions (id, date, time, data) VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                date = excluded.date, time = excluded.time, data = excluded.data
            "#,
        )
        .bind(&session.id)
        .bind(session.date.to_string())
        .bind(&session.start_time)
        .bind(&data)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Delete a session document. Returns whether a row existed.
    pub async fn delete(&self, id: &str) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
