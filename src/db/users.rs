//! User repository.
//!
//! Each user is one JSON document keyed by uid. The email lands in its own
//! column for the uniqueness constraint; everything else lives in `data`.

use super::DbError;
use roster_engine::model::{Gender, Role, UserStats};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// A queued in-app notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub message: String,
    pub timestamp: i64,
    #[serde(default)]
    pub read: bool,
}

/// Persisted user document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDoc {
    pub uid: String,
    pub email: String,
    /// Preferred display handle; the full name is the fallback.
    #[serde(default)]
    pub nickname: String,
    pub full_name: String,
    pub gender: Gender,
    pub role: Role,
    #[serde(default)]
    pub stats: UserStats,
    #[serde(default)]
    pub notifications: Vec<Notification>,
}

impl UserDoc {
    /// Name shown on rosters: nickname when set, full name otherwise.
    pub fn display_name(&self) -> &str {
        if self.nickname.is_empty() {
            &self.full_name
        } else {
            &self.nickname
        }
    }
}

/// Repository for user documents.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Load every user document.
    pub async fn load_all(&self) -> Result<Vec<UserDoc>, DbError> {
        let rows = sqlx::query_as::<_, (String, String)>("SELECT uid, data FROM users")
            .fetch_all(self.pool)
            .await?;

        rows.into_iter()
            .map(|(uid, data)| {
                serde_json::from_str(&data).map_err(|e| DbError::Document(uid, e))
            })
            .collect()
    }

    /// Insert or replace one user document.
    pub async fn upsert(&self, user: &UserDoc) -> Result<(), DbError> {
        let data = serde_json::to_string(user)
            .map_err(|e| DbError::Document(user.uid.clone(), e))?;
        sqlx::query(
            r#"
            INSERT INTO users (uid, email, data) VALUES (?, ?, ?)
            ON CONFLICT(uid) DO UPDATE SET email = excluded.email, data = excluded.data
            "#,
        )
        .bind(&user.uid)
        .bind(&user.email)
        .bind(&data)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}
