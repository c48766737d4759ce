//! In-memory user directory.
//!
//! The daemon keeps every user document resident and treats SQLite as the
//! write-behind copy: reads never touch the pool, and each mutation clones
//! the updated document out of the lock before persisting it. Locks are
//! never held across an await.

use crate::db::{Database, DbError, Notification, UserDoc};
use parking_lot::RwLock;
use roster_engine::model::{Actor, DirectoryUser, NotificationCommand, StatDelta, UserStats};
use std::collections::HashMap;
use std::sync::Arc;

/// Shared handle to the user directory.
#[derive(Clone)]
pub struct Directory {
    users: Arc<RwLock<HashMap<String, UserDoc>>>,
    db: Database,
}

impl Directory {
    /// Load all users from the database into memory.
    pub async fn load(db: Database) -> Result<Self, DbError> {
        let users = db
            .users()
            .load_all()
            .await?
            .into_iter()
            .map(|u| (u.uid.clone(), u))
            .collect::<HashMap<_, _>>();
        tracing::info!(count = users.len(), "User directory loaded");
        Ok(Self {
            users: Arc::new(RwLock::new(users)),
            db,
        })
    }

    /// Engine-facing identity for an acting user.
    pub fn actor_for(&self, uid: &str) -> Option<Actor> {
        let users = self.users.read();
        let doc = users.get(uid)?;
        Some(Actor {
            id: doc.uid.clone(),
            display_name: doc.display_name().to_string(),
            gender: doc.gender,
            role: doc.role,
        })
    }

    pub fn stats_of(&self, uid: &str) -> Option<UserStats> {
        self.users.read().get(uid).map(|u| u.stats)
    }

    /// Id/role pairs for broadcast addressing.
    pub fn engine_snapshot(&self) -> Vec<DirectoryUser> {
        self.users
            .read()
            .values()
            .map(|u| DirectoryUser {
                id: u.uid.clone(),
                role: u.role,
            })
            .collect()
    }

    /// All user documents, ordered by display name.
    pub fn all(&self) -> Vec<UserDoc> {
        let mut docs: Vec<UserDoc> = self.users.read().values().cloned().collect();
        docs.sort_by(|a, b| a.display_name().cmp(b.display_name()));
        docs
    }

    /// Insert or replace a user document, persisting the result.
    pub async fn upsert(&self, doc: UserDoc) -> Result<(), DbError> {
        self.db.users().upsert(&doc).await?;
        self.users.write().insert(doc.uid.clone(), doc);
        Ok(())
    }

    /// Overwrite a user's attendance counters with the reconciled values.
    ///
    /// No-op for unknown ids; guest participants have no directory entry.
    pub async fn apply_stat_delta(&self, uid: &str, delta: StatDelta) -> Result<(), DbError> {
        let updated = {
            let mut users = self.users.write();
            match users.get_mut(uid) {
                Some(doc) => {
                    doc.stats = UserStats {
                        attended: delta.attended,
                        missed: delta.missed,
                    };
                    Some(doc.clone())
                }
                None => None,
            }
        };
        if let Some(doc) = updated {
            self.db.users().upsert(&doc).await?;
        }
        Ok(())
    }

    /// Queue notifications on their recipients' documents.
    ///
    /// Unknown recipients are skipped; everything else is persisted.
    pub async fn push_notifications(
        &self,
        commands: &[NotificationCommand],
    ) -> Result<(), DbError> {
        if commands.is_empty() {
            return Ok(());
        }
        let mut touched = Vec::new();
        {
            let mut users = self.users.write();
            for cmd in commands {
                if let Some(doc) = users.get_mut(&cmd.recipient_id) {
                    doc.notifications.push(Notification {
                        id: uuid::Uuid::new_v4().to_string(),
                        message: cmd.message.clone(),
                        timestamp: cmd.created_at,
                        read: false,
                    });
                    touched.push(doc.clone());
                }
            }
        }
        crate::metrics::record_notifications(touched.len());
        for doc in touched {
            self.db.users().upsert(&doc).await?;
        }
        Ok(())
    }

    /// Mark all of a user's notifications read.
    pub async fn mark_notifications_read(&self, uid: &str) -> Result<bool, DbError> {
        let updated = {
            let mut users = self.users.write();
            match users.get_mut(uid) {
                Some(doc) => {
                    for n in &mut doc.notifications {
                        n.read = true;
                    }
                    Some(doc.clone())
                }
                None => None,
            }
        };
        match updated {
            Some(doc) => {
                self.db.users().upsert(&doc).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drop every notification from a user's document.
    pub async fn clear_notifications(&self, uid: &str) -> Result<bool, DbError> {
        let updated = {
            let mut users = self.users.write();
            match users.get_mut(uid) {
                Some(doc) => {
                    doc.notifications.clear();
                    Some(doc.clone())
                }
                None => None,
            }
        };
        match updated {
            Some(doc) => {
                self.db.users().upsert(&doc).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
