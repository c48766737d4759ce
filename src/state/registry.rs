//! Registry of live session actors.

use crate::db::Database;
use crate::directory::Directory;
use crate::state::actor::{SessionActor, SessionEvent};
use dashmap::DashMap;
use roster_engine::model::Session;
use tokio::sync::{mpsc, oneshot};

/// Maps session ids to their actors' inboxes.
#[derive(Default)]
pub struct Registry {
    actors: DashMap<String, mpsc::Sender<SessionEvent>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn an actor for a session and register its inbox.
    pub fn spawn(&self, session: Session, db: Database, directory: Directory) {
        let id = session.id.clone();
        let tx = SessionActor::spawn(session, db, directory);
        self.actors.insert(id, tx);
    }

    /// Inbox for a session, if it is live.
    pub fn sender(&self, id: &str) -> Option<mpsc::Sender<SessionEvent>> {
        self.actors.get(id).map(|entry| entry.value().clone())
    }

    /// Drop a session's inbox; its actor stops once in-flight events drain.
    pub fn remove(&self, id: &str) -> bool {
        self.actors.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    #[allow(dead_code)] // Paired with len() for clippy::len_without_is_empty
    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    /// Ids of every live session.
    pub fn ids(&self) -> Vec<String> {
        self.actors.iter().map(|e| e.key().clone()).collect()
    }

    /// Current documents of every live session.
    ///
    /// Senders are collected before any await so no map shard lock is held
    /// across suspension points.
    pub async fn snapshots(&self) -> Vec<Session> {
        let senders: Vec<mpsc::Sender<SessionEvent>> =
            self.actors.iter().map(|e| e.value().clone()).collect();

        let mut sessions = Vec::with_capacity(senders.len());
        for tx in senders {
            let (reply_tx, reply_rx) = oneshot::channel();
            if tx.send(SessionEvent::Snapshot { reply_tx }).await.is_ok()
                && let Ok(session) = reply_rx.await
            {
                sessions.push(session);
            }
        }
        sessions.sort_by(|a, b| (a.date, &a.start_time).cmp(&(b.date, &b.start_time)));
        sessions
    }
}
