//! Actor model for session state management.
//!
//! Each session is owned by a `SessionActor` running in its own Tokio task.
//! All roster mutations arrive as `SessionEvent` messages and are applied
//! sequentially, so the capacity invariant never races: the actor is the
//! single writer for its session document.
//!
//! The actor applies an engine transition, persists the new document, then
//! dispatches the side effects (notifications, audit log, metrics). A
//! failed write leaves the in-memory session untouched.

use crate::db::{Database, LogRecord};
use crate::directory::Directory;
use crate::error::ApiError;
use chrono::Utc;
use roster_engine::model::{Actor, LogEntry, Session, SessionStatus};
use roster_engine::{admit, mutate_arrival, reconcile_attendance, sweep_auto_close};
use roster_engine::{withdraw, JoinRequest, Placement};
use tokio::sync::{mpsc, oneshot};

/// Events that can be sent to a session actor.
#[derive(Debug)]
pub enum SessionEvent {
    /// A user (optionally with a guest) asks to join.
    Join {
        actor: Actor,
        request: JoinRequest,
        reply_tx: oneshot::Sender<Result<Session, ApiError>>,
    },
    /// A user leaves, cascading to their linked guests.
    Leave {
        user_id: String,
        reply_tx: oneshot::Sender<Result<Session, ApiError>>,
    },
    /// A participant revises their declared arrival.
    SetArrival {
        participant_id: String,
        new_time: String,
        reply_tx: oneshot::Sender<Result<Session, ApiError>>,
    },
    /// Staff reconciles one participant's attendance.
    SetAttendance {
        participant_id: String,
        attended: bool,
        reply_tx: oneshot::Sender<Result<Session, ApiError>>,
    },
    /// Staff closes the session.
    Close {
        closed_by: Actor,
        reply_tx: oneshot::Sender<Result<Session, ApiError>>,
    },
    /// Staff removes the session entirely. Terminal: the actor deletes
    /// the row and then stops its loop, so mutations still queued behind
    /// this event can never re-upsert the document.
    Delete {
        deleted_by: Actor,
        reply_tx: oneshot::Sender<Result<Session, ApiError>>,
    },
    /// Background sweep: close if the session went stale. Replies with
    /// whether this pass closed it.
    SweepCheck {
        now: chrono::DateTime<Utc>,
        reply_tx: oneshot::Sender<bool>,
    },
    /// Request a copy of the current session document.
    Snapshot { reply_tx: oneshot::Sender<Session> },
}

/// The session actor.
///
/// Owns the state of a single session and processes events sequentially.
pub struct SessionActor {
    session: Session,
    db: Database,
    directory: Directory,
}

impl SessionActor {
    /// Create a new session actor and spawn it.
    pub fn spawn(session: Session, db: Database, directory: Directory) -> mpsc::Sender<SessionEvent> {
        let (tx, rx) = mpsc::channel(64);
        let actor = Self {
            session,
            db,
            directory,
        };
        tokio::spawn(async move {
            actor.run(rx).await;
        });
        tx
    }

    /// The main actor loop. Ends when every sender is dropped, or when a
    /// delete event retires the session.
    async fn run(mut self, mut rx: mpsc::Receiver<SessionEvent>) {
        while let Some(event) = rx.recv().await {
            if !self.handle_event(event).await {
                break;
            }
        }
        tracing::debug!(session = %self.session.id, "Session actor stopped");
    }

    /// Returns whether the loop should keep running.
    async fn handle_event(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::Join {
                actor,
                request,
                reply_tx,
            } => {
                let result = self.handle_join(actor, request).await;
                let _ = reply_tx.send(result);
                true
            }
            SessionEvent::Leave { user_id, reply_tx } => {
                let result = self.handle_leave(user_id).await;
                let _ = reply_tx.send(result);
                true
            }
            SessionEvent::SetArrival {
                participant_id,
                new_time,
                reply_tx,
            } => {
                let result = self.handle_set_arrival(participant_id, new_time).await;
                let _ = reply_tx.send(result);
                true
            }
            SessionEvent::SetAttendance {
                participant_id,
                attended,
                reply_tx,
            } => {
                let result = self.handle_set_attendance(participant_id, attended).await;
                let _ = reply_tx.send(result);
                true
            }
            SessionEvent::Close {
                closed_by,
                reply_tx,
            } => {
                let result = self.handle_close(closed_by).await;
                let _ = reply_tx.send(result);
                true
            }
            SessionEvent::Delete {
                deleted_by,
                reply_tx,
            } => {
                let result = self.handle_delete(deleted_by).await;
                // A failed delete keeps the actor alive and usable.
                let stop = result.is_ok();
                let _ = reply_tx.send(result);
                !stop
            }
            SessionEvent::SweepCheck { now, reply_tx } => {
                let closed = self.handle_sweep_check(now).await;
                let _ = reply_tx.send(closed);
                true
            }
            SessionEvent::Snapshot { reply_tx } => {
                let _ = reply_tx.send(self.session.clone());
                true
            }
        }
    }

    async fn handle_join(&mut self, actor: Actor, request: JoinRequest) -> Result<Session, ApiError> {
        let directory = self.directory.engine_snapshot();
        let now_ms = Utc::now().timestamp_millis();
        let out = admit(&self.session, &actor, &request, &directory, now_ms)?;

        self.commit(out.session, out.log, now_ms).await?;
        self.directory.push_notifications(&out.notifications).await?;

        let placement = match out.placement {
            Placement::Players => "players",
            Placement::Waitlist => "waitlist",
        };
        crate::metrics::record_join(placement);
        tracing::info!(
            session = %self.session.id,
            user = %actor.id,
            participant = %out.participant_id,
            placement,
            "Admitted"
        );
        Ok(self.session.clone())
    }

    async fn handle_leave(&mut self, user_id: String) -> Result<Session, ApiError> {
        let now_ms = Utc::now().timestamp_millis();
        let out = withdraw(&self.session, &user_id, now_ms)?;

        let removed = out.removed.len();
        let promoted = out.notifications.len();
        self.commit(out.session, out.log, now_ms).await?;
        self.directory.push_notifications(&out.notifications).await?;

        crate::metrics::record_withdrawals(removed);
        crate::metrics::record_promotions(promoted);
        tracing::info!(
            session = %self.session.id,
            user = %user_id,
            removed,
            promoted,
            "Withdrawn"
        );
        Ok(self.session.clone())
    }

    async fn handle_set_arrival(
        &mut self,
        participant_id: String,
        new_time: String,
    ) -> Result<Session, ApiError> {
        let now_ms = Utc::now().timestamp_millis();
        let (session, notifications) =
            mutate_arrival(&self.session, &participant_id, &new_time, now_ms)?;

        let promoted = notifications.len();
        self.commit_session(session).await?;
        self.directory.push_notifications(&notifications).await?;

        crate::metrics::record_promotions(promoted);
        tracing::info!(
            session = %self.session.id,
            participant = %participant_id,
            arrival = %new_time,
            "Arrival updated"
        );
        Ok(self.session.clone())
    }

    async fn handle_set_attendance(
        &mut self,
        participant_id: String,
        attended: bool,
    ) -> Result<Session, ApiError> {
        // Guests have no directory entry; their flag is the whole record.
        let stats = self
            .session
            .find_entry(&participant_id)
            .filter(|e| !e.is_guest)
            .and_then(|e| self.directory.stats_of(&e.participant_id));

        let (session, delta) = reconcile_attendance(&self.session, &participant_id, attended, stats)?;
        self.commit_session(session).await?;
        if let Some(delta) = delta {
            self.directory
                .apply_stat_delta(&participant_id, delta)
                .await?;
        }

        crate::metrics::record_attendance_update();
        tracing::info!(
            session = %self.session.id,
            participant = %participant_id,
            attended,
            "Attendance reconciled"
        );
        Ok(self.session.clone())
    }

    async fn handle_close(&mut self, closed_by: Actor) -> Result<Session, ApiError> {
        if self.session.status == SessionStatus::Closed {
            return Err(ApiError::Engine(roster_engine::EngineError::SessionClosed));
        }
        let now_ms = Utc::now().timestamp_millis();
        let mut session = self.session.clone();
        session.status = SessionStatus::Closed;

        let log = LogEntry {
            action: "CLOSE".into(),
            details: format!("{} closed by {}", session.name, closed_by.display_name),
            author_name: Some(closed_by.display_name.clone()),
        };
        self.commit(session, log, now_ms).await?;

        crate::metrics::record_session_closed("manual");
        tracing::info!(session = %self.session.id, by = %closed_by.id, "Session closed");
        Ok(self.session.clone())
    }

    async fn handle_delete(&mut self, deleted_by: Actor) -> Result<Session, ApiError> {
        let was_open = self.session.status == SessionStatus::Open;
        let now_ms = Utc::now().timestamp_millis();
        self.db.sessions().delete(&self.session.id).await?;
        self.append_log(
            LogEntry {
                action: "DELETE".into(),
                details: format!("Session {} deleted", self.session.name),
                author_name: Some(deleted_by.display_name.clone()),
            },
            now_ms,
        )
        .await;

        if was_open
            && let Some(g) = crate::metrics::OPEN_SESSIONS.get()
        {
            g.dec();
        }
        crate::metrics::set_session_players(&self.session.id, 0);
        tracing::info!(session = %self.session.id, by = %deleted_by.id, "Session deleted");
        Ok(self.session.clone())
    }

    async fn handle_sweep_check(&mut self, now: chrono::DateTime<Utc>) -> bool {
        if self.session.status == SessionStatus::Closed {
            return false;
        }
        let directory = self.directory.engine_snapshot();
        let mut sweep = sweep_auto_close(std::slice::from_ref(&self.session), &directory, now);
        let Some(closed) = sweep.closed.pop() else {
            return false;
        };

        let now_ms = now.timestamp_millis();
        if let Err(e) = self.commit_session(closed).await {
            tracing::error!(session = %self.session.id, error = %e, "Sweep close failed to persist");
            return false;
        }
        for log in sweep.logs {
            self.append_log(log, now_ms).await;
        }
        if let Err(e) = self.directory.push_notifications(&sweep.notifications).await {
            tracing::warn!(session = %self.session.id, error = %e, "Sweep notifications failed");
        }

        crate::metrics::record_session_closed("stale");
        tracing::info!(session = %self.session.id, "Session auto-closed");
        true
    }

    /// Persist a new session document and commit it in memory.
    async fn commit_session(&mut self, session: Session) -> Result<(), ApiError> {
        self.db.sessions().upsert(&session).await?;
        self.session = session;
        crate::metrics::set_session_players(&self.session.id, self.session.players.len() as i64);
        Ok(())
    }

    /// Persist a new session document plus its audit line.
    async fn commit(
        &mut self,
        session: Session,
        log: LogEntry,
        now_ms: i64,
    ) -> Result<(), ApiError> {
        self.commit_session(session).await?;
        self.append_log(log, now_ms).await;
        Ok(())
    }

    /// Audit lines are best-effort: a failed append never rolls back state.
    async fn append_log(&self, entry: LogEntry, now_ms: i64) {
        let record = LogRecord::from_entry(entry, now_ms);
        if let Err(e) = self.db.logs().append(&record).await {
            tracing::warn!(session = %self.session.id, error = %e, "Audit log append failed");
        }
    }
}
