//! HTTP API for the roster daemon.
//!
//! A thin JSON layer over the session actors: handlers resolve the acting
//! user through the directory, forward one event to the right actor, and
//! return the updated session document. Field names on the wire stay
//! camelCase to match the stored documents.

use crate::db::{Database, LogRecord, UserDoc};
use crate::directory::Directory;
use crate::error::ApiError;
use crate::state::{Registry, SessionEvent};
use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use roster_engine::model::{
    Gender, GenderRestriction, LogEntry, NotificationCommand, Role, Session, SessionStatus,
    SessionType, UserStats,
};
use roster_engine::{validate_no_conflict, JoinRequest};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};

/// Shared handles for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub directory: Directory,
    pub db: Database,
    /// Serializes the validate-then-insert window of session creation.
    pub create_lock: Arc<Mutex<()>>,
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/data", get(get_data))
        .route("/api/logs", get(get_logs))
        .route("/api/users", post(upsert_user))
        .route("/api/users/:uid/role", post(set_role))
        .route("/api/users/:uid/notifications/read", post(read_notifications))
        .route("/api/users/:uid/notifications/clear", post(clear_notifications))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", delete(delete_session))
        .route("/api/sessions/:id/join", post(join_session))
        .route("/api/sessions/:id/leave", post(leave_session))
        .route("/api/sessions/:id/arrival", post(set_arrival))
        .route("/api/sessions/:id/attendance", post(set_attendance))
        .route("/api/sessions/:id/close", post(close_session))
        .with_state(state)
}

/// Run the API server. This is the daemon's foreground task.
pub async fn serve(state: AppState, bind: SocketAddr) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(addr = %bind, "API server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Serve `/metrics` for Prometheus scraping on its own port.
pub async fn run_metrics_server(port: u16) {
    let app = Router::new().route("/metrics", get(|| async { crate::metrics::gather_metrics() }));
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind metrics server on {}: {}", addr, e);
            return;
        }
    };
    tracing::info!("Prometheus HTTP server listening on {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Metrics server error: {}", e);
    }
}

// ============================================================================
// Request/response bodies
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertUserBody {
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub nickname: String,
    pub full_name: String,
    pub gender: Gender,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRoleBody {
    pub acting_user_id: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionBody {
    pub acting_user_id: String,
    pub name: String,
    pub date: chrono::NaiveDate,
    pub time: String,
    pub max_spots: u32,
    #[serde(rename = "type")]
    pub session_type: SessionType,
    #[serde(default)]
    pub gender_restriction: Option<GenderRestriction>,
    #[serde(default = "default_true")]
    pub allow_guests: bool,
    #[serde(default)]
    pub guest_window_opens_at: i64,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActingUserBody {
    pub acting_user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinBody {
    pub user_id: String,
    pub arrival: String,
    #[serde(default)]
    pub guest: Option<roster_engine::model::GuestInfo>,
    #[serde(default)]
    pub spectator: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveBody {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrivalBody {
    pub participant_id: String,
    pub arrival: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceBody {
    pub acting_user_id: String,
    pub participant_id: String,
    pub attended: bool,
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(default = "default_log_limit")]
    pub limit: i64,
}

fn default_log_limit() -> i64 {
    100
}

// ============================================================================
// Handlers
// ============================================================================

/// Everything a client needs to render: all users and all sessions.
pub async fn get_data(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let sessions = state.registry.snapshots().await;
    let users = state.directory.all();
    Ok(Json(serde_json::json!({
        "users": users,
        "sessions": sessions,
    })))
}

pub async fn get_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Vec<LogRecord>>, ApiError> {
    let logs = state.db.logs().recent(query.limit.clamp(1, 1000)).await?;
    Ok(Json(logs))
}

/// Register a new user or update an existing profile.
///
/// New users start as pending; role, stats and notifications are never
/// writable through this endpoint.
pub async fn upsert_user(
    State(state): State<AppState>,
    Json(body): Json<UpsertUserBody>,
) -> Result<Json<UserDoc>, ApiError> {
    if body.uid.is_empty() || body.full_name.is_empty() {
        return Err(ApiError::BadRequest("uid and fullName are required".into()));
    }

    let existing = state
        .directory
        .all()
        .into_iter()
        .find(|u| u.uid == body.uid);
    let doc = match existing {
        Some(mut doc) => {
            doc.email = body.email;
            doc.nickname = body.nickname;
            doc.full_name = body.full_name;
            doc.gender = body.gender;
            doc
        }
        None => UserDoc {
            uid: body.uid,
            email: body.email,
            nickname: body.nickname,
            full_name: body.full_name,
            gender: body.gender,
            role: Role::Pending,
            stats: UserStats::default(),
            notifications: Vec::new(),
        },
    };
    state.directory.upsert(doc.clone()).await?;
    Ok(Json(doc))
}

/// Staff-only: approve a pending user or change a role.
///
/// The affected user is told what happened and the change lands in the
/// audit log like any other roster transition.
pub async fn set_role(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Json(body): Json<SetRoleBody>,
) -> Result<Json<UserDoc>, ApiError> {
    let author = require_staff(&state.directory, &body.acting_user_id)?;
    let mut doc = state
        .directory
        .all()
        .into_iter()
        .find(|u| u.uid == uid)
        .ok_or_else(|| ApiError::UnknownUser(uid.clone()))?;
    let previous = doc.role;
    doc.role = body.role;
    state.directory.upsert(doc.clone()).await?;

    if previous != body.role {
        append_log(
            &state,
            LogEntry {
                action: "ROLE_CHANGE".into(),
                details: format!(
                    "{} changed from {} to {}",
                    doc.display_name(),
                    role_label(previous),
                    role_label(body.role)
                ),
                author_name: Some(author.display_name),
            },
        )
        .await;
        if let Some(message) = role_change_message(previous, body.role) {
            state
                .directory
                .push_notifications(&[NotificationCommand {
                    recipient_id: uid.clone(),
                    message,
                    created_at: chrono::Utc::now().timestamp_millis(),
                }])
                .await?;
        }
    }
    tracing::info!(user = %uid, role = ?body.role, by = %body.acting_user_id, "Role changed");
    Ok(Json(doc))
}

pub async fn read_notifications(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.directory.mark_notifications_read(&uid).await? {
        return Err(ApiError::UnknownUser(uid));
    }
    Ok(Json(serde_json::json!({ "ok": true })))
}

pub async fn clear_notifications(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.directory.clear_notifications(&uid).await? {
        return Err(ApiError::UnknownUser(uid));
    }
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// Staff-only: schedule a session, refusing calendar collisions.
pub async fn create_session(
    State(state): State<AppState>,
    Json(body): Json<CreateSessionBody>,
) -> Result<Json<Session>, ApiError> {
    let author = require_staff(&state.directory, &body.acting_user_id)?;
    if roster_engine::clock::parse_hhmm(&body.time).is_none() {
        return Err(ApiError::BadRequest("time must be HH:MM".into()));
    }
    if body.max_spots == 0 {
        return Err(ApiError::BadRequest("maxSpots must be positive".into()));
    }

    // Two concurrent creates must not both pass the conflict check before
    // either one inserts.
    let _guard = state.create_lock.lock().await;
    let existing = state.registry.snapshots().await;
    validate_no_conflict(body.date, &body.time, &existing, None)?;

    let session = Session {
        id: uuid::Uuid::new_v4().to_string(),
        name: body.name,
        date: body.date,
        start_time: body.time,
        max_spots: body.max_spots,
        guest_window_opens_at: body.guest_window_opens_at,
        session_type: body.session_type,
        gender_restriction: body.gender_restriction.unwrap_or(GenderRestriction::All),
        allow_guests: body.allow_guests,
        status: SessionStatus::Open,
        created_by: body.acting_user_id.clone(),
        players: Vec::new(),
        waitlist: Vec::new(),
    };
    state.db.sessions().upsert(&session).await?;
    append_log(
        &state,
        LogEntry {
            action: "CREATE".into(),
            details: format!(
                "{} scheduled for {} at {}",
                session.name, session.date, session.start_time
            ),
            author_name: Some(author.display_name),
        },
    )
    .await;

    state
        .registry
        .spawn(session.clone(), state.db.clone(), state.directory.clone());
    crate::metrics::record_session_created();
    tracing::info!(session = %session.id, name = %session.name, "Session created");
    Ok(Json(session))
}

/// Staff-only: drop a session entirely (document and actor).
///
/// Deletion goes through the actor so it serializes with any mutation
/// already queued on the inbox; the actor retires after deleting.
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ActingUserBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let author = require_staff(&state.directory, &body.acting_user_id)?;
    send_event(&state, &id, |reply_tx| SessionEvent::Delete {
        deleted_by: author,
        reply_tx,
    })
    .await?;
    state.registry.remove(&id);
    tracing::info!(session = %id, by = %body.acting_user_id, "Session deleted");
    Ok(Json(serde_json::json!({ "ok": true })))
}

pub async fn join_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<JoinBody>,
) -> Result<Json<Session>, ApiError> {
    let actor = state
        .directory
        .actor_for(&body.user_id)
        .ok_or_else(|| ApiError::UnknownUser(body.user_id.clone()))?;
    if actor.role == Role::Pending {
        return Err(ApiError::Forbidden);
    }
    let request = JoinRequest {
        arrival: body.arrival,
        guest: body.guest,
        spectator: body.spectator,
    };
    send_event(&state, &id, |reply_tx| SessionEvent::Join {
        actor,
        request,
        reply_tx,
    })
    .await
    .map(Json)
}

pub async fn leave_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<LeaveBody>,
) -> Result<Json<Session>, ApiError> {
    send_event(&state, &id, |reply_tx| SessionEvent::Leave {
        user_id: body.user_id,
        reply_tx,
    })
    .await
    .map(Json)
}

pub async fn set_arrival(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ArrivalBody>,
) -> Result<Json<Session>, ApiError> {
    send_event(&state, &id, |reply_tx| SessionEvent::SetArrival {
        participant_id: body.participant_id,
        new_time: body.arrival,
        reply_tx,
    })
    .await
    .map(Json)
}

pub async fn set_attendance(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<AttendanceBody>,
) -> Result<Json<Session>, ApiError> {
    require_staff(&state.directory, &body.acting_user_id)?;
    send_event(&state, &id, |reply_tx| SessionEvent::SetAttendance {
        participant_id: body.participant_id,
        attended: body.attended,
        reply_tx,
    })
    .await
    .map(Json)
}

pub async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ActingUserBody>,
) -> Result<Json<Session>, ApiError> {
    let author = require_staff(&state.directory, &body.acting_user_id)?;
    send_event(&state, &id, |reply_tx| SessionEvent::Close {
        closed_by: author,
        reply_tx,
    })
    .await
    .map(Json)
}

// ============================================================================
// Helpers
// ============================================================================

fn require_staff(
    directory: &Directory,
    acting_user_id: &str,
) -> Result<roster_engine::model::Actor, ApiError> {
    let actor = directory
        .actor_for(acting_user_id)
        .ok_or_else(|| ApiError::UnknownUser(acting_user_id.to_string()))?;
    if !actor.role.is_staff() {
        return Err(ApiError::Forbidden);
    }
    Ok(actor)
}

/// Forward one event to a session actor and await its reply.
async fn send_event<F>(state: &AppState, id: &str, make: F) -> Result<Session, ApiError>
where
    F: FnOnce(oneshot::Sender<Result<Session, ApiError>>) -> SessionEvent,
{
    let tx = state
        .registry
        .sender(id)
        .ok_or_else(|| ApiError::UnknownSession(id.to_string()))?;
    let (reply_tx, reply_rx) = oneshot::channel();
    tx.send(make(reply_tx))
        .await
        .map_err(|_| ApiError::SessionGone)?;
    reply_rx.await.map_err(|_| ApiError::SessionGone)?
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::Pending => "pending",
        Role::Player => "player",
        Role::Admin => "admin",
        Role::Owner => "owner",
    }
}

/// What the affected user is told: approval, promotion to admin, or a
/// demotion back to pending. Other transitions stay silent.
fn role_change_message(previous: Role, new: Role) -> Option<String> {
    match (previous, new) {
        (Role::Pending, Role::Player) => Some("Your account was approved!".into()),
        (_, Role::Admin) => Some("You were promoted to admin!".into()),
        (_, Role::Pending) => Some("Your account is back to pending status.".into()),
        _ => None,
    }
}

async fn append_log(state: &AppState, entry: LogEntry) {
    let record = LogRecord::from_entry(entry, chrono::Utc::now().timestamp_millis());
    if let Err(e) = state.db.logs().append(&record).await {
        tracing::warn!(error = %e, "Audit log append failed");
    }
}
