//! Admission: validate eligibility and place an entrant.
//!
//! Pure function of the current session value; the caller persists the
//! returned session and dispatches the returned commands.

use crate::broadcast::capacity_threshold;
use crate::clock::{parse_hhmm, signed_diff_minutes, ADMISSION_CUTOFF_MIN, LATE_AFTER_MIN};
use crate::error::EngineError;
use crate::model::{
    Actor, DirectoryUser, GuestInfo, LogEntry, NotificationCommand, Role, RosterEntry, Session,
    SessionStatus, SessionType,
};

/// Join parameters beyond the acting user's identity.
#[derive(Debug, Clone, Default)]
pub struct JoinRequest {
    /// Declared arrival, `HH:MM`.
    pub arrival: String,
    /// Present iff this join adds a guest on the actor's behalf.
    pub guest: Option<GuestInfo>,
    /// Championship-only: join the supporters list instead of competing.
    pub spectator: bool,
}

/// Which list the entrant landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Players,
    Waitlist,
}

/// Result of a successful admission.
#[derive(Debug, Clone)]
pub struct Admitted {
    pub session: Session,
    /// Id of the entry just created (a guest id differs from the actor's).
    pub participant_id: String,
    pub placement: Placement,
    pub notifications: Vec<NotificationCommand>,
    pub log: LogEntry,
}

/// Validate and place one entrant into `players` or `waitlist`.
///
/// `directory` is a snapshot of all known users, used only to address the
/// capacity threshold broadcast; `now_ms` stamps the entry and any
/// notifications and gates the guest window.
pub fn admit(
    session: &Session,
    actor: &Actor,
    request: &JoinRequest,
    directory: &[DirectoryUser],
    now_ms: i64,
) -> Result<Admitted, EngineError> {
    if session.status == SessionStatus::Closed {
        return Err(EngineError::SessionClosed);
    }

    let is_guest = request.guest.is_some();
    if !is_guest && session.contains(&actor.id) {
        return Err(EngineError::AlreadyJoined);
    }

    if is_guest {
        if !session.allow_guests || session.session_type == SessionType::Championship {
            return Err(EngineError::GuestsNotAllowed);
        }
        if now_ms < session.guest_window_opens_at {
            return Err(EngineError::GuestWindowClosed);
        }
    }

    // The spectator flag only means something in a championship.
    let spectator = request.spectator && session.session_type == SessionType::Championship;

    if !is_guest && !spectator && !session.gender_restriction.admits(actor.gender) {
        return Err(EngineError::GenderRestricted);
    }

    if parse_hhmm(&request.arrival).is_none() {
        return Err(EngineError::InvalidArrival);
    }
    let diff = signed_diff_minutes(&session.start_time, &request.arrival);
    if diff > ADMISSION_CUTOFF_MIN {
        return Err(EngineError::ArrivalTooLate);
    }

    let is_late = session.session_type.enforces_lateness() && diff > LATE_AFTER_MIN;
    let entry = build_entry(actor, request, now_ms);
    let participant_id = entry.participant_id.clone();
    let log = join_log(session, actor, &entry, is_guest);

    let mut session = session.clone();
    if spectator || session.is_full() || is_late {
        session.waitlist.push(entry);
        return Ok(Admitted {
            session,
            participant_id,
            placement: Placement::Waitlist,
            notifications: Vec::new(),
            log,
        });
    }

    let before = session.players.len();
    session.players.push(entry);
    debug_assert!(session.players.len() as u32 <= session.max_spots);
    let notifications = threshold_broadcast(&session, before, directory, now_ms);
    Ok(Admitted {
        session,
        participant_id,
        placement: Placement::Players,
        notifications,
        log,
    })
}

fn build_entry(actor: &Actor, request: &JoinRequest, now_ms: i64) -> RosterEntry {
    match &request.guest {
        Some(info) => RosterEntry {
            participant_id: format!("guest-{}", uuid::Uuid::new_v4()),
            display_name: info.display_name(),
            is_guest: true,
            linked_host_id: Some(actor.id.clone()),
            joined_at: now_ms,
            arrival_estimate: request.arrival.clone(),
            attended: None,
            guest_contact: Some(info.clone()),
        },
        None => RosterEntry {
            participant_id: actor.id.clone(),
            display_name: actor.display_name.clone(),
            is_guest: false,
            linked_host_id: None,
            joined_at: now_ms,
            arrival_estimate: request.arrival.clone(),
            attended: None,
            guest_contact: None,
        },
    }
}

fn join_log(session: &Session, actor: &Actor, entry: &RosterEntry, is_guest: bool) -> LogEntry {
    let details = if is_guest {
        format!(
            "Guest {} added by {} in {} (arrival {})",
            entry.display_name, actor.display_name, session.name, entry.arrival_estimate
        )
    } else {
        format!(
            "{} joined {} (arrival {})",
            actor.display_name, session.name, entry.arrival_estimate
        )
    };
    LogEntry {
        action: "JOIN".into(),
        details,
        author_name: Some(actor.display_name.clone()),
    }
}

/// Broadcast to every non-pending user when the players count lands
/// exactly on a threshold, with the text keyed on whether the recipient
/// already holds a spot.
fn threshold_broadcast(
    session: &Session,
    before: usize,
    directory: &[DirectoryUser],
    now_ms: i64,
) -> Vec<NotificationCommand> {
    let Some(threshold) = capacity_threshold(before, session.players.len(), session.max_spots)
    else {
        return Vec::new();
    };
    directory
        .iter()
        .filter(|u| u.role != Role::Pending)
        .map(|u| NotificationCommand {
            recipient_id: u.id.clone(),
            message: threshold.message_for(&session.name, session.holds_spot(&u.id)),
            created_at: now_ms,
        })
        .collect()
}
