//! Session scheduling: conflict validation and the auto-close sweep.

use chrono::{DateTime, NaiveTime, Utc};

use crate::clock::{signed_diff_minutes, to_minutes, AUTO_CLOSE_AFTER_MIN, CONFLICT_GAP_MIN};
use crate::error::EngineError;
use crate::model::{DirectoryUser, LogEntry, NotificationCommand, Session, SessionStatus};

/// Refuse a candidate slot when any *other* open session on the same
/// calendar date starts within the minimum gap (strictly; two sessions
/// exactly the gap apart coexist). Closed sessions never conflict;
/// `exclude` skips the session being edited.
pub fn validate_no_conflict(
    date: chrono::NaiveDate,
    time: &str,
    sessions: &[Session],
    exclude: Option<&str>,
) -> Result<(), EngineError> {
    for other in sessions {
        if other.status != SessionStatus::Open || other.date != date {
            continue;
        }
        if exclude == Some(other.id.as_str()) {
            continue;
        }
        // Wrap distance around midnight, so a 23:00/00:30 pair conflicts
        // no matter which of the two is the candidate.
        let diff = signed_diff_minutes(time, &other.start_time).abs();
        let gap = diff.min(1440 - diff);
        if gap < CONFLICT_GAP_MIN {
            return Err(EngineError::SchedulingConflict(other.name.clone()));
        }
    }
    Ok(())
}

/// Outcome of one auto-close sweep.
#[derive(Debug, Clone, Default)]
pub struct Sweep {
    /// The stale sessions, already flipped to `Closed`.
    pub closed: Vec<Session>,
    /// One reminder per admin/owner per closed session.
    pub notifications: Vec<NotificationCommand>,
    pub logs: Vec<LogEntry>,
}

/// Close every open session whose kickoff lies more than four hours in
/// the past and remind the staff that attendance needs reconciling.
///
/// Idempotent across runs: the returned sessions are closed, so a second
/// sweep over the persisted state selects nothing.
pub fn sweep_auto_close(
    sessions: &[Session],
    directory: &[DirectoryUser],
    now: DateTime<Utc>,
) -> Sweep {
    let now_ms = now.timestamp_millis();
    let mut sweep = Sweep::default();

    for session in sessions {
        if session.status != SessionStatus::Open {
            continue;
        }
        let start_min = to_minutes(&session.start_time);
        let start_of_day = session.date.and_time(NaiveTime::MIN);
        let elapsed_min =
            (now.naive_utc() - start_of_day).num_minutes() - i64::from(start_min);
        if elapsed_min <= AUTO_CLOSE_AFTER_MIN {
            continue;
        }

        let mut closed = session.clone();
        closed.status = SessionStatus::Closed;

        for staff in directory.iter().filter(|u| u.role.is_staff()) {
            sweep.notifications.push(NotificationCommand {
                recipient_id: staff.id.clone(),
                message: format!(
                    "{} ({}) was auto-closed 4 hours after kickoff. Attendance needs manual reconciliation.",
                    closed.name, closed.date
                ),
                created_at: now_ms,
            });
        }
        sweep.logs.push(LogEntry {
            action: "AUTO_CLOSE".into(),
            details: format!("{} closed automatically 4h after kickoff", closed.name),
            author_name: None,
        });
        sweep.closed.push(closed);
    }

    sweep
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GenderRestriction, Role, SessionType};
    use chrono::NaiveDate;

    fn session(id: &str, date: &str, time: &str) -> Session {
        Session {
            id: id.into(),
            name: format!("session {id}"),
            date: date.parse().unwrap(),
            start_time: time.into(),
            max_spots: 18,
            guest_window_opens_at: 0,
            session_type: SessionType::Casual,
            gender_restriction: GenderRestriction::All,
            allow_guests: true,
            status: SessionStatus::Open,
            created_by: "admin-001".into(),
            players: vec![],
            waitlist: vec![],
        }
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn gap_of_exactly_110_minutes_does_not_conflict() {
        let existing = [session("s1", "2025-12-12", "19:00")];
        assert!(validate_no_conflict(date("2025-12-12"), "20:50", &existing, None).is_ok());
        assert_eq!(
            validate_no_conflict(date("2025-12-12"), "20:49", &existing, None).unwrap_err(),
            EngineError::SchedulingConflict("session s1".into())
        );
    }

    #[test]
    fn conflicts_are_symmetric_around_the_candidate() {
        let existing = [session("s1", "2025-12-12", "19:00")];
        assert!(validate_no_conflict(date("2025-12-12"), "17:10", &existing, None).is_ok());
        assert!(validate_no_conflict(date("2025-12-12"), "17:11", &existing, None).is_err());
    }

    #[test]
    fn other_dates_and_closed_sessions_never_conflict() {
        let mut closed = session("s1", "2025-12-12", "19:00");
        closed.status = SessionStatus::Closed;
        let existing = [closed, session("s2", "2025-12-13", "19:00")];
        assert!(validate_no_conflict(date("2025-12-12"), "19:00", &existing, None).is_ok());
    }

    #[test]
    fn midnight_adjacent_times_conflict_in_both_orders() {
        // 23:00 and 00:30 are 90 minutes apart across midnight.
        let evening = [session("s1", "2025-12-12", "23:00")];
        assert!(validate_no_conflict(date("2025-12-12"), "00:30", &evening, None).is_err());
        let small_hours = [session("s2", "2025-12-12", "00:30")];
        assert!(validate_no_conflict(date("2025-12-12"), "23:00", &small_hours, None).is_err());
        // 21:00 against 00:30 is 210 minutes, clear of the gap.
        assert!(validate_no_conflict(date("2025-12-12"), "21:00", &small_hours, None).is_ok());
    }

    #[test]
    fn editing_a_session_skips_itself() {
        let existing = [session("s1", "2025-12-12", "19:00")];
        assert!(
            validate_no_conflict(date("2025-12-12"), "19:30", &existing, Some("s1")).is_ok()
        );
    }

    #[test]
    fn sweep_closes_stale_sessions_and_notifies_staff() {
        let sessions = [
            session("old", "2025-12-12", "19:00"),
            session("fresh", "2025-12-12", "21:00"),
        ];
        let directory = [
            DirectoryUser { id: "admin".into(), role: Role::Admin },
            DirectoryUser { id: "owner".into(), role: Role::Owner },
            DirectoryUser { id: "player".into(), role: Role::Player },
        ];
        // 23:30 the same evening: 19:00 is 4h30 old, 21:00 only 2h30.
        let now = "2025-12-12T23:30:00Z".parse().unwrap();

        let sweep = sweep_auto_close(&sessions, &directory, now);
        assert_eq!(sweep.closed.len(), 1);
        assert_eq!(sweep.closed[0].id, "old");
        assert_eq!(sweep.closed[0].status, SessionStatus::Closed);
        let recipients: Vec<&str> =
            sweep.notifications.iter().map(|n| n.recipient_id.as_str()).collect();
        assert_eq!(recipients, vec!["admin", "owner"]);
        assert_eq!(sweep.logs.len(), 1);
    }

    #[test]
    fn sweep_skips_closed_sessions() {
        let mut s = session("old", "2025-12-12", "19:00");
        s.status = SessionStatus::Closed;
        let now = "2025-12-13T12:00:00Z".parse().unwrap();
        let sweep = sweep_auto_close(&[s], &[], now);
        assert!(sweep.closed.is_empty());
        assert!(sweep.notifications.is_empty());
    }

    #[test]
    fn exactly_four_hours_is_not_yet_stale() {
        let sessions = [session("s1", "2025-12-12", "19:00")];
        let now = "2025-12-12T23:00:00Z".parse().unwrap();
        assert!(sweep_auto_close(&sessions, &[], now).closed.is_empty());
        let later = "2025-12-12T23:01:00Z".parse().unwrap();
        assert_eq!(sweep_auto_close(&sessions, &[], later).closed.len(), 1);
    }
}
