//! Withdrawal and waitlist promotion.
//!
//! A host's departure always cascades to their linked guests; any spots
//! that free up are backfilled from the waitlist in FIFO order, skipping
//! entries whose declared arrival is too late to promote.

use crate::clock::{signed_diff_minutes, LATE_AFTER_MIN};
use crate::error::EngineError;
use crate::model::{LogEntry, NotificationCommand, RosterEntry, Session, SessionStatus};

/// Result of a successful withdrawal.
#[derive(Debug, Clone)]
pub struct Withdrawn {
    pub session: Session,
    /// Everyone removed: the leaving user plus their cascaded guests.
    pub removed: Vec<RosterEntry>,
    /// One command per promoted waitlister.
    pub notifications: Vec<NotificationCommand>,
    pub log: LogEntry,
}

/// Remove a user (and their guests) from both lists, then promote
/// eligible waitlisters into the freed spots.
pub fn withdraw(
    session: &Session,
    leaving_user_id: &str,
    now_ms: i64,
) -> Result<Withdrawn, EngineError> {
    if session.status == SessionStatus::Closed {
        return Err(EngineError::SessionClosed);
    }

    let leaves = |entry: &RosterEntry| {
        entry.participant_id == leaving_user_id
            || entry.linked_host_id.as_deref() == Some(leaving_user_id)
    };

    let mut session = session.clone();
    let mut removed = Vec::new();
    session.players.retain(|p| {
        let gone = leaves(p);
        if gone {
            removed.push(p.clone());
        }
        !gone
    });
    session.waitlist.retain(|p| {
        let gone = leaves(p);
        if gone {
            removed.push(p.clone());
        }
        !gone
    });

    if removed.is_empty() {
        return Err(EngineError::NotFound(leaving_user_id.to_string()));
    }

    let notifications = promote_waitlisted(&mut session, now_ms);

    let author = removed
        .iter()
        .find(|e| e.participant_id == leaving_user_id)
        .map(|e| e.display_name.clone());
    let names: Vec<&str> = removed.iter().map(|e| e.display_name.as_str()).collect();
    let log = LogEntry {
        action: "LEAVE".into(),
        details: format!("Left {}. Removed: {}", session.name, names.join(", ")),
        author_name: author,
    };

    Ok(Withdrawn {
        session,
        removed,
        notifications,
        log,
    })
}

/// Fill free player spots from the waitlist.
///
/// FIFO over insertion order, but only entries arriving within the
/// lateness window are eligible; once no eligible entry remains the loop
/// stops even if spots are still free. Championship and social waitlists
/// are never auto-filled. Each promotion notifies the promoted member,
/// or the host when the promoted entry is a guest.
pub(crate) fn promote_waitlisted(session: &mut Session, now_ms: i64) -> Vec<NotificationCommand> {
    if !session.session_type.auto_fills_waitlist() {
        return Vec::new();
    }

    let mut notifications = Vec::new();
    while (session.players.len() as u32) < session.max_spots && !session.waitlist.is_empty() {
        let candidate = session.waitlist.iter().position(|p| {
            signed_diff_minutes(&session.start_time, &p.arrival_estimate) <= LATE_AFTER_MIN
        });
        let Some(index) = candidate else {
            break;
        };
        let entry = session.waitlist.remove(index);
        notifications.push(promotion_notice(session, &entry, now_ms));
        session.players.push(entry);
    }
    notifications
}

fn promotion_notice(session: &Session, entry: &RosterEntry, now_ms: i64) -> NotificationCommand {
    match entry.linked_host_id.as_deref() {
        Some(host) if entry.is_guest => NotificationCommand {
            recipient_id: host.to_string(),
            message: format!(
                "Spot freed! Your guest {} moved up from the waitlist in {}.",
                entry.display_name, session.name
            ),
            created_at: now_ms,
        },
        _ => NotificationCommand {
            recipient_id: entry.participant_id.clone(),
            message: format!(
                "Spot freed! You moved up from the waitlist into {}.",
                session.name
            ),
            created_at: now_ms,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GenderRestriction, SessionType};

    fn entry(id: &str, arrival: &str, joined_at: i64) -> RosterEntry {
        RosterEntry {
            participant_id: id.into(),
            display_name: id.to_uppercase(),
            is_guest: false,
            linked_host_id: None,
            joined_at,
            arrival_estimate: arrival.into(),
            attended: None,
            guest_contact: None,
        }
    }

    fn guest_of(host: &str, id: &str, arrival: &str) -> RosterEntry {
        RosterEntry {
            participant_id: id.into(),
            display_name: format!("guest {id}"),
            is_guest: true,
            linked_host_id: Some(host.into()),
            joined_at: 0,
            arrival_estimate: arrival.into(),
            attended: None,
            guest_contact: None,
        }
    }

    fn session(max_spots: u32, session_type: SessionType) -> Session {
        Session {
            id: "s1".into(),
            name: "Thursday Volley".into(),
            date: chrono::NaiveDate::from_ymd_opt(2025, 12, 12).unwrap(),
            start_time: "19:00".into(),
            max_spots,
            guest_window_opens_at: 0,
            session_type,
            gender_restriction: GenderRestriction::All,
            allow_guests: true,
            status: SessionStatus::Open,
            created_by: "admin-001".into(),
            players: vec![],
            waitlist: vec![],
        }
    }

    #[test]
    fn withdrawal_promotes_first_eligible_waitlister() {
        let mut s = session(2, SessionType::Casual);
        s.players = vec![entry("a", "19:00", 1), entry("b", "19:00", 2)];
        s.waitlist = vec![entry("c", "19:10", 3)];

        let out = withdraw(&s, "a", 0).unwrap();
        let ids: Vec<&str> = out
            .session
            .players
            .iter()
            .map(|p| p.participant_id.as_str())
            .collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert!(out.session.waitlist.is_empty());
        assert_eq!(out.notifications.len(), 1);
        assert_eq!(out.notifications[0].recipient_id, "c");
        assert_eq!(out.log.action, "LEAVE");
    }

    #[test]
    fn promotion_skips_late_waitlisters_but_keeps_fifo() {
        let mut s = session(2, SessionType::Casual);
        s.players = vec![entry("a", "19:00", 1), entry("b", "19:00", 2)];
        // "late" joined first but is ineligible; "ok" is the first eligible.
        s.waitlist = vec![
            entry("late", "20:00", 3),
            entry("ok", "19:30", 4),
            entry("also-ok", "19:00", 5),
        ];

        let out = withdraw(&s, "a", 0).unwrap();
        assert_eq!(out.session.players[1].participant_id, "ok");
        let left: Vec<&str> = out
            .session
            .waitlist
            .iter()
            .map(|p| p.participant_id.as_str())
            .collect();
        assert_eq!(left, vec!["late", "also-ok"]);
    }

    #[test]
    fn promotion_stops_when_no_eligible_entry_remains() {
        let mut s = session(3, SessionType::Casual);
        s.players = vec![entry("a", "19:00", 1)];
        s.waitlist = vec![entry("late", "21:00", 2)];

        let out = withdraw(&s, "a", 0).unwrap();
        assert!(out.session.players.is_empty());
        assert_eq!(out.session.waitlist.len(), 1);
        assert!(out.notifications.is_empty());
    }

    #[test]
    fn host_departure_cascades_to_guests_in_both_lists() {
        let mut s = session(3, SessionType::Casual);
        s.players = vec![entry("a", "19:00", 1), guest_of("a", "guest-1", "19:00")];
        s.waitlist = vec![guest_of("a", "guest-2", "19:00"), entry("b", "19:00", 2)];

        let out = withdraw(&s, "a", 0).unwrap();
        assert_eq!(out.removed.len(), 3);
        assert!(out.session.players.iter().all(|p| p.participant_id == "b"));
        assert!(out.session.waitlist.is_empty());
        // b was promoted into the freed spots.
        assert_eq!(out.session.players.len(), 1);
    }

    #[test]
    fn guest_promotion_notifies_the_host() {
        let mut s = session(2, SessionType::Casual);
        s.players = vec![entry("a", "19:00", 1), entry("b", "19:00", 2)];
        s.waitlist = vec![guest_of("b", "guest-1", "19:00")];

        let out = withdraw(&s, "a", 0).unwrap();
        assert_eq!(out.notifications.len(), 1);
        assert_eq!(out.notifications[0].recipient_id, "b");
        assert!(out.notifications[0].message.contains("Your guest"));
    }

    #[test]
    fn championship_and_social_waitlists_are_never_autofilled() {
        for kind in [SessionType::Championship, SessionType::Social] {
            let mut s = session(2, kind);
            s.players = vec![entry("a", "19:00", 1), entry("b", "19:00", 2)];
            s.waitlist = vec![entry("c", "19:00", 3)];

            let out = withdraw(&s, "a", 0).unwrap();
            assert_eq!(out.session.players.len(), 1);
            assert_eq!(out.session.waitlist.len(), 1);
            assert!(out.notifications.is_empty());
        }
    }

    #[test]
    fn withdrawing_an_absent_user_is_not_found() {
        let s = session(2, SessionType::Casual);
        let err = withdraw(&s, "ghost", 0).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn closed_session_is_immutable() {
        let mut s = session(2, SessionType::Casual);
        s.players = vec![entry("a", "19:00", 1)];
        s.status = SessionStatus::Closed;
        assert_eq!(withdraw(&s, "a", 0).unwrap_err(), EngineError::SessionClosed);
    }
}
