//! Arrival-time mutation.
//!
//! Changing a declared arrival can move an entry between lists: a player
//! who becomes late is demoted (and their spot backfilled), a waitlister
//! who becomes on-time is promoted when space allows. Types without a
//! lateness rule only ever update the time in place.

use crate::clock::{parse_hhmm, signed_diff_minutes, LATE_AFTER_MIN};
use crate::error::EngineError;
use crate::model::{NotificationCommand, Session, SessionStatus};
use crate::withdrawal::promote_waitlisted;

/// Re-evaluate an entry's list membership under a new declared arrival.
pub fn mutate_arrival(
    session: &Session,
    participant_id: &str,
    new_time: &str,
    now_ms: i64,
) -> Result<(Session, Vec<NotificationCommand>), EngineError> {
    if session.status == SessionStatus::Closed {
        return Err(EngineError::SessionClosed);
    }
    if parse_hhmm(new_time).is_none() {
        return Err(EngineError::InvalidArrival);
    }

    let mut session = session.clone();

    if !session.session_type.enforces_lateness() {
        // No demotion/promotion for these types; overwrite wherever found.
        let entry = session
            .players
            .iter_mut()
            .chain(session.waitlist.iter_mut())
            .find(|p| p.participant_id == participant_id)
            .ok_or_else(|| EngineError::NotFound(participant_id.to_string()))?;
        entry.arrival_estimate = new_time.to_string();
        return Ok((session, Vec::new()));
    }

    let now_late = signed_diff_minutes(&session.start_time, new_time) > LATE_AFTER_MIN;

    if let Some(index) = session
        .players
        .iter()
        .position(|p| p.participant_id == participant_id)
    {
        if now_late {
            // Demote, then backfill the freed spot from the waitlist.
            let mut entry = session.players.remove(index);
            entry.arrival_estimate = new_time.to_string();
            session.waitlist.push(entry);
            let notifications = promote_waitlisted(&mut session, now_ms);
            return Ok((session, notifications));
        }
        session.players[index].arrival_estimate = new_time.to_string();
        return Ok((session, Vec::new()));
    }

    if let Some(index) = session
        .waitlist
        .iter()
        .position(|p| p.participant_id == participant_id)
    {
        if !now_late && !session.is_full() {
            let mut entry = session.waitlist.remove(index);
            entry.arrival_estimate = new_time.to_string();
            let notice = NotificationCommand {
                recipient_id: entry
                    .linked_host_id
                    .clone()
                    .filter(|_| entry.is_guest)
                    .unwrap_or_else(|| entry.participant_id.clone()),
                message: format!(
                    "Your new arrival time puts you in the main list for {}.",
                    session.name
                ),
                created_at: now_ms,
            };
            session.players.push(entry);
            return Ok((session, vec![notice]));
        }
        session.waitlist[index].arrival_estimate = new_time.to_string();
        return Ok((session, Vec::new()));
    }

    Err(EngineError::NotFound(participant_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GenderRestriction, RosterEntry, SessionType};

    fn entry(id: &str, arrival: &str) -> RosterEntry {
        RosterEntry {
            participant_id: id.into(),
            display_name: id.to_uppercase(),
            is_guest: false,
            linked_host_id: None,
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
    fn player_turning_late_is_demoted_and_spot_backfilled() {
        let mut s = session(2, SessionType::Casual);
        s.players = vec![entry("a", "19:00"), entry("b", "19:00")];
        s.waitlist = vec![entry("c", "19:20")];

        let (s, notes) = mutate_arrival(&s, "a", "20:00", 0).unwrap();
        let players: Vec<&str> = s.players.iter().map(|p| p.participant_id.as_str()).collect();
        assert_eq!(players, vec!["b", "c"]);
        assert_eq!(s.waitlist[0].participant_id, "a");
        assert_eq!(s.waitlist[0].arrival_estimate, "20:00");
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].recipient_id, "c");
    }

    #[test]
    fn waitlister_turning_on_time_is_promoted_when_space_allows() {
        let mut s = session(2, SessionType::Casual);
        s.players = vec![entry("a", "19:00")];
        s.waitlist = vec![entry("b", "20:30")];

        let (s, notes) = mutate_arrival(&s, "b", "19:15", 0).unwrap();
        assert_eq!(s.players.len(), 2);
        assert!(s.waitlist.is_empty());
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].recipient_id, "b");
    }

    #[test]
    fn waitlister_stays_put_when_session_is_full() {
        let mut s = session(1, SessionType::Casual);
        s.players = vec![entry("a", "19:00")];
        s.waitlist = vec![entry("b", "20:30")];

        let (s, notes) = mutate_arrival(&s, "b", "19:00", 0).unwrap();
        assert_eq!(s.players.len(), 1);
        assert_eq!(s.waitlist[0].arrival_estimate, "19:00");
        assert!(notes.is_empty());
    }

    #[test]
    fn on_time_change_updates_in_place() {
        let mut s = session(2, SessionType::Casual);
        s.players = vec![entry("a", "19:00")];

        let (s, notes) = mutate_arrival(&s, "a", "19:25", 0).unwrap();
        assert_eq!(s.players[0].arrival_estimate, "19:25");
        assert!(notes.is_empty());
    }

    #[test]
    fn championship_and_social_only_overwrite() {
        for kind in [SessionType::Championship, SessionType::Social] {
            let mut s = session(1, kind);
            s.players = vec![entry("a", "19:00")];
            s.waitlist = vec![entry("b", "19:00")];

            let (s, notes) = mutate_arrival(&s, "a", "22:00", 0).unwrap();
            assert_eq!(s.players[0].arrival_estimate, "22:00");
            assert_eq!(s.players[0].participant_id, "a");
            assert!(notes.is_empty());

            let (s, _) = mutate_arrival(&s, "b", "19:05", 0).unwrap();
            assert_eq!(s.waitlist[0].arrival_estimate, "19:05");
        }
    }

    #[test]
    fn unknown_participant_is_not_found() {
        let s = session(2, SessionType::Casual);
        let err = mutate_arrival(&s, "ghost", "19:00", 0).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn invalid_time_is_rejected() {
        let mut s = session(2, SessionType::Casual);
        s.players = vec![entry("a", "19:00")];
        let err = mutate_arrival(&s, "a", "25:99", 0).unwrap_err();
        assert_eq!(err, EngineError::InvalidArrival);
    }
}
