//! Post-game attendance reconciliation.
//!
//! Toggling the presence flag adjusts cumulative user stats symmetrically,
//! so an admin correcting a mistake leaves the numbers exactly where they
//! started. Counters clamp at zero. Guests carry the flag but no stats.

use crate::error::EngineError;
use crate::model::{Session, StatDelta, UserStats};

/// Set an entry's `attended` flag and compute the resulting stat change.
///
/// Idempotent: storing the already-stored value changes nothing and emits
/// no delta. `stats` are the user's current counters; `None` (unknown
/// user, or a guest entry) suppresses the delta. Works on closed sessions,
/// since reconciliation happens after close.
pub fn reconcile_attendance(
    session: &Session,
    participant_id: &str,
    attended: bool,
    stats: Option<UserStats>,
) -> Result<(Session, Option<StatDelta>), EngineError> {
    let mut session = session.clone();
    let entry = session
        .players
        .iter_mut()
        .chain(session.waitlist.iter_mut())
        .find(|p| p.participant_id == participant_id)
        .ok_or_else(|| EngineError::NotFound(participant_id.to_string()))?;

    let previous = entry.attended;
    if previous == Some(attended) {
        return Ok((session, None));
    }
    entry.attended = Some(attended);

    if entry.is_guest {
        return Ok((session, None));
    }
    let delta = stats.map(|s| apply_toggle(s, previous, attended));
    Ok((session, delta))
}

fn apply_toggle(stats: UserStats, previous: Option<bool>, attended: bool) -> StatDelta {
    if attended {
        StatDelta {
            attended: stats.attended + 1,
            // Undo the penalty if this corrects an earlier absence mark.
            missed: if previous == Some(false) {
                stats.missed.saturating_sub(1)
            } else {
                stats.missed
            },
        }
    } else {
        StatDelta {
            attended: stats.attended.saturating_sub(1),
            missed: stats.missed + 1,
        }
    }
}
