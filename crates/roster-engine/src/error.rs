//! Engine error kinds.
//!
//! Every variant is the rejection of a single attempted mutation, never a
//! partial application: an operation either returns a whole new session
//! value or one of these.

use thiserror::Error;

/// Why a roster mutation was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("session is closed")]
    SessionClosed,

    #[error("already on this session's lists")]
    AlreadyJoined,

    #[error("guests are not allowed in this session")]
    GuestsNotAllowed,

    #[error("the guest window has not opened yet")]
    GuestWindowClosed,

    #[error("this session is restricted to another gender")]
    GenderRestricted,

    #[error("missing or invalid arrival time")]
    InvalidArrival,

    #[error("arrival more than 4 hours after kickoff")]
    ArrivalTooLate,

    #[error("another open session starts within 1h50 of {0}")]
    SchedulingConflict(String),

    #[error("no such participant or session: {0}")]
    NotFound(String),
}

impl EngineError {
    /// Static code for metrics labeling and wire error bodies.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SessionClosed => "session_closed",
            Self::AlreadyJoined => "already_joined",
            Self::GuestsNotAllowed => "guests_not_allowed",
            Self::GuestWindowClosed => "guest_window_closed",
            Self::GenderRestricted => "gender_restricted",
            Self::InvalidArrival => "invalid_arrival",
            Self::ArrivalTooLate => "arrival_too_late",
            Self::SchedulingConflict(_) => "scheduling_conflict",
            Self::NotFound(_) => "not_found",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(EngineError::SessionClosed.error_code(), "session_closed");
        assert_eq!(EngineError::AlreadyJoined.error_code(), "already_joined");
        assert_eq!(
            EngineError::SchedulingConflict("20:49".into()).error_code(),
            "scheduling_conflict"
        );
    }
}
