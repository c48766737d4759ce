//! # roster-engine
//!
//! The pure Session Roster & Admission Engine behind rosterd: given a
//! session value and one event (join, leave, arrival change, attendance
//! toggle, sweep tick), decide the authoritative next state of the player
//! list and waitlist, plus the side effects that transition triggers.
//!
//! The engine performs no I/O. Every operation is a synchronous function
//! over an immutable input [`Session`](model::Session), returning a new
//! session value together with explicit command values
//! ([`NotificationCommand`](model::NotificationCommand),
//! [`LogEntry`](model::LogEntry), [`StatDelta`](model::StatDelta)) for the
//! caller to persist and dispatch. Callers must serialize mutations per
//! session (a single-writer lock, an optimistic version check, or an
//! actor owning the session's state); rosterd uses the actor form.
//!
//! ```rust
//! use roster_engine::admission::{admit, JoinRequest, Placement};
//! use roster_engine::model::*;
//!
//! let session = Session {
//!     id: "s1".into(),
//!     name: "Thursday Volley".into(),
//!     date: "2025-12-12".parse().unwrap(),
//!     start_time: "19:00".into(),
//!     max_spots: 18,
//!     guest_window_opens_at: 0,
//!     session_type: SessionType::Casual,
//!     gender_restriction: GenderRestriction::All,
//!     allow_guests: true,
//!     status: SessionStatus::Open,
//!     created_by: "admin-001".into(),
//!     players: vec![],
//!     waitlist: vec![],
//! };
//! let ana = Actor {
//!     id: "user-001".into(),
//!     display_name: "Ana".into(),
//!     gender: Gender::F,
//!     role: Role::Player,
//! };
//! let request = JoinRequest { arrival: "19:00".into(), guest: None, spectator: false };
//!
//! let admitted = admit(&session, &ana, &request, &[], 0).unwrap();
//! assert_eq!(admitted.placement, Placement::Players);
//! assert_eq!(admitted.session.players.len(), 1);
//! ```

#![deny(clippy::all)]

pub mod admission;
pub mod arrival;
pub mod attendance;
pub mod broadcast;
pub mod clock;
pub mod error;
pub mod model;
pub mod schedule;
pub mod withdrawal;

pub use admission::{admit, Admitted, JoinRequest, Placement};
pub use arrival::mutate_arrival;
pub use attendance::reconcile_attendance;
pub use broadcast::{capacity_threshold, Threshold};
pub use error::EngineError;
pub use schedule::{sweep_auto_close, validate_no_conflict, Sweep};
pub use withdrawal::{withdraw, Withdrawn};
