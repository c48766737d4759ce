//! Session, roster and side-effect command types.
//!
//! Field names (through serde's camelCase renames) and the `HH:MM` time
//! format are the wire contract the persistence and API layers preserve.

use serde::{Deserialize, Serialize};

/// Gender as consumed from the identity subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    M,
    F,
    /// Other / undisclosed; admitted by every gender restriction.
    O,
}

/// Membership role, as consumed from the identity subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Pending,
    Player,
    Admin,
    Owner,
}

impl Role {
    /// Admins and owners may create, close and reconcile sessions.
    pub fn is_staff(self) -> bool {
        matches!(self, Role::Admin | Role::Owner)
    }
}

/// What kind of session this is; drives lateness and waitlist rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    Casual,
    Training,
    /// Waitlist doubles as the supporters list and is never auto-filled.
    /// Guests are banned outright.
    Championship,
    /// No lateness rule, no auto-promotion.
    Social,
}

impl SessionType {
    /// Whether a late declared arrival diverts an entrant to the waitlist.
    pub fn enforces_lateness(self) -> bool {
        !matches!(self, SessionType::Championship | SessionType::Social)
    }

    /// Whether freed player spots are backfilled from the waitlist.
    pub fn auto_fills_waitlist(self) -> bool {
        !matches!(self, SessionType::Championship | SessionType::Social)
    }
}

/// Who may take a player spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenderRestriction {
    M,
    F,
    #[serde(rename = "all")]
    All,
}

impl GenderRestriction {
    /// `O` passes every restriction; otherwise the gender must match.
    pub fn admits(self, gender: Gender) -> bool {
        match self {
            GenderRestriction::All => true,
            GenderRestriction::M => matches!(gender, Gender::M | Gender::O),
            GenderRestriction::F => matches!(gender, Gender::F | Gender::O),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Open,
    Closed,
}

/// Cumulative per-user attendance stats, mutated only through
/// [`StatDelta`](crate::model::StatDelta) values the engine emits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub attended: u32,
    pub missed: u32,
}

/// The slice of the external `User` the engine consumes.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: String,
    /// Nickname-or-full-name, resolved by the caller.
    pub display_name: String,
    pub gender: Gender,
    pub role: Role,
}

/// Directory snapshot row for threshold broadcasts and the auto-close
/// sweep. The engine never sees more of a user than this.
#[derive(Debug, Clone)]
pub struct DirectoryUser {
    pub id: String,
    pub role: Role,
}

/// Contact details for a guest entry; the display-name snapshot is built
/// from first and last name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestInfo {
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

impl GuestInfo {
    pub fn display_name(&self) -> String {
        if self.last_name.is_empty() {
            self.first_name.clone()
        } else {
            format!("{} {}", self.first_name, self.last_name)
        }
    }
}

/// One occupant of a session's player or waitlist array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    /// User id, or a generated `guest-<uuid>` id.
    pub participant_id: String,
    /// Snapshot at join time, not live-linked to the user document.
    pub display_name: String,
    pub is_guest: bool,
    /// Set iff `is_guest`; the member responsible for this entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_host_id: Option<String>,
    /// Unix millis.
    pub joined_at: i64,
    /// `HH:MM`.
    pub arrival_estimate: String,
    /// Unset until the session is reconciled post-game.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attended: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_contact: Option<GuestInfo>,
}

/// A recurring sport session and its two ordered rosters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub name: String,
    /// Calendar day. Stored as a date, never a floating-timezone instant,
    /// so the day-minute rollover arithmetic stays correct.
    pub date: chrono::NaiveDate,
    /// Kickoff, `HH:MM`.
    pub start_time: String,
    pub max_spots: u32,
    /// Unix millis before which guest admission is refused.
    pub guest_window_opens_at: i64,
    #[serde(rename = "type")]
    pub session_type: SessionType,
    pub gender_restriction: GenderRestriction,
    pub allow_guests: bool,
    pub status: SessionStatus,
    pub created_by: String,
    pub players: Vec<RosterEntry>,
    pub waitlist: Vec<RosterEntry>,
}

impl Session {
    pub fn is_full(&self) -> bool {
        self.players.len() as u32 >= self.max_spots
    }

    /// Whether the participant occupies either list.
    pub fn contains(&self, participant_id: &str) -> bool {
        self.players.iter().any(|p| p.participant_id == participant_id)
            || self.waitlist.iter().any(|p| p.participant_id == participant_id)
    }

    /// Whether a member currently holds a confirmed (players-array) spot.
    pub fn holds_spot(&self, user_id: &str) -> bool {
        self.players
            .iter()
            .any(|p| !p.is_guest && p.participant_id == user_id)
    }

    pub fn find_entry(&self, participant_id: &str) -> Option<&RosterEntry> {
        self.players
            .iter()
            .chain(self.waitlist.iter())
            .find(|p| p.participant_id == participant_id)
    }
}

/// A notification the engine decided to emit; delivery is the caller's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationCommand {
    pub recipient_id: String,
    pub message: String,
    /// Unix millis.
    pub created_at: i64,
}

/// One audit-log line describing a roster transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// e.g. `JOIN`, `LEAVE`, `AUTO_CLOSE`.
    pub action: String,
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
}

/// New absolute stat values for one user. Absolute rather than signed so
/// the clamp-at-zero rule is decided here, not by each caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatDelta {
    pub attended: u32,
    pub missed: u32,
}
