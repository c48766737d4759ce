//! Day-minute arithmetic over `HH:MM` wire strings.
//!
//! Every other module classifies lateness, the admission cutoff and the
//! scheduling gap through these two functions, so the rollover rule lives
//! in exactly one place.

/// Minutes after the start time before an arrival counts as late.
pub const LATE_AFTER_MIN: i32 = 30;

/// Nobody may queue to arrive more than this many minutes after kickoff.
pub const ADMISSION_CUTOFF_MIN: i32 = 240;

/// Two open sessions on the same date must start at least this far apart.
pub const CONFLICT_GAP_MIN: i32 = 110;

/// Open sessions older than this are swept closed.
pub const AUTO_CLOSE_AFTER_MIN: i64 = 240;

/// Strict `HH:MM` parser. Returns the day-minute offset, or `None` for
/// anything that is not a well-formed 24h time.
pub fn parse_hhmm(s: &str) -> Option<u16> {
    let (h, m) = s.split_once(':')?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 {
        return None;
    }
    let h: u16 = h.parse().ok()?;
    let m: u16 = m.parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    Some(h * 60 + m)
}

/// Lenient `HH:MM` parser used everywhere a roster entry's stored time is
/// read back. Malformed or empty input yields 0 rather than an error: a
/// corrupt arrival display must never abort a promotion sweep. Admission
/// validates presence with [`parse_hhmm`] before a time ever gets stored.
pub fn to_minutes(s: &str) -> i32 {
    let Some((h, m)) = s.split_once(':') else {
        return 0;
    };
    let h: i32 = h.parse().unwrap_or(0);
    let m: i32 = m.parse().unwrap_or(0);
    h * 60 + m
}

/// Signed difference `candidate - reference`, in minutes.
///
/// A session that starts late at night can have arrivals recorded after
/// midnight; a raw difference below -12h is treated as next-day and gains
/// a full day. The 12h pivot is a fixed design choice, not configurable.
pub fn signed_diff_minutes(reference: &str, candidate: &str) -> i32 {
    let mut diff = to_minutes(candidate) - to_minutes(reference);
    if diff < -720 {
        diff += 1440;
    }
    diff
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hhmm_accepts_well_formed_times() {
        assert_eq!(parse_hhmm("00:00"), Some(0));
        assert_eq!(parse_hhmm("19:00"), Some(19 * 60));
        assert_eq!(parse_hhmm("23:59"), Some(23 * 60 + 59));
        assert_eq!(parse_hhmm("9:30"), Some(9 * 60 + 30));
    }

    #[test]
    fn parse_hhmm_rejects_garbage() {
        assert_eq!(parse_hhmm(""), None);
        assert_eq!(parse_hhmm("19"), None);
        assert_eq!(parse_hhmm("24:00"), None);
        assert_eq!(parse_hhmm("19:60"), None);
        assert_eq!(parse_hhmm("19:0"), None);
        assert_eq!(parse_hhmm("ab:cd"), None);
        assert_eq!(parse_hhmm("19:00:00"), None);
    }

    #[test]
    fn to_minutes_defaults_to_zero() {
        assert_eq!(to_minutes(""), 0);
        assert_eq!(to_minutes("late"), 0);
        assert_eq!(to_minutes("xx:15"), 15);
        assert_eq!(to_minutes("19:xx"), 19 * 60);
        assert_eq!(to_minutes("19:30"), 19 * 60 + 30);
    }

    #[test]
    fn diff_is_signed() {
        assert_eq!(signed_diff_minutes("19:00", "19:45"), 45);
        assert_eq!(signed_diff_minutes("19:00", "18:30"), -30);
        assert_eq!(signed_diff_minutes("19:00", "19:00"), 0);
    }

    #[test]
    fn diff_corrects_midnight_rollover() {
        // 23:30 start, 00:15 arrival: 45 minutes late, not -1395.
        assert_eq!(signed_diff_minutes("23:30", "00:15"), 45);
        // Exactly -720 stays put; the pivot is strict.
        assert_eq!(signed_diff_minutes("12:00", "00:00"), -720);
    }
}
