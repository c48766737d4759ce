//! Capacity threshold broadcasts.
//!
//! A pure crossing detector over the players-array count. Callers invoke
//! it once per successful placement, never per poll, so a threshold fires
//! exactly once as the roster grows through it.

/// Which fill level the roster just reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Threshold {
    Half,
    ThreeQuarters,
    Full,
}

impl Threshold {
    pub fn percent(self) -> u32 {
        match self {
            Threshold::Half => 50,
            Threshold::ThreeQuarters => 75,
            Threshold::Full => 100,
        }
    }

    /// Broadcast text, phrased differently for members who already hold a
    /// confirmed spot and for those still able to grab one.
    pub fn message_for(self, session_name: &str, holds_spot: bool) -> String {
        if holds_spot {
            format!("The list for {} reached {}%.", session_name, self.percent())
        } else {
            format!(
                "Hurry, the list for {} reached {}%. Grab your spot!",
                session_name,
                self.percent()
            )
        }
    }
}

/// Detects an exact arrival at one of the three threshold counts derived
/// from `max_spots`: `ceil(0.5*max)`, `ceil(0.75*max)` and `max` itself.
/// When thresholds coincide (tiny rosters) the highest one wins.
pub fn capacity_threshold(before: usize, after: usize, max_spots: u32) -> Option<Threshold> {
    if before == after {
        return None;
    }
    let after = after as u32;
    let half = max_spots.div_ceil(2);
    let three_quarters = (3 * max_spots).div_ceil(4);
    if after == max_spots {
        Some(Threshold::Full)
    } else if after == three_quarters {
        Some(Threshold::ThreeQuarters)
    } else if after == half {
        Some(Threshold::Half)
    } else {
        None
    }
}
