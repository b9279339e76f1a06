//! Point-in-time view of a fieldset.
//!
//! A `Snapshot` is built fresh on every poll and never mutated. Two snapshots
//! compare equal iff every field is equal; the monitor uses that equality to
//! decide whether observers need to hear about a poll at all.

use serde::{Deserialize, Serialize};

use super::types::{ActiveMatch, AudienceDisplay, AutonomousBonus, FieldsetState};

/// Separator between minutes and seconds in the match timer label.
pub const TIMER_SEPARATOR: char = ':';

/// Observed state of one fieldset at one instant.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Snapshot {
    /// `None` if no display button is checked.
    pub audience_display: Option<AudienceDisplay>,
    /// Raw timer label, e.g. `"01:45"` during a match or `"12"` in prestart.
    pub match_timer_content: Option<String>,
    /// Remaining match time in seconds; 0 outside a match.
    pub match_time: u32,
    /// Remaining prestart time in seconds; 0 outside prestart.
    pub prestart_time: u32,
    pub match_state: FieldsetState,
    pub current_field_id: Option<u32>,
    pub match_on_field: Option<String>,
    pub saved_match_results: Option<String>,
    /// `None` for competitions without a bonus, during a timeout, or when no
    /// option is selected.
    pub autonomous_bonus: Option<AutonomousBonus>,
    pub play_sounds: bool,
    pub show_results_automatically: bool,
    pub active_match: ActiveMatch,
}

/// Times derived from one timer label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimerReading {
    /// Seconds left in the match.
    pub match_time: u32,
    /// Seconds left in prestart.
    pub prestart_time: u32,
}

/// Parse the timer label into match and prestart seconds.
///
/// `"m:ss"` is match time with no prestart; a bare number is prestart time
/// with no match time; an empty or absent label is zero for both.
#[must_use]
pub fn parse_timer(raw: Option<&str>) -> TimerReading {
    TimerReading {
        match_time: parse_match_time(raw),
        prestart_time: parse_prestart_time(raw),
    }
}

/// Match seconds from the timer label, 0 unless it is `"m:ss"`.
#[must_use]
pub fn parse_match_time(raw: Option<&str>) -> u32 {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return 0;
    };
    let Some((minutes, seconds)) = raw.split_once(TIMER_SEPARATOR) else {
        return 0;
    };
    match (minutes.trim().parse::<u32>(), seconds.trim().parse::<u32>()) {
        (Ok(m), Ok(s)) => m.saturating_mul(60).saturating_add(s),
        _ => 0,
    }
}

/// Prestart seconds from the timer label, 0 if it is `"m:ss"`.
#[must_use]
pub fn parse_prestart_time(raw: Option<&str>) -> u32 {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return 0;
    };
    if raw.contains(TIMER_SEPARATOR) {
        return 0;
    }
    raw.parse().unwrap_or(0)
}

/// Treat an empty label the same as a missing one.
pub(crate) fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.is_empty())
}
