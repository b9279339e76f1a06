//! Snapshot polling with low-CPU caching.
//!
//! Reading a dialog control is expensive, so most iterations only re-read
//! what changes every tick (timer and state) and spot-check the radio groups
//! against their last known selection. Every `cycle` iterations, or whenever
//! caching is off, everything is read fresh.

use crate::error::BridgeResult;
use crate::fieldset::{parse_timer, ActiveMatch, Fieldset, FieldsetState, Snapshot};

/// How aggressively the monitor reuses previous reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Reuse slow-changing fields between full refreshes.
    pub enabled: bool,
    /// Iterations per full refresh. Clamped to at least 1.
    pub cycle: u32,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            cycle: 10,
        }
    }
}

impl CachePolicy {
    /// Whether iteration `iteration` must read every field.
    #[must_use]
    pub const fn is_full_refresh(&self, has_previous: bool, iteration: u32) -> bool {
        let cycle = if self.cycle == 0 { 1 } else { self.cycle };
        !has_previous || !self.enabled || iteration % cycle == 0
    }

    /// Iteration counter after `iteration`.
    #[must_use]
    pub const fn next_iteration(&self, iteration: u32) -> u32 {
        let cycle = if self.cycle == 0 { 1 } else { self.cycle };
        (iteration + 1) % cycle
    }
}

/// Produce the next snapshot of `fieldset`.
///
/// # Errors
/// Any failed read; the caller treats it as a lost connection.
pub fn poll(fieldset: &Fieldset, previous: Option<&Snapshot>, iteration: u32, policy: CachePolicy) -> BridgeResult<Snapshot> {
    match previous {
        Some(previous) if !policy.is_full_refresh(true, iteration) => read_cached(fieldset, previous),
        _ => read_full(fieldset),
    }
}

pub(crate) fn read_full(fieldset: &Fieldset) -> BridgeResult<Snapshot> {
    let audience_display = fieldset.audience_display()?;
    let match_timer_content = fieldset.match_timer_content()?;
    let timer = parse_timer(match_timer_content.as_deref());
    let match_state = fieldset.match_state()?;
    let current_field_id = fieldset.current_field_id()?;
    let match_on_field = fieldset.match_on_field()?;
    let active_match = ActiveMatch::from_match_on_field(match_on_field.as_deref());
    let saved_match_results = fieldset.saved_match_results()?;
    let autonomous_bonus = fieldset.autonomous_bonus_since(active_match, None)?;

    Ok(Snapshot {
        audience_display,
        match_timer_content,
        match_time: timer.match_time,
        prestart_time: timer.prestart_time,
        match_state,
        current_field_id,
        match_on_field,
        saved_match_results,
        autonomous_bonus,
        play_sounds: fieldset.is_play_sounds()?,
        show_results_automatically: fieldset.is_show_results_automatically()?,
        active_match,
    })
}

fn read_cached(fieldset: &Fieldset, previous: &Snapshot) -> BridgeResult<Snapshot> {
    let audience_display = fieldset.audience_display_since(previous.audience_display)?;
    let match_timer_content = fieldset.match_timer_content()?;
    let timer = parse_timer(match_timer_content.as_deref());
    let match_state = fieldset.match_state()?;

    // Field and queued match can only change between matches.
    let (current_field_id, match_on_field) = if match_state == FieldsetState::Disabled {
        (fieldset.current_field_id()?, fieldset.match_on_field()?)
    } else {
        (previous.current_field_id, previous.match_on_field.clone())
    };
    let active_match = ActiveMatch::from_match_on_field(match_on_field.as_deref());
    let autonomous_bonus = fieldset.autonomous_bonus_since(active_match, previous.autonomous_bonus)?;

    Ok(Snapshot {
        audience_display,
        match_timer_content,
        match_time: timer.match_time,
        prestart_time: timer.prestart_time,
        match_state,
        current_field_id,
        match_on_field,
        saved_match_results: previous.saved_match_results.clone(),
        autonomous_bonus,
        play_sounds: previous.play_sounds,
        show_results_automatically: previous.show_results_automatically,
        active_match,
    })
}
