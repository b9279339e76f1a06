//! The fieldset handle.
//!
//! A `Fieldset` owns the connection to one Match Field Set dialog. Its
//! getters are primitive reads of one control each; its commands click
//! controls after checking that the dialog's current state allows it. The
//! connection can be dropped and re-acquired without losing the handle's
//! identity, observers or latest snapshot.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use crate::error::{BridgeError, BridgeResult};
use crate::inspector::{Button, FieldsetConnection, Inspector, InspectorError, TextControl, Toggle};
use crate::monitor::{ObserverList, SnapshotObserver, SnapshotStream, SubscriptionId};

use super::snapshot::{self, non_empty, Snapshot};
use super::types::{ActiveMatch, AudienceDisplay, AutonomousBonus, Competition, FieldsetState};

/// Default buffer size of a snapshot stream.
pub const DEFAULT_STREAM_CAPACITY: usize = 1024;

type Connection = Box<dyn FieldsetConnection>;

/// Handle to one monitored fieldset.
pub struct Fieldset {
    title: String,
    competition: Competition,
    inspector: Arc<dyn Inspector>,
    connection: Mutex<Option<Connection>>,
    observers: Arc<ObserverList>,
    latest: RwLock<Option<Arc<Snapshot>>>,
    stream_capacity: usize,
}

impl fmt::Debug for Fieldset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fieldset")
            .field("title", &self.title)
            .field("competition", &self.competition)
            .field("connected", &self.is_connected())
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl Fieldset {
    /// Connect to the dialog with this title.
    ///
    /// # Errors
    /// - `NotFound`: no such dialog is open
    pub fn connect(inspector: Arc<dyn Inspector>, title: impl Into<String>, competition: Competition) -> BridgeResult<Self> {
        let title = title.into();
        let connection = inspector.connect(&title, competition).map_err(|err| match err {
            InspectorError::NotFound(_) | InspectorError::ConnectionLost(_) => BridgeError::NotFound { title: title.clone() },
            other => BridgeError::internal(other.to_string()),
        })?;
        Ok(Self {
            title,
            competition,
            inspector,
            connection: Mutex::new(Some(connection)),
            observers: Arc::new(ObserverList::new()),
            latest: RwLock::new(None),
            stream_capacity: DEFAULT_STREAM_CAPACITY,
        })
    }

    /// Set the buffer size used by [`Fieldset::stream`].
    #[must_use]
    pub fn with_stream_capacity(mut self, capacity: usize) -> Self {
        self.stream_capacity = capacity.max(1);
        self
    }

    /// Dialog title; the key this fieldset is registered under.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Competition the fieldset runs.
    #[must_use]
    pub const fn competition(&self) -> Competition {
        self.competition
    }

    fn slot(&self) -> MutexGuard<'_, Option<Connection>> {
        // The slot holds no invariant a panic could break halfway.
        self.connection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a connection is currently held.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.slot().is_some()
    }

    /// Drop the connection. Every getter and command fails until `reconnect`.
    pub fn disconnect(&self) {
        self.slot().take();
    }

    /// Re-acquire the connection by title.
    ///
    /// # Errors
    /// - `Connection`: the dialog is not available
    pub fn reconnect(&self) -> BridgeResult<()> {
        let connection = self
            .inspector
            .connect(&self.title, self.competition)
            .map_err(|err| BridgeError::connection(&self.title, err.to_string()))?;
        *self.slot() = Some(connection);
        Ok(())
    }

    fn translate(&self, err: InspectorError) -> BridgeError {
        match err {
            InspectorError::NotFound(_) | InspectorError::ConnectionLost(_) => {
                BridgeError::connection(&self.title, err.to_string())
            }
            InspectorError::IndexOutOfRange(value) => BridgeError::OutOfRange { field: "field id", value },
            InspectorError::NotEnabled(_) => BridgeError::internal(err.to_string()),
        }
    }

    fn with_connection<T>(&self, f: impl FnOnce(&dyn FieldsetConnection) -> Result<T, InspectorError>) -> BridgeResult<T> {
        let slot = self.slot();
        let Some(connection) = slot.as_deref() else {
            return Err(BridgeError::connection(&self.title, "not connected"));
        };
        f(connection).map_err(|err| self.translate(err))
    }

    // --- primitive getters ---

    /// Raw timer label.
    pub fn match_timer_content(&self) -> BridgeResult<Option<String>> {
        self.with_connection(|c| c.read_text(TextControl::MatchTimer))
            .map(non_empty)
    }

    /// Remaining match seconds, 0 outside a match.
    pub fn match_time(&self) -> BridgeResult<u32> {
        Ok(snapshot::parse_match_time(self.match_timer_content()?.as_deref()))
    }

    /// Remaining prestart seconds, 0 outside prestart.
    pub fn prestart_time(&self) -> BridgeResult<u32> {
        Ok(snapshot::parse_prestart_time(self.match_timer_content()?.as_deref()))
    }

    /// Current lifecycle state.
    pub fn match_state(&self) -> BridgeResult<FieldsetState> {
        let Some(text) = self.with_connection(|c| c.read_text(TextControl::MatchState))? else {
            return Ok(FieldsetState::Disabled);
        };
        FieldsetState::from_ui_name(&text).ok_or(BridgeError::UnrecognizedValue {
            control: "match state",
            raw: text,
        })
    }

    /// Selected audience display, scanning every display of this competition.
    pub fn audience_display(&self) -> BridgeResult<Option<AudienceDisplay>> {
        self.with_connection(|c| {
            for display in AudienceDisplay::available(self.competition) {
                if c.is_checked(Toggle::Display(display))? {
                    return Ok(Some(display));
                }
            }
            Ok(None)
        })
    }

    /// Selected audience display, checking `last` before scanning.
    pub(crate) fn audience_display_since(&self, last: Option<AudienceDisplay>) -> BridgeResult<Option<AudienceDisplay>> {
        if let Some(display) = last.filter(|d| d.available_for(self.competition)) {
            if self.with_connection(|c| c.is_checked(Toggle::Display(display)))? {
                return Ok(Some(display));
            }
        }
        self.audience_display()
    }

    /// Index selected in the field selector.
    pub fn current_field_id(&self) -> BridgeResult<Option<u32>> {
        self.with_connection(|c| c.selected_field())
    }

    /// Match queued on the field, e.g. `"Q12"`.
    pub fn match_on_field(&self) -> BridgeResult<Option<String>> {
        self.with_connection(|c| c.read_text(TextControl::MatchOnField))
            .map(non_empty)
    }

    /// Match whose results are saved.
    pub fn saved_match_results(&self) -> BridgeResult<Option<String>> {
        self.with_connection(|c| c.read_text(TextControl::SavedMatchResults))
            .map(non_empty)
    }

    /// Kind of match queued on the field.
    pub fn active_match(&self) -> BridgeResult<ActiveMatch> {
        Ok(ActiveMatch::from_match_on_field(self.match_on_field()?.as_deref()))
    }

    /// Selected autonomous bonus.
    ///
    /// # Errors
    /// - `UnsupportedForCategory`: the competition has no bonus
    /// - `InvalidState`: a timeout is queued
    pub fn autonomous_bonus(&self) -> BridgeResult<Option<AutonomousBonus>> {
        self.ensure_bonus_available("read the autonomous bonus")?;
        self.scan_autonomous_bonus()
    }

    fn scan_autonomous_bonus(&self) -> BridgeResult<Option<AutonomousBonus>> {
        self.with_connection(|c| {
            for bonus in AutonomousBonus::ALL {
                if c.is_checked(Toggle::Bonus(bonus))? {
                    return Ok(Some(bonus));
                }
            }
            Ok(None)
        })
    }

    /// Bonus as recorded in a snapshot: `None` wherever the bonus does not
    /// apply, otherwise `last` if still checked, otherwise a full scan.
    pub(crate) fn autonomous_bonus_since(
        &self,
        active_match: ActiveMatch,
        last: Option<AutonomousBonus>,
    ) -> BridgeResult<Option<AutonomousBonus>> {
        if !self.competition.has_autonomous_bonus() || active_match == ActiveMatch::Timeout {
            return Ok(None);
        }
        if let Some(bonus) = last {
            if self.with_connection(|c| c.is_checked(Toggle::Bonus(bonus)))? {
                return Ok(Some(bonus));
            }
        }
        self.scan_autonomous_bonus()
    }

    /// Whether "Play Sounds" is checked.
    pub fn is_play_sounds(&self) -> BridgeResult<bool> {
        self.with_connection(|c| c.is_checked(Toggle::PlaySounds))
    }

    /// Whether "Show Results Automatically" is checked.
    pub fn is_show_results_automatically(&self) -> BridgeResult<bool> {
        self.with_connection(|c| c.is_checked(Toggle::ShowResultsAutomatically))
    }

    /// Read every field fresh, bypassing the monitor's cache.
    pub fn overview(&self) -> BridgeResult<Snapshot> {
        crate::monitor::poll::read_full(self)
    }

    // --- commands ---

    fn rejected(&self, operation: &'static str, reason: &str) -> BridgeError {
        match self.match_state() {
            Ok(state) => BridgeError::InvalidState {
                operation,
                state,
                reason: reason.to_string(),
            },
            Err(err) => err,
        }
    }

    fn click_gated(&self, button: Button, operation: &'static str, reason: &str) -> BridgeResult<()> {
        if !self.with_connection(|c| c.is_enabled(button))? {
            return Err(self.rejected(operation, reason));
        }
        match self.with_connection(|c| c.click(button)) {
            Err(BridgeError::Internal { .. }) => Err(self.rejected(operation, reason)),
            other => other,
        }
    }

    /// Start a match from Disabled, or resume one from Pause.
    ///
    /// # Errors
    /// - `InvalidState`: the match is running, or ended and needs a timer reset
    pub fn start_match(&self) -> BridgeResult<()> {
        match self.match_state()? {
            FieldsetState::Pause => self.click_gated(Button::ResumeMatch, "start match", "resume is not available"),
            FieldsetState::Disabled => self.click_gated(
                Button::StartMatch,
                "start match",
                "the previous match ended; reset the timer first",
            ),
            state => Err(BridgeError::InvalidState {
                operation: "start match",
                state,
                reason: "the match is already started".to_string(),
            }),
        }
    }

    /// End the running match early.
    pub fn end_early(&self) -> BridgeResult<()> {
        self.click_gated(Button::EndEarly, "end early", "the match has ended or is in prestart")
    }

    /// Abort the running match.
    pub fn abort_match(&self) -> BridgeResult<()> {
        self.click_gated(Button::AbortMatch, "abort match", "the match is paused or not running")
    }

    /// Reset the timer after a match ended.
    pub fn reset_timer(&self) -> BridgeResult<()> {
        self.click_gated(Button::ResetTimer, "reset timer", "the match has not ended")
    }

    /// Switch the audience display.
    ///
    /// # Errors
    /// - `UnsupportedForCategory`: the display does not exist for this competition
    pub fn set_audience_display(&self, display: AudienceDisplay) -> BridgeResult<()> {
        if !display.available_for(self.competition) {
            return Err(BridgeError::UnsupportedForCategory {
                feature: format!("Display '{display}'"),
                competition: self.competition,
            });
        }
        self.with_connection(|c| c.toggle(Toggle::Display(display)))
    }

    /// Select the field the next match runs on.
    ///
    /// # Errors
    /// - `InvalidState`: a match is running, paused, or ended without reset
    /// - `OutOfRange`: no such field
    pub fn set_current_field_id(&self, field_id: u32) -> BridgeResult<()> {
        if !self.with_connection(|c| c.is_enabled(Button::FieldSelect))? {
            return Err(self.rejected(
                "set current field",
                "the match is started, paused, or ended (reset the timer first)",
            ));
        }
        self.with_connection(|c| c.select_field(field_id))
    }

    fn ensure_bonus_available(&self, operation: &'static str) -> BridgeResult<()> {
        if !self.competition.has_autonomous_bonus() {
            return Err(BridgeError::UnsupportedForCategory {
                feature: "Autonomous bonus".to_string(),
                competition: self.competition,
            });
        }
        if self.active_match()? == ActiveMatch::Timeout {
            return Err(self.rejected(operation, "autonomous bonus does not apply to a timeout"));
        }
        Ok(())
    }

    /// Select the autonomous bonus winner.
    ///
    /// # Errors
    /// - `UnsupportedForCategory`: the competition has no bonus
    /// - `InvalidState`: a timeout is queued
    pub fn set_autonomous_bonus(&self, bonus: AutonomousBonus) -> BridgeResult<()> {
        self.ensure_bonus_available("set the autonomous bonus")?;
        self.with_connection(|c| c.toggle(Toggle::Bonus(bonus)))
    }

    /// Check or uncheck "Play Sounds".
    pub fn set_play_sounds(&self, play_sounds: bool) -> BridgeResult<()> {
        if self.is_play_sounds()? == play_sounds {
            return Ok(());
        }
        self.with_connection(|c| c.toggle(Toggle::PlaySounds))
    }

    /// Check or uncheck "Show Results Automatically".
    pub fn set_show_results_automatically(&self, show: bool) -> BridgeResult<()> {
        if self.is_show_results_automatically()? == show {
            return Ok(());
        }
        self.with_connection(|c| c.toggle(Toggle::ShowResultsAutomatically))
    }

    // --- observation ---

    /// Register an observer for snapshot changes. Idempotent per `Arc`.
    pub fn subscribe(&self, observer: Arc<dyn SnapshotObserver>) -> SubscriptionId {
        self.observers.subscribe(observer)
    }

    /// Remove an observer. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Open a buffered stream of snapshot changes.
    #[must_use]
    pub fn stream(&self) -> SnapshotStream {
        self.stream_with_capacity(self.stream_capacity)
    }

    /// Open a stream with an explicit buffer size.
    #[must_use]
    pub fn stream_with_capacity(&self, capacity: usize) -> SnapshotStream {
        SnapshotStream::register(&self.title, Arc::clone(&self.observers), capacity)
    }

    pub(crate) fn observers(&self) -> &ObserverList {
        &self.observers
    }

    /// Most recent snapshot produced by the monitor.
    #[must_use]
    pub fn latest_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.latest.read().ok().and_then(|l| l.clone())
    }

    pub(crate) fn publish(&self, snapshot: Arc<Snapshot>) {
        if let Ok(mut latest) = self.latest.write() {
            *latest = Some(snapshot);
        }
    }
}
