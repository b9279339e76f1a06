//! In-memory inspection backend.
//!
//! This module provides a thread-safe simulated Tournament Manager. It is
//! intended for embedded usage, tests, and as a reference implementation of
//! the `Inspector` contract: dialogs can be opened and closed, every control
//! can be set directly, clicks move the match through a small state model,
//! and every probe is counted so callers can see exactly what a poll read.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use crate::fieldset::{AudienceDisplay, AutonomousBonus, Competition, FieldsetState};

use super::traits::{Button, FieldsetConnection, Inspector, InspectorError, TextControl, Toggle};

fn lock_err(context: &'static str) -> InspectorError {
    InspectorError::ConnectionLost(format!("poisoned lock: {context}"))
}

/// One counted interaction with a dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Probe {
    #[allow(missing_docs)]
    Text(TextControl),
    #[allow(missing_docs)]
    Checked(Toggle),
    #[allow(missing_docs)]
    Enabled(Button),
    #[allow(missing_docs)]
    SelectedField,
    #[allow(missing_docs)]
    Click(Button),
    #[allow(missing_docs)]
    Toggle(Toggle),
    #[allow(missing_docs)]
    SelectField,
}

/// Directly settable contents of a simulated dialog.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedState {
    /// Closed dialogs refuse connections and fail every call.
    pub online: bool,
    pub timer: Option<String>,
    pub state: FieldsetState,
    /// Set once a match ends; cleared by Reset Timer.
    pub ended: bool,
    /// State a paused match resumes into.
    pub resume_state: FieldsetState,
    pub field_count: u32,
    pub field: Option<u32>,
    pub match_on_field: Option<String>,
    pub saved_match_results: Option<String>,
    pub display: Option<AudienceDisplay>,
    pub bonus: Option<AutonomousBonus>,
    pub play_sounds: bool,
    pub show_results_automatically: bool,
}

impl Default for SimulatedState {
    fn default() -> Self {
        Self {
            online: true,
            timer: None,
            state: FieldsetState::Disabled,
            ended: false,
            resume_state: FieldsetState::DriverControl,
            field_count: 4,
            field: Some(0),
            match_on_field: Some("Q1".to_string()),
            saved_match_results: None,
            display: Some(AudienceDisplay::Logo),
            bonus: Some(AutonomousBonus::None),
            play_sounds: true,
            show_results_automatically: true,
        }
    }
}

impl SimulatedState {
    fn enabled(&self, button: Button) -> bool {
        match button {
            Button::StartMatch | Button::FieldSelect => self.state == FieldsetState::Disabled && !self.ended,
            Button::ResumeMatch => self.state == FieldsetState::Pause,
            Button::EndEarly => matches!(
                self.state,
                FieldsetState::Autonomous | FieldsetState::DriverControl | FieldsetState::Pause
            ),
            Button::AbortMatch => self.state.is_running(),
            Button::ResetTimer => self.ended,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    sim: SimulatedState,
    /// Bumped every time the dialog closes, so handles from before the close
    /// stay dead after it reopens.
    generation: u64,
    /// Calls that will fail with `ConnectionLost` before the dialog recovers.
    pending_failures: u32,
    probes: HashMap<Probe, u64>,
    connect_attempts: u64,
}

/// A simulated Match Field Set dialog.
#[derive(Debug)]
pub struct SimulatedFieldset {
    title: String,
    competition: Competition,
    inner: Mutex<Inner>,
}

impl SimulatedFieldset {
    fn new(title: String, competition: Competition) -> Self {
        let mut sim = SimulatedState::default();
        if !competition.has_autonomous_bonus() {
            sim.bonus = None;
        }
        Self {
            title,
            competition,
            inner: Mutex::new(Inner {
                sim,
                ..Inner::default()
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, InspectorError> {
        self.inner.lock().map_err(|_| lock_err("simulated fieldset"))
    }

    /// Dialog title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Competition the dialog was opened for.
    #[must_use]
    pub const fn competition(&self) -> Competition {
        self.competition
    }

    /// Mutate the dialog contents.
    ///
    /// Taking the dialog offline invalidates every existing connection.
    pub fn update(&self, f: impl FnOnce(&mut SimulatedState)) {
        if let Ok(mut inner) = self.inner.lock() {
            let was_online = inner.sim.online;
            f(&mut inner.sim);
            if was_online && !inner.sim.online {
                inner.generation += 1;
            }
        }
    }

    /// Copy of the current dialog contents.
    #[must_use]
    pub fn state(&self) -> SimulatedState {
        self.inner.lock().map(|i| i.sim.clone()).unwrap_or_default()
    }

    /// Open or close the dialog.
    pub fn set_online(&self, online: bool) {
        self.update(|s| s.online = online);
    }

    /// Make the next `count` connection calls fail with `ConnectionLost`
    /// while leaving the dialog open.
    pub fn fail_next_calls(&self, count: u32) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.pending_failures = count;
        }
    }

    /// How many times the probe ran successfully.
    #[must_use]
    pub fn probe_count(&self, probe: Probe) -> u64 {
        self.inner
            .lock()
            .map(|i| i.probes.get(&probe).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Total successful probes of any kind.
    #[must_use]
    pub fn total_probes(&self) -> u64 {
        self.inner.lock().map(|i| i.probes.values().sum()).unwrap_or(0)
    }

    /// Connection attempts, including refused ones.
    #[must_use]
    pub fn connect_attempts(&self) -> u64 {
        self.inner.lock().map(|i| i.connect_attempts).unwrap_or(0)
    }

    /// Zero the probe and connect-attempt counters.
    pub fn reset_counters(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.probes.clear();
            inner.connect_attempts = 0;
        }
    }

    fn call<T>(&self, generation: u64, probe: Probe, f: impl FnOnce(&mut SimulatedState) -> Result<T, InspectorError>) -> Result<T, InspectorError> {
        let mut inner = self.lock()?;
        if !inner.sim.online || inner.generation != generation {
            return Err(InspectorError::ConnectionLost(format!("dialog '{}' is closed", self.title)));
        }
        if inner.pending_failures > 0 {
            inner.pending_failures -= 1;
            return Err(InspectorError::ConnectionLost(format!("dialog '{}' did not respond", self.title)));
        }
        let out = f(&mut inner.sim)?;
        *inner.probes.entry(probe).or_insert(0) += 1;
        Ok(out)
    }

    fn has_control(&self, toggle: Toggle) -> bool {
        match toggle {
            Toggle::Display(d) => d.available_for(self.competition),
            Toggle::Bonus(_) => self.competition.has_autonomous_bonus(),
            Toggle::PlaySounds | Toggle::ShowResultsAutomatically => true,
        }
    }
}

/// Simulated inspector holding any number of dialogs.
#[derive(Debug, Default)]
pub struct SimulatedInspector {
    fieldsets: RwLock<HashMap<String, Arc<SimulatedFieldset>>>,
}

impl SimulatedInspector {
    /// Create an inspector with no dialogs open.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a dialog, or return the existing one with this title.
    pub fn add_fieldset(&self, title: impl Into<String>, competition: Competition) -> Arc<SimulatedFieldset> {
        let title = title.into();
        let Ok(mut map) = self.fieldsets.write() else {
            return Arc::new(SimulatedFieldset::new(title, competition));
        };
        Arc::clone(
            map.entry(title.clone())
                .or_insert_with(|| Arc::new(SimulatedFieldset::new(title, competition))),
        )
    }

    /// Look up a dialog by title.
    #[must_use]
    pub fn fieldset(&self, title: &str) -> Option<Arc<SimulatedFieldset>> {
        self.fieldsets.read().ok()?.get(title).cloned()
    }
}

impl Inspector for SimulatedInspector {
    fn connect(&self, title: &str, _competition: Competition) -> Result<Box<dyn FieldsetConnection>, InspectorError> {
        let target = self
            .fieldset(title)
            .ok_or_else(|| InspectorError::NotFound(title.to_string()))?;

        let generation = {
            let mut inner = target.lock()?;
            inner.connect_attempts += 1;
            if !inner.sim.online {
                return Err(InspectorError::NotFound(title.to_string()));
            }
            inner.generation
        };

        Ok(Box::new(SimulatedConnection { target, generation }))
    }
}

#[derive(Debug)]
struct SimulatedConnection {
    target: Arc<SimulatedFieldset>,
    generation: u64,
}

impl FieldsetConnection for SimulatedConnection {
    fn read_text(&self, control: TextControl) -> Result<Option<String>, InspectorError> {
        self.target.call(self.generation, Probe::Text(control), |s| {
            Ok(match control {
                TextControl::MatchTimer => s.timer.clone(),
                TextControl::MatchState => Some(s.state.ui_name().to_string()),
                TextControl::MatchOnField => Some(s.match_on_field.clone().unwrap_or_default()),
                TextControl::SavedMatchResults => Some(s.saved_match_results.clone().unwrap_or_default()),
            })
        })
    }

    fn is_checked(&self, toggle: Toggle) -> Result<bool, InspectorError> {
        if !self.target.has_control(toggle) {
            return Err(InspectorError::ConnectionLost(format!("no control '{}'", toggle.ui_name())));
        }
        self.target.call(self.generation, Probe::Checked(toggle), |s| {
            Ok(match toggle {
                Toggle::Display(d) => s.display == Some(d),
                Toggle::Bonus(b) => s.bonus == Some(b),
                Toggle::PlaySounds => s.play_sounds,
                Toggle::ShowResultsAutomatically => s.show_results_automatically,
            })
        })
    }

    fn is_enabled(&self, button: Button) -> Result<bool, InspectorError> {
        self.target
            .call(self.generation, Probe::Enabled(button), |s| Ok(s.enabled(button)))
    }

    fn selected_field(&self) -> Result<Option<u32>, InspectorError> {
        self.target.call(self.generation, Probe::SelectedField, |s| Ok(s.field))
    }

    fn click(&self, button: Button) -> Result<(), InspectorError> {
        self.target.call(self.generation, Probe::Click(button), |s| {
            if !s.enabled(button) {
                return Err(InspectorError::NotEnabled(button.ui_name()));
            }
            match button {
                Button::StartMatch => {
                    s.state = FieldsetState::Autonomous;
                    s.timer = Some("0:15".to_string());
                }
                Button::ResumeMatch => s.state = s.resume_state,
                Button::EndEarly | Button::AbortMatch => {
                    s.state = FieldsetState::Disabled;
                    s.ended = true;
                    s.timer = Some("0:00".to_string());
                }
                Button::ResetTimer => {
                    s.ended = false;
                    s.timer = None;
                }
                Button::FieldSelect => {}
            }
            Ok(())
        })
    }

    fn toggle(&self, toggle: Toggle) -> Result<(), InspectorError> {
        if !self.target.has_control(toggle) {
            return Err(InspectorError::NotEnabled(toggle.ui_name()));
        }
        self.target.call(self.generation, Probe::Toggle(toggle), |s| {
            match toggle {
                Toggle::Display(d) => s.display = Some(d),
                Toggle::Bonus(b) => s.bonus = Some(b),
                Toggle::PlaySounds => s.play_sounds = !s.play_sounds,
                Toggle::ShowResultsAutomatically => s.show_results_automatically = !s.show_results_automatically,
            }
            Ok(())
        })
    }

    fn select_field(&self, index: u32) -> Result<(), InspectorError> {
        self.target.call(self.generation, Probe::SelectField, |s| {
            if !s.enabled(Button::FieldSelect) {
                return Err(InspectorError::NotEnabled(Button::FieldSelect.ui_name()));
            }
            if index >= s.field_count {
                return Err(InspectorError::IndexOutOfRange(index));
            }
            s.field = Some(index);
            Ok(())
        })
    }
}
