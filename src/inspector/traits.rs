//! Abstract inspection traits.
//!
//! These traits define the contract a UI-inspection backend must implement.
//! A backend finds a Match Field Set dialog by title and exposes its controls
//! as primitive, synchronous reads and clicks. The bridge never interprets
//! anything beyond what these primitives return.

use thiserror::Error;

use crate::fieldset::{AudienceDisplay, AutonomousBonus, Competition};

/// Errors raised by an inspection backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InspectorError {
    /// No dialog with this title exists.
    #[error("No fieldset dialog titled '{0}'")]
    NotFound(String),

    /// The dialog went away or stopped responding.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// A button or selector was disabled when clicked.
    #[error("Control '{0}' is not enabled")]
    NotEnabled(&'static str),

    /// The field selector has no entry at this index.
    #[error("Field index {0} is out of range")]
    IndexOutOfRange(u32),
}

/// Text labels on the dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextControl {
    /// Countdown label.
    MatchTimer,
    /// Lifecycle state label.
    MatchState,
    /// Label naming the match queued on the field.
    MatchOnField,
    /// Label naming the match whose results are saved.
    SavedMatchResults,
}

/// Radio buttons and checkboxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Toggle {
    /// One audience display radio button.
    Display(AudienceDisplay),
    /// One autonomous bonus radio button.
    Bonus(AutonomousBonus),
    /// "Play Sounds" checkbox.
    PlaySounds,
    /// "Show Results Automatically" checkbox.
    ShowResultsAutomatically,
}

impl Toggle {
    /// Caption of the control in the dialog.
    #[must_use]
    pub const fn ui_name(self) -> &'static str {
        match self {
            Self::Display(d) => d.ui_name(),
            Self::Bonus(b) => b.ui_name(),
            Self::PlaySounds => "Play Sounds",
            Self::ShowResultsAutomatically => "Show Results Automatically",
        }
    }
}

/// Push buttons plus the field selector, whose enabled state gates commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    #[allow(missing_docs)]
    StartMatch,
    #[allow(missing_docs)]
    ResumeMatch,
    #[allow(missing_docs)]
    EndEarly,
    #[allow(missing_docs)]
    AbortMatch,
    #[allow(missing_docs)]
    ResetTimer,
    /// The field selector combo box.
    FieldSelect,
}

impl Button {
    /// Caption of the control in the dialog.
    #[must_use]
    pub const fn ui_name(self) -> &'static str {
        match self {
            Self::StartMatch => "Start Match",
            Self::ResumeMatch => "Resume Match",
            Self::EndEarly => "End Early",
            Self::AbortMatch => "Abort Match",
            Self::ResetTimer => "Reset Timer",
            Self::FieldSelect => "ComboBox",
        }
    }
}

/// Locates fieldset dialogs.
pub trait Inspector: Send + Sync {
    /// Open a connection to the dialog with this title.
    ///
    /// # Errors
    /// - `NotFound`: no such dialog currently exists
    fn connect(&self, title: &str, competition: Competition) -> Result<Box<dyn FieldsetConnection>, InspectorError>;
}

/// A live connection to one dialog.
///
/// Every call may fail with `ConnectionLost` if the dialog disappears
/// between calls. Calls may block on I/O to the target.
pub trait FieldsetConnection: Send {
    /// Read a text label. `None` when the label has no text at all.
    fn read_text(&self, control: TextControl) -> Result<Option<String>, InspectorError>;

    /// Whether a radio button or checkbox is checked.
    fn is_checked(&self, toggle: Toggle) -> Result<bool, InspectorError>;

    /// Whether a button accepts clicks.
    fn is_enabled(&self, button: Button) -> Result<bool, InspectorError>;

    /// Index selected in the field selector, if any.
    fn selected_field(&self) -> Result<Option<u32>, InspectorError>;

    /// Click a push button.
    ///
    /// # Errors
    /// - `NotEnabled`: the button is disabled
    fn click(&self, button: Button) -> Result<(), InspectorError>;

    /// Click a radio button or checkbox.
    fn toggle(&self, toggle: Toggle) -> Result<(), InspectorError>;

    /// Select an entry in the field selector.
    ///
    /// # Errors
    /// - `NotEnabled`: the selector is disabled
    /// - `IndexOutOfRange`: no such entry
    fn select_field(&self, index: u32) -> Result<(), InspectorError>;
}
