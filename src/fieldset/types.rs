//! Enumerations observed on a Match Field Set dialog.
//!
//! Each value carries two spellings: an internal name used on the wire
//! (serde, logs) and the caption shown in the Tournament Manager UI, which is
//! what the inspector reads and clicks.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The competition a fieldset is running.
///
/// This is the category tag of a fieldset: it decides which displays,
/// bonus controls and commands exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Competition {
    /// VEX V5 Robotics Competition.
    V5rc,
    /// VEX IQ Robotics Competition.
    Viqrc,
}

impl Competition {
    /// Full name of the competition.
    #[must_use]
    pub const fn full_name(self) -> &'static str {
        match self {
            Self::V5rc => "VEX V5 Robotics Competition",
            Self::Viqrc => "VEX IQ Robotics Competition",
        }
    }

    /// Whether the autonomous bonus controls exist for this competition.
    #[must_use]
    pub const fn has_autonomous_bonus(self) -> bool {
        matches!(self, Self::V5rc)
    }
}

impl fmt::Display for Competition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.full_name())
    }
}

/// Lifecycle state of the match on a fieldset.
///
/// Transitions are owned by Tournament Manager; the bridge only observes them.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldsetState {
    #[serde(rename = "PRESTART")]
    Prestart,
    #[serde(rename = "AUTONOMOUS")]
    Autonomous,
    #[serde(rename = "DRIVER CONTROL")]
    DriverControl,
    #[serde(rename = "PAUSED")]
    Pause,
    #[serde(rename = "DISABLED")]
    Disabled,
    #[serde(rename = "TIMEOUT")]
    Timeout,
}

impl FieldsetState {
    /// All states, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Prestart,
        Self::Autonomous,
        Self::DriverControl,
        Self::Pause,
        Self::Disabled,
        Self::Timeout,
    ];

    /// Internal name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Prestart => "PRESTART",
            Self::Autonomous => "AUTONOMOUS",
            Self::DriverControl => "DRIVER CONTROL",
            Self::Pause => "PAUSED",
            Self::Disabled => "DISABLED",
            Self::Timeout => "TIMEOUT",
        }
    }

    /// Text shown in the state label of the dialog. Disabled shows nothing.
    #[must_use]
    pub const fn ui_name(self) -> &'static str {
        match self {
            Self::Disabled => "",
            other => other.name(),
        }
    }

    /// Parse the state label text.
    ///
    /// The label is narrow enough that "DRIVER CONTROL" may be rendered as
    /// just "DRIVER", so both spellings are accepted.
    #[must_use]
    pub fn from_ui_name(text: &str) -> Option<Self> {
        let text = text.trim();
        if text == "DRIVER" {
            return Some(Self::DriverControl);
        }
        Self::ALL.into_iter().find(|s| s.ui_name() == text)
    }

    /// Whether a match is currently counting down.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Prestart | Self::Autonomous | Self::DriverControl | Self::Timeout)
    }
}

impl fmt::Display for FieldsetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Audience display modes.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudienceDisplay {
    #[serde(rename = "BLANK")]
    Blank,
    #[serde(rename = "LOGO")]
    Logo,
    #[serde(rename = "INTRO")]
    Intro,
    #[serde(rename = "IN_MATCH")]
    InMatch,
    #[serde(rename = "RESULTS")]
    SavedMatchResults,
    #[serde(rename = "SCHEDULE")]
    Schedule,
    #[serde(rename = "RANKINGS")]
    Rankings,
    #[serde(rename = "SC_RANKINGS")]
    SkillsRankings,
    #[serde(rename = "ALLIANCE_SELECTION")]
    AllianceSelection,
    #[serde(rename = "BRACKET")]
    ElimBracket,
    #[serde(rename = "AWARD")]
    Slides,
    #[serde(rename = "INSPECTION")]
    Inspection,
}

impl AudienceDisplay {
    /// Every display mode, in the order the dialog lays out its buttons.
    pub const ALL: [Self; 12] = [
        Self::Blank,
        Self::Logo,
        Self::Intro,
        Self::InMatch,
        Self::SavedMatchResults,
        Self::Schedule,
        Self::Rankings,
        Self::SkillsRankings,
        Self::AllianceSelection,
        Self::ElimBracket,
        Self::Slides,
        Self::Inspection,
    ];

    /// Internal name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Blank => "BLANK",
            Self::Logo => "LOGO",
            Self::Intro => "INTRO",
            Self::InMatch => "IN_MATCH",
            Self::SavedMatchResults => "RESULTS",
            Self::Schedule => "SCHEDULE",
            Self::Rankings => "RANKINGS",
            Self::SkillsRankings => "SC_RANKINGS",
            Self::AllianceSelection => "ALLIANCE_SELECTION",
            Self::ElimBracket => "BRACKET",
            Self::Slides => "AWARD",
            Self::Inspection => "INSPECTION",
        }
    }

    /// Caption of the radio button in the dialog.
    #[must_use]
    pub const fn ui_name(self) -> &'static str {
        match self {
            Self::Blank => "None2",
            Self::Logo => "Logo",
            Self::Intro => "Up Next",
            Self::InMatch => "In-Match",
            Self::SavedMatchResults => "Saved Match Results",
            Self::Schedule => "Schedule",
            Self::Rankings => "Rankings",
            Self::SkillsRankings => "Skills Rankings",
            Self::AllianceSelection => "Alliance Selection",
            Self::ElimBracket => "Elim Bracket",
            Self::Slides => "Award Slides",
            Self::Inspection => "Inspection",
        }
    }

    /// Whether this display exists for the given competition.
    #[must_use]
    pub const fn available_for(self, competition: Competition) -> bool {
        match self {
            Self::AllianceSelection | Self::ElimBracket => matches!(competition, Competition::V5rc),
            _ => true,
        }
    }

    /// Displays present on a dialog for the given competition.
    pub fn available(competition: Competition) -> impl Iterator<Item = Self> {
        Self::ALL.into_iter().filter(move |d| d.available_for(competition))
    }

    /// Look up a display by its internal name.
    #[must_use]
    pub fn by_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.name() == name)
    }
}

impl fmt::Display for AudienceDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ui_name())
    }
}

/// Autonomous bonus selection (V5RC only).
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AutonomousBonus {
    None,
    Tie,
    Red,
    Blue,
}

impl AutonomousBonus {
    /// All bonus options, in dialog order.
    pub const ALL: [Self; 4] = [Self::None, Self::Tie, Self::Red, Self::Blue];

    /// Internal name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Tie => "TIE",
            Self::Red => "RED",
            Self::Blue => "BLUE",
        }
    }

    /// Caption of the radio button in the dialog.
    #[must_use]
    pub const fn ui_name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Tie => "Tie",
            Self::Red => "Red",
            Self::Blue => "Blue",
        }
    }

    /// Look up a bonus option by its internal name.
    #[must_use]
    pub fn by_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }
}

impl fmt::Display for AutonomousBonus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of match queued on the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActiveMatch {
    /// Nothing queued.
    #[serde(rename = "NO ACTIVE MATCH")]
    NoActiveMatch,
    /// A team timeout is queued.
    #[serde(rename = "TIMEOUT")]
    Timeout,
    /// A regular match is queued.
    #[serde(rename = "MATCH")]
    Match,
}

impl ActiveMatch {
    /// Match-on-field label shown while a timeout is queued.
    pub const TIMEOUT_LABEL: &'static str = "TO";

    /// Classify the match-on-field label.
    #[must_use]
    pub fn from_match_on_field(label: Option<&str>) -> Self {
        match label {
            None => Self::NoActiveMatch,
            Some(Self::TIMEOUT_LABEL) => Self::Timeout,
            Some(_) => Self::Match,
        }
    }

    /// Internal name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NoActiveMatch => "NO ACTIVE MATCH",
            Self::Timeout => "TIMEOUT",
            Self::Match => "MATCH",
        }
    }
}

impl fmt::Display for ActiveMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
