//! Fieldset model: the vocabulary of a Match Field Set dialog, the snapshot
//! of everything it shows, and the handle that reads and drives it.

/// Connection-owning handle with getters and state-gated commands.
pub mod handle;
/// Immutable point-in-time view and timer parsing.
pub mod snapshot;
/// Competitions, lifecycle states and the dialog's selectable values.
pub mod types;

pub use handle::{Fieldset, DEFAULT_STREAM_CAPACITY};
pub use snapshot::{parse_match_time, parse_prestart_time, parse_timer, Snapshot, TimerReading};
pub use types::{ActiveMatch, AudienceDisplay, AutonomousBonus, Competition, FieldsetState};
