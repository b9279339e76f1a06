//! UI inspection backends.
//!
//! The bridge reads a dialog only through the traits in this module. The
//! in-memory backend is the one shipped here; a desktop automation backend
//! implements the same traits.

mod memory;
mod traits;

pub use memory::{Probe, SimulatedFieldset, SimulatedInspector, SimulatedState};
pub use traits::{Button, FieldsetConnection, Inspector, InspectorError, TextControl, Toggle};
