//! # tm-bridge - Live control of VEX Tournament Manager fieldsets
//!
//! tm-bridge connects to the Match Field Set dialogs of a running Tournament
//! Manager, keeps a background poll of each one, and tells subscribers when
//! anything on a field changes. Handles also drive the dialog: start, end or
//! abort a match, switch the audience display, pick the field, set the
//! autonomous bonus.
//!
//! ## Core Concepts
//!
//! - **Fieldset**: handle to one dialog, with getters and state-gated commands
//! - **Snapshot**: immutable view of everything a dialog shows at one instant
//! - **Monitor**: per-fieldset thread that polls snapshots and publishes changes
//! - **Inspector**: the UI-inspection backend the bridge reads dialogs through
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tm_bridge::{BridgeEngine, Competition, EngineConfig, SimulatedInspector, Snapshot};
//!
//! let inspector = Arc::new(SimulatedInspector::new());
//! inspector.add_fieldset("Match Field Set #1", Competition::V5rc);
//!
//! let engine = BridgeEngine::new(Competition::V5rc, inspector, EngineConfig::default());
//! engine.start()?;
//! let fieldset = engine.get_fieldset("Match Field Set #1")?;
//! fieldset.subscribe(Arc::new(|s: &Arc<Snapshot>| println!("{:?}", s.match_state)));
//! fieldset.start_match()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod engine;
pub mod error;
pub mod fieldset;
pub mod inspector;
pub mod monitor;

pub use config::{ConfigError, EngineConfig};
pub use engine::BridgeEngine;
pub use error::{BridgeError, BridgeResult};
pub use fieldset::{
    ActiveMatch, AudienceDisplay, AutonomousBonus, Competition, Fieldset, FieldsetState, Snapshot,
};
pub use inspector::{FieldsetConnection, Inspector, InspectorError, SimulatedFieldset, SimulatedInspector};
pub use monitor::{SnapshotEvent, SnapshotObserver, SnapshotStream, SubscriptionId};
