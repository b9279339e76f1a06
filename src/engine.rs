//! Bridge engine: the registry of monitored fieldsets.
//!
//! The engine owns one monitor thread per fieldset handed out by
//! [`BridgeEngine::get_fieldset`]. Registration, loop start and the
//! loop-alive check happen under one lock, so concurrent callers asking for
//! the same title share one handle and one loop.
//!
//! `stop` joins every monitor thread while holding that lock. Observers run
//! on monitor threads and must not call back into the engine.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Sender};

use crate::config::EngineConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::fieldset::{Competition, Fieldset};
use crate::inspector::Inspector;
use crate::monitor::MonitorWorker;

struct MonitorHandle {
    // Never sent on; dropping it wakes and stops the loop.
    stop: Sender<()>,
    join: JoinHandle<()>,
}

#[derive(Default)]
struct Registry {
    running: bool,
    fieldsets: HashMap<String, Arc<Fieldset>>,
    monitors: HashMap<String, MonitorHandle>,
}

/// Entry point: hands out fieldset handles and keeps them polled.
pub struct BridgeEngine {
    competition: Competition,
    inspector: Arc<dyn Inspector>,
    config: EngineConfig,
    registry: Mutex<Registry>,
}

impl std::fmt::Debug for BridgeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeEngine")
            .field("competition", &self.competition)
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl BridgeEngine {
    /// Create a stopped engine.
    #[must_use]
    pub fn new(competition: Competition, inspector: Arc<dyn Inspector>, config: EngineConfig) -> Self {
        Self {
            competition,
            inspector,
            config,
            registry: Mutex::new(Registry::default()),
        }
    }

    /// Competition every fieldset of this engine runs.
    #[must_use]
    pub const fn competition(&self) -> Competition {
        self.competition
    }

    /// Engine settings.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        // Registry updates are single assignments; a poisoned lock holds a
        // consistent map.
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start the engine. Idempotent.
    ///
    /// Fieldsets kept from a previous run get their monitors back.
    ///
    /// # Errors
    /// - `Internal`: a monitor thread could not be spawned
    pub fn start(&self) -> BridgeResult<()> {
        let mut registry = self.registry();
        if registry.running {
            return Ok(());
        }

        let titles: Vec<String> = registry.fieldsets.keys().cloned().collect();
        for title in &titles {
            if let Err(err) = self.ensure_monitor(&mut registry, title) {
                shutdown_monitors(&mut registry);
                return Err(err);
            }
        }
        registry.running = true;
        tracing::info!(
            competition = %self.competition,
            fieldsets = titles.len(),
            "bridge engine started"
        );
        Ok(())
    }

    /// Stop every monitor and wait for each to exit. Idempotent.
    pub fn stop(&self) {
        let mut registry = self.registry();
        if !registry.running {
            return;
        }
        registry.running = false;
        let stopped = shutdown_monitors(&mut registry);
        tracing::info!(monitors = stopped, "bridge engine stopped");
    }

    /// Whether `start` has been called without a later `stop`.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.registry().running
    }

    /// Get the handle for a dialog, connecting and starting its monitor on
    /// first use.
    ///
    /// # Errors
    /// - `NotRunning`: the engine is stopped
    /// - `NotFound`: no dialog with this title is open
    /// - `Internal`: the monitor thread could not be spawned
    pub fn get_fieldset(&self, title: &str) -> BridgeResult<Arc<Fieldset>> {
        let mut registry = self.registry();
        if !registry.running {
            return Err(BridgeError::NotRunning);
        }

        let existing = registry.fieldsets.get(title).cloned();
        let fieldset = if let Some(existing) = existing {
            existing
        } else {
            let fieldset = Fieldset::connect(Arc::clone(&self.inspector), title, self.competition)?
                .with_stream_capacity(self.config.stream_capacity());
            let fieldset = Arc::new(fieldset);
            registry.fieldsets.insert(title.to_string(), Arc::clone(&fieldset));
            tracing::info!(title, "fieldset registered");
            fieldset
        };

        self.ensure_monitor(&mut registry, title)?;
        Ok(fieldset)
    }

    fn ensure_monitor(&self, registry: &mut Registry, title: &str) -> BridgeResult<()> {
        if let Some(handle) = registry.monitors.get(title) {
            if !handle.join.is_finished() {
                return Ok(());
            }
        }
        if let Some(dead) = registry.monitors.remove(title) {
            if dead.join.join().is_err() {
                tracing::warn!(title, "monitor thread panicked; restarting");
            } else {
                tracing::warn!(title, "monitor exited unexpectedly; restarting");
            }
        }

        let fieldset = registry
            .fieldsets
            .get(title)
            .cloned()
            .ok_or_else(|| BridgeError::internal(format!("no fieldset registered as '{title}'")))?;

        let (stop, stop_rx) = bounded::<()>(1);
        let worker = MonitorWorker::new(fieldset, &self.config);
        let join = thread::Builder::new()
            .name(format!("tm-bridge-monitor-{title}"))
            .spawn(move || worker.run(&stop_rx))
            .map_err(|err| BridgeError::internal(format!("failed to spawn monitor for '{title}': {err}")))?;

        registry.monitors.insert(title.to_string(), MonitorHandle { stop, join });
        Ok(())
    }

    /// Titles of every registered fieldset.
    #[must_use]
    pub fn fieldset_titles(&self) -> Vec<String> {
        let mut titles: Vec<String> = self.registry().fieldsets.keys().cloned().collect();
        titles.sort();
        titles
    }

    /// Number of monitor threads still alive.
    #[must_use]
    pub fn monitor_count(&self) -> usize {
        self.registry()
            .monitors
            .values()
            .filter(|h| !h.join.is_finished())
            .count()
    }
}

/// Signal every loop, then join them all. Returns how many were stopped.
fn shutdown_monitors(registry: &mut Registry) -> usize {
    let joins: Vec<(String, JoinHandle<()>)> = registry
        .monitors
        .drain()
        .map(|(title, handle)| {
            drop(handle.stop);
            (title, handle.join)
        })
        .collect();
    let stopped = joins.len();
    for (title, join) in joins {
        if join.join().is_err() {
            tracing::warn!(title = %title, "monitor thread panicked");
        }
    }
    stopped
}

impl Drop for BridgeEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
