//! Per-fieldset monitor loop.
//!
//! One worker runs on its own thread for each registered fieldset. Each
//! iteration polls a snapshot, publishes it if it changed, and sleeps out the
//! rest of the poll interval. Any poll failure is treated as a lost
//! connection: the worker disconnects, tries one reconnect, and backs off if
//! that fails. The loop only exits when its stop channel disconnects.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};

use crate::config::EngineConfig;
use crate::fieldset::{Fieldset, Snapshot};

use super::poll::{poll, CachePolicy};

/// What one iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A changed snapshot was dispatched to observers.
    Published,
    /// The snapshot equals the previous one.
    Unchanged,
    /// The poll failed and the connection was re-acquired.
    Reconnected,
    /// The poll failed and so did the reconnect.
    Backoff,
}

/// Polling state for one fieldset.
#[derive(Debug)]
pub struct MonitorWorker {
    fieldset: Arc<Fieldset>,
    policy: CachePolicy,
    poll_interval: Duration,
    reconnect_backoff: Duration,
    previous: Option<Arc<Snapshot>>,
    iteration: u32,
    failing: bool,
}

impl MonitorWorker {
    /// Create a worker for `fieldset`.
    ///
    /// The last snapshot the fieldset published is the baseline for change
    /// detection, so a restarted monitor stays quiet until something changes.
    /// The first poll is still a full refresh.
    #[must_use]
    pub fn new(fieldset: Arc<Fieldset>, config: &EngineConfig) -> Self {
        let previous = fieldset.latest_snapshot();
        Self {
            fieldset,
            policy: config.cache_policy(),
            poll_interval: config.poll_interval(),
            reconnect_backoff: config.reconnect_backoff(),
            previous,
            iteration: 0,
            failing: false,
        }
    }

    /// Position in the cache cycle of the next poll.
    #[must_use]
    pub const fn iteration(&self) -> u32 {
        self.iteration
    }

    /// Baseline for change detection: the last snapshot published.
    #[must_use]
    pub fn previous(&self) -> Option<&Arc<Snapshot>> {
        self.previous.as_ref()
    }

    /// Run one iteration without sleeping.
    pub fn step(&mut self) -> Step {
        match poll(&self.fieldset, self.previous.as_deref(), self.iteration, self.policy) {
            Ok(snapshot) => {
                self.failing = false;
                let snapshot = Arc::new(snapshot);
                let changed = self
                    .fieldset
                    .observers()
                    .maybe_notify(self.previous.as_deref(), &snapshot);
                self.fieldset.publish(Arc::clone(&snapshot));
                self.previous = Some(snapshot);
                self.iteration = self.policy.next_iteration(self.iteration);
                if changed {
                    Step::Published
                } else {
                    Step::Unchanged
                }
            }
            Err(err) => self.recover(&err),
        }
    }

    fn recover(&mut self, err: &crate::error::BridgeError) -> Step {
        let title = self.fieldset.title();
        if self.failing {
            tracing::debug!(title, error = %err, "poll still failing");
        } else {
            tracing::warn!(title, error = %err, "lost connection to fieldset");
            self.failing = true;
        }

        self.fieldset.disconnect();
        match self.fieldset.reconnect() {
            Ok(()) => {
                tracing::info!(title, "reconnected to fieldset");
                // Cached fields may be stale; read everything next time.
                self.iteration = 0;
                Step::Reconnected
            }
            Err(err) => {
                tracing::debug!(
                    title,
                    error = %err,
                    backoff_ms = u64::try_from(self.reconnect_backoff.as_millis()).unwrap_or(u64::MAX),
                    "reconnect failed"
                );
                Step::Backoff
            }
        }
    }

    /// Loop until `stop` disconnects.
    pub fn run(mut self, stop: &Receiver<()>) {
        tracing::debug!(title = self.fieldset.title(), "monitor started");
        loop {
            if matches!(stop.try_recv(), Ok(()) | Err(TryRecvError::Disconnected)) {
                break;
            }
            let started = Instant::now();
            let wait = match self.step() {
                Step::Reconnected => Duration::ZERO,
                Step::Backoff => self.reconnect_backoff,
                Step::Published | Step::Unchanged => self.poll_interval.saturating_sub(started.elapsed()),
            };
            if wait.is_zero() {
                continue;
            }
            match stop.recv_timeout(wait) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        tracing::debug!(title = self.fieldset.title(), "monitor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;
    use std::thread;

    use crossbeam_channel::bounded;

    use crate::fieldset::{Competition, FieldsetState};
    use crate::inspector::{SimulatedFieldset, SimulatedInspector};

    fn setup() -> (Arc<SimulatedFieldset>, Arc<Fieldset>) {
        let inspector = Arc::new(SimulatedInspector::new());
        let target = inspector.add_fieldset("F1", Competition::V5rc);
        let fieldset = Arc::new(Fieldset::connect(inspector, "F1", Competition::V5rc).unwrap());
        (target, fieldset)
    }

    fn record(fieldset: &Fieldset) -> Arc<Mutex<Vec<Arc<Snapshot>>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        fieldset.subscribe(Arc::new(move |s: &Arc<Snapshot>| sink.lock().unwrap().push(Arc::clone(s))));
        seen
    }

    #[test]
    fn test_first_poll_publishes_then_quiet() {
        let (_target, fieldset) = setup();
        let seen = record(&fieldset);
        let mut worker = MonitorWorker::new(Arc::clone(&fieldset), &EngineConfig::default());

        assert_eq!(worker.step(), Step::Published);
        assert_eq!(worker.step(), Step::Unchanged);
        assert_eq!(worker.step(), Step::Unchanged);
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(worker.iteration(), 3);
        assert_eq!(fieldset.latest_snapshot(), worker.previous().cloned());
    }

    #[test]
    fn test_iteration_wraps_at_cycle() {
        let (_target, fieldset) = setup();
        let mut worker = MonitorWorker::new(fieldset, &EngineConfig::default());
        for _ in 0..10 {
            worker.step();
        }
        assert_eq!(worker.iteration(), 0);
    }

    #[test]
    fn test_changes_are_published_in_order() {
        let (target, fieldset) = setup();
        let seen = record(&fieldset);
        let mut worker = MonitorWorker::new(fieldset, &EngineConfig::default());

        worker.step();
        target.update(|s| s.state = FieldsetState::Prestart);
        assert_eq!(worker.step(), Step::Published);
        target.update(|s| s.state = FieldsetState::Autonomous);
        assert_eq!(worker.step(), Step::Published);

        let states: Vec<_> = seen.lock().unwrap().iter().map(|s| s.match_state).collect();
        assert_eq!(
            states,
            vec![FieldsetState::Disabled, FieldsetState::Prestart, FieldsetState::Autonomous]
        );
    }

    #[test]
    fn test_transient_failure_reconnects_without_duplicate_notification() {
        let (target, fieldset) = setup();
        let seen = record(&fieldset);
        let mut worker = MonitorWorker::new(Arc::clone(&fieldset), &EngineConfig::default());

        worker.step();
        worker.step();
        target.fail_next_calls(1);
        assert_eq!(worker.step(), Step::Reconnected);
        assert_eq!(worker.iteration(), 0);
        assert!(fieldset.is_connected());

        assert_eq!(worker.step(), Step::Unchanged);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_closed_dialog_backs_off_until_reopened() {
        let (target, fieldset) = setup();
        let mut worker = MonitorWorker::new(Arc::clone(&fieldset), &EngineConfig::default());
        worker.step();

        target.set_online(false);
        assert_eq!(worker.step(), Step::Backoff);
        assert!(!fieldset.is_connected());
        assert_eq!(worker.step(), Step::Backoff);

        target.update(|s| {
            s.online = true;
            s.state = FieldsetState::Prestart;
        });
        assert_eq!(worker.step(), Step::Reconnected);
        assert_eq!(worker.step(), Step::Published);
    }

    #[test]
    fn test_replacement_worker_keeps_published_baseline() {
        let (_target, fieldset) = setup();
        let seen = record(&fieldset);
        let mut first = MonitorWorker::new(Arc::clone(&fieldset), &EngineConfig::default());
        first.step();
        first.step();
        drop(first);

        let mut second = MonitorWorker::new(Arc::clone(&fieldset), &EngineConfig::default());
        assert_eq!(second.iteration(), 0);
        assert_eq!(second.previous().cloned(), fieldset.latest_snapshot());
        assert_eq!(second.step(), Step::Unchanged);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_run_waits_out_backoff_between_reconnects() {
        let (target, fieldset) = setup();
        let config = EngineConfig {
            poll_interval_ms: 1,
            reconnect_backoff_ms: 200,
            ..EngineConfig::default()
        };
        let worker = MonitorWorker::new(Arc::clone(&fieldset), &config);
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let join = thread::spawn(move || worker.run(&stop_rx));

        while fieldset.latest_snapshot().is_none() {
            thread::sleep(Duration::from_millis(1));
        }
        target.set_online(false);
        target.reset_counters();
        thread::sleep(Duration::from_millis(700));

        let attempts = target.connect_attempts();
        assert!((2..=6).contains(&attempts), "reconnect attempts in 700ms: {attempts}");

        // The worker is parked in a backoff wait; stopping must not sit it out.
        let started = Instant::now();
        drop(stop_tx);
        join.join().unwrap();
        assert!(started.elapsed() < Duration::from_millis(150));
    }

    #[test]
    fn test_run_exits_when_stop_sender_drops() {
        let (_target, fieldset) = setup();
        let config = EngineConfig {
            poll_interval_ms: 5_000,
            ..EngineConfig::default()
        };
        let worker = MonitorWorker::new(Arc::clone(&fieldset), &config);
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let join = thread::spawn(move || worker.run(&stop_rx));

        while fieldset.latest_snapshot().is_none() {
            thread::sleep(Duration::from_millis(1));
        }
        let started = Instant::now();
        drop(stop_tx);
        join.join().unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
