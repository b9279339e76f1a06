//! Change detection and observer fan-out.
//!
//! Every fieldset owns one `ObserverList`. The monitor thread hands each poll
//! result to `maybe_notify`, which compares it with the previous snapshot and
//! only dispatches on a difference. Dispatch iterates a copy of the list taken
//! at dispatch time, so subscribe/unsubscribe never block on, or interleave
//! with, an observer call in progress.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fieldset::Snapshot;

/// Unique identifier for an observer registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Create a new random subscription id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Receives snapshots that differ from the one before.
///
/// Called synchronously on the fieldset's monitor thread. A slow observer
/// slows polling for that fieldset only.
pub trait SnapshotObserver: Send + Sync {
    /// A new, changed snapshot was observed.
    fn on_snapshot(&self, snapshot: &Arc<Snapshot>);
}

impl<F> SnapshotObserver for F
where
    F: Fn(&Arc<Snapshot>) + Send + Sync,
{
    fn on_snapshot(&self, snapshot: &Arc<Snapshot>) {
        self(snapshot);
    }
}

/// Whether `next` must be published given the last published snapshot.
#[must_use]
pub fn should_notify(previous: Option<&Snapshot>, next: &Snapshot) -> bool {
    previous != Some(next)
}

fn same_observer(a: &Arc<dyn SnapshotObserver>, b: &Arc<dyn SnapshotObserver>) -> bool {
    // Compare data pointers only; vtable pointers for one type can differ
    // between codegen units.
    std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}

#[derive(Clone)]
struct Registration {
    id: SubscriptionId,
    observer: Arc<dyn SnapshotObserver>,
}

/// Ordered, duplicate-free set of observers.
#[derive(Default)]
pub struct ObserverList {
    entries: RwLock<Vec<Registration>>,
}

impl std::fmt::Debug for ObserverList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverList").field("len", &self.len()).finish()
    }
}

impl ObserverList {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer.
    ///
    /// Registering the same `Arc` again is a no-op that returns the original
    /// id; the observer is still called once per notification.
    pub fn subscribe(&self, observer: Arc<dyn SnapshotObserver>) -> SubscriptionId {
        let mut entries = self.entries.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(existing) = entries.iter().find(|r| same_observer(&r.observer, &observer)) {
            return existing.id;
        }
        let id = SubscriptionId::new();
        entries.push(Registration { id, observer });
        id
    }

    /// Remove a registration. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|r| r.id != id);
        entries.len() != before
    }

    /// Number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// True when nobody is listening.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call every observer once, in registration order. Returns how many
    /// were called.
    pub fn notify(&self, snapshot: &Arc<Snapshot>) -> usize {
        let targets: Vec<Registration> = match self.entries.read() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };

        for reg in &targets {
            let observer = &reg.observer;
            // A panicking observer must not take the monitor thread down.
            if panic::catch_unwind(AssertUnwindSafe(|| observer.on_snapshot(snapshot))).is_err() {
                tracing::warn!(subscription = ?reg.id, "snapshot observer panicked");
            }
        }
        targets.len()
    }

    /// Dispatch `next` only if it differs from `previous`. Returns whether
    /// observers were called.
    pub fn maybe_notify(&self, previous: Option<&Snapshot>, next: &Arc<Snapshot>) -> bool {
        if !should_notify(previous, next) {
            return false;
        }
        self.notify(next);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use crate::fieldset::{ActiveMatch, FieldsetState};

    fn snap(timer: &str) -> Snapshot {
        Snapshot {
            audience_display: None,
            match_timer_content: Some(timer.to_string()),
            match_time: 0,
            prestart_time: 0,
            match_state: FieldsetState::Disabled,
            current_field_id: None,
            match_on_field: None,
            saved_match_results: None,
            autonomous_bonus: None,
            play_sounds: false,
            show_results_automatically: false,
            active_match: ActiveMatch::NoActiveMatch,
        }
    }

    fn recorder() -> (Arc<Mutex<Vec<String>>>, Arc<dyn SnapshotObserver>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer: Arc<dyn SnapshotObserver> = Arc::new(move |s: &Arc<Snapshot>| {
            sink.lock().unwrap().push(s.match_timer_content.clone().unwrap_or_default());
        });
        (seen, observer)
    }

    #[test]
    fn test_only_changes_are_published() {
        let list = ObserverList::new();
        let (seen, observer) = recorder();
        list.subscribe(observer);

        let mut previous: Option<Arc<Snapshot>> = None;
        for timer in ["A", "A", "B", "B", "B", "C"] {
            let next = Arc::new(snap(timer));
            list.maybe_notify(previous.as_deref(), &next);
            previous = Some(next);
        }

        assert_eq!(*seen.lock().unwrap(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_first_snapshot_is_always_published() {
        assert!(should_notify(None, &snap("A")));
        assert!(!should_notify(Some(&snap("A")), &snap("A")));
    }

    #[test]
    fn test_duplicate_registration_is_called_once() {
        let list = ObserverList::new();
        let (seen, observer) = recorder();
        let a = list.subscribe(Arc::clone(&observer));
        let b = list.subscribe(observer);
        assert_eq!(a, b);
        assert_eq!(list.len(), 1);

        list.notify(&Arc::new(snap("A")));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_observers_run_in_registration_order() {
        let list = ObserverList::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in 0..3 {
            let order = Arc::clone(&order);
            list.subscribe(Arc::new(move |_: &Arc<Snapshot>| order.lock().unwrap().push(tag)));
        }
        list.notify(&Arc::new(snap("A")));
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_unsubscribed_observer_is_not_called() {
        let list = ObserverList::new();
        let (seen, observer) = recorder();
        let id = list.subscribe(observer);
        assert!(list.unsubscribe(id));
        assert!(!list.unsubscribe(id));
        assert!(list.is_empty());

        list.notify(&Arc::new(snap("A")));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unsubscribe_during_dispatch_does_not_skip_others() {
        let list = Arc::new(ObserverList::new());
        let (seen, tail) = recorder();

        let victim_id = Arc::new(Mutex::new(None::<SubscriptionId>));
        let remover = {
            let list = Arc::clone(&list);
            let victim_id = Arc::clone(&victim_id);
            move |_: &Arc<Snapshot>| {
                if let Some(id) = victim_id.lock().unwrap().take() {
                    list.unsubscribe(id);
                }
            }
        };
        list.subscribe(Arc::new(remover));
        let id = list.subscribe(Arc::clone(&tail));
        *victim_id.lock().unwrap() = Some(id);

        // In-flight dispatch still reaches the removed observer once.
        list.notify(&Arc::new(snap("A")));
        assert_eq!(seen.lock().unwrap().len(), 1);

        list.notify(&Arc::new(snap("B")));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_panicking_observer_does_not_stop_fan_out() {
        let list = ObserverList::new();
        list.subscribe(Arc::new(|_: &Arc<Snapshot>| panic!("boom")));
        let (seen, observer) = recorder();
        list.subscribe(observer);

        assert_eq!(list.notify(&Arc::new(snap("A"))), 2);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
