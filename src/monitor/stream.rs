use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use serde::Serialize;

use crate::error::{BridgeError, BridgeResult};
use crate::fieldset::Snapshot;

use super::notifier::{ObserverList, SnapshotObserver, SubscriptionId};

/// A changed snapshot, stamped for delivery over a stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotEvent {
    /// Fieldset the snapshot belongs to.
    pub title: String,
    /// When the monitor dispatched the change.
    pub observed_at: DateTime<Utc>,
    /// The new snapshot.
    pub snapshot: Arc<Snapshot>,
}

struct ChannelObserver {
    title: String,
    tx: Sender<SnapshotEvent>,
    dropped: Arc<AtomicU64>,
}

impl SnapshotObserver for ChannelObserver {
    fn on_snapshot(&self, snapshot: &Arc<Snapshot>) {
        let event = SnapshotEvent {
            title: self.title.clone(),
            observed_at: Utc::now(),
            snapshot: Arc::clone(snapshot),
        };
        // Never block the monitor thread: drop if the reader is slow.
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// A subscription stream of snapshot changes for one fieldset.
///
/// Dropping this stream unregisters it.
#[derive(Debug)]
pub struct SnapshotStream {
    title: String,
    subscription_id: SubscriptionId,
    rx: Receiver<SnapshotEvent>,
    observers: Arc<ObserverList>,
    dropped: Arc<AtomicU64>,
    unregistered: AtomicBool,
}

impl SnapshotStream {
    pub(crate) fn register(title: &str, observers: Arc<ObserverList>, capacity: usize) -> Self {
        let (tx, rx) = bounded::<SnapshotEvent>(capacity.max(1));
        let dropped = Arc::new(AtomicU64::new(0));
        let observer = ChannelObserver {
            title: title.to_string(),
            tx,
            dropped: Arc::clone(&dropped),
        };
        let subscription_id = observers.subscribe(Arc::new(observer));
        Self {
            title: title.to_string(),
            subscription_id,
            rx,
            observers,
            dropped,
            unregistered: AtomicBool::new(false),
        }
    }

    /// The subscription id backing this stream.
    #[must_use]
    pub const fn subscription_id(&self) -> SubscriptionId {
        self.subscription_id
    }

    /// Events discarded because the buffer was full.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Explicit unregistration. Idempotent.
    ///
    /// Events already buffered can still be received; after that the stream
    /// reports closed.
    pub fn unsubscribe(&self) {
        if self.unregistered.swap(true, Ordering::AcqRel) {
            return;
        }
        self.observers.unsubscribe(self.subscription_id);
    }

    /// Receive the next event (blocking).
    pub fn recv(&self) -> BridgeResult<SnapshotEvent> {
        self.rx.recv().map_err(|_| self.closed())
    }

    /// Receive the next event with a timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> BridgeResult<SnapshotEvent> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => BridgeError::Timeout {
                duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            },
            RecvTimeoutError::Disconnected => self.closed(),
        })
    }

    /// Receive an already-buffered event, if any.
    pub fn try_recv(&self) -> BridgeResult<Option<SnapshotEvent>> {
        match self.rx.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(self.closed()),
        }
    }

    fn closed(&self) -> BridgeError {
        BridgeError::StreamClosed {
            title: self.title.clone(),
        }
    }
}

impl Drop for SnapshotStream {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::fieldset::{ActiveMatch, FieldsetState};

    fn snap(play_sounds: bool) -> Arc<Snapshot> {
        Arc::new(Snapshot {
            audience_display: None,
            match_timer_content: None,
            match_time: 0,
            prestart_time: 0,
            match_state: FieldsetState::Disabled,
            current_field_id: None,
            match_on_field: None,
            saved_match_results: None,
            autonomous_bonus: None,
            play_sounds,
            show_results_automatically: false,
            active_match: ActiveMatch::NoActiveMatch,
        })
    }

    #[test]
    fn test_stream_receives_published_snapshots() {
        let observers = Arc::new(ObserverList::new());
        let stream = SnapshotStream::register("F1", Arc::clone(&observers), 8);
        observers.notify(&snap(true));

        let event = stream.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(event.title, "F1");
        assert!(event.snapshot.play_sounds);
        assert!(stream.try_recv().unwrap().is_none());
    }

    #[test]
    fn test_full_buffer_drops_instead_of_blocking() {
        let observers = Arc::new(ObserverList::new());
        let stream = SnapshotStream::register("F1", Arc::clone(&observers), 1);
        observers.notify(&snap(true));
        observers.notify(&snap(false));
        assert_eq!(stream.dropped_events(), 1);
    }

    #[test]
    fn test_unsubscribe_closes_stream_after_drain() {
        let observers = Arc::new(ObserverList::new());
        let stream = SnapshotStream::register("F1", Arc::clone(&observers), 8);
        observers.notify(&snap(true));
        stream.unsubscribe();
        stream.unsubscribe();
        assert!(observers.is_empty());

        assert!(stream.recv().is_ok());
        assert!(matches!(stream.recv(), Err(BridgeError::StreamClosed { .. })));
    }

    #[test]
    fn test_drop_unregisters() {
        let observers = Arc::new(ObserverList::new());
        {
            let _stream = SnapshotStream::register("F1", Arc::clone(&observers), 8);
            assert_eq!(observers.len(), 1);
        }
        assert!(observers.is_empty());
    }

    #[test]
    fn test_recv_timeout_reports_timeout() {
        let observers = Arc::new(ObserverList::new());
        let stream = SnapshotStream::register("F1", observers, 8);
        let err = stream.recv_timeout(Duration::from_millis(5)).unwrap_err();
        assert!(matches!(err, BridgeError::Timeout { duration_ms: 5 }));
    }
}
