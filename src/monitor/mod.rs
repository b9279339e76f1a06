//! Monitoring subsystem: polling, change detection and delivery.
//!
//! Each registered fieldset gets one `MonitorWorker` on a dedicated thread.
//! The worker polls snapshots under a `CachePolicy`, hands them to the
//! fieldset's `ObserverList`, and observers receive only real changes, either
//! as callbacks or through a buffered `SnapshotStream`.

/// Change detection and observer fan-out.
pub mod notifier;
/// Snapshot reads with low-CPU caching.
pub mod poll;
/// Subscriber stream handle.
pub mod stream;
/// Per-fieldset monitor loop.
pub mod worker;

pub use notifier::{should_notify, ObserverList, SnapshotObserver, SubscriptionId};
pub use poll::{poll, CachePolicy};
pub use stream::{SnapshotEvent, SnapshotStream};
pub use worker::{MonitorWorker, Step};
