//! Live todo snapshots pushed to subscribers.
//!
//! Every mutation in the store publishes the owner's complete todo list to
//! each of that owner's subscribers. Events are full snapshots, never deltas,
//! so a consumer only ever needs the latest one. Channels are unbounded: the
//! publisher never waits on a slow consumer.

use crate::types::Todo;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

/// What a subscriber receives.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotEvent {
    /// The owner's complete todo list after a change.
    Snapshot(Vec<Todo>),
    /// The live query failed; no further snapshots should be expected.
    Error(String),
}

struct Subscriber {
    owner: String,
    tx: UnboundedSender<SnapshotEvent>,
}

/// Registry of live-query subscribers, keyed by subscription id.
///
/// Thread-safe: uses an internal `Mutex` so it can be shared across async
/// tasks without requiring `&mut self`.
#[derive(Default)]
pub struct SnapshotHub {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<u64, Subscriber>>,
}

impl SnapshotHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, Subscriber>> {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a subscriber for `owner`'s todos.
    pub fn subscribe(self: &Arc<Self>, owner: &str) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().insert(
            id,
            Subscriber {
                owner: owner.to_string(),
                tx,
            },
        );
        debug!(subscription = id, owner = %owner, "Subscribed to todo snapshots");

        Subscription {
            id,
            rx,
            hub: Arc::downgrade(self),
        }
    }

    /// Remove a subscriber. Returns `true` if it was registered.
    pub fn unsubscribe(&self, id: u64) -> bool {
        let removed = self.lock().remove(&id).is_some();
        if removed {
            debug!(subscription = id, "Released todo subscription");
        }
        removed
    }

    pub fn has_subscribers(&self, owner: &str) -> bool {
        self.lock().values().any(|s| s.owner == owner)
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    /// Send `event` to every subscriber of `owner`. Subscribers whose receiver
    /// is gone are pruned. Returns how many received the event.
    pub fn publish(&self, owner: &str, event: SnapshotEvent) -> usize {
        let mut subscribers = self.lock();
        let mut delivered = 0;
        subscribers.retain(|id, sub| {
            if sub.owner != owner {
                return true;
            }
            if sub.tx.send(event.clone()).is_ok() {
                delivered += 1;
                true
            } else {
                debug!(subscription = *id, "Pruning closed todo subscription");
                false
            }
        });
        delivered
    }

    /// Send `event` to a single subscriber.
    pub fn send_to(&self, id: u64, event: SnapshotEvent) -> bool {
        self.lock()
            .get(&id)
            .is_some_and(|sub| sub.tx.send(event).is_ok())
    }
}

/// Receiving end of a live query. Dropping it releases the subscription.
pub struct Subscription {
    id: u64,
    rx: UnboundedReceiver<SnapshotEvent>,
    hub: Weak<SnapshotHub>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next event. `None` once the subscription has been
    /// released or the store is gone.
    pub async fn next(&mut self) -> Option<SnapshotEvent> {
        self.rx.recv().await
    }

    /// Next event if one is already queued.
    pub fn try_next(&mut self) -> Option<SnapshotEvent> {
        self.rx.try_recv().ok()
    }

    /// Drain everything queued and return the newest snapshot, if any.
    ///
    /// Errors are returned immediately since nothing follows them.
    pub fn latest(&mut self) -> Option<SnapshotEvent> {
        let mut newest = None;
        while let Ok(event) = self.rx.try_recv() {
            if matches!(event, SnapshotEvent::Error(_)) {
                return Some(event);
            }
            newest = Some(event);
        }
        newest
    }

    /// Release the subscription explicitly.
    pub fn release(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.unsubscribe(self.id);
        }
    }
}
