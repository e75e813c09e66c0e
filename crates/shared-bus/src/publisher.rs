//! # Event Publisher
//!
//! The sending half of the bus. Bugs publish every event they emit.

use crate::events::{BugEvent, EventFilter};
use crate::subscriber::Subscription;
use crate::DEFAULT_CHANNEL_CAPACITY;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Sink for bug events.
///
/// Publishing never blocks and never fails.
pub trait EventPublisher: Send + Sync {
    /// Publish an event; returns the number of receivers it reached.
    fn publish(&self, event: BugEvent) -> usize;

    /// Events accepted so far, delivered or not.
    fn events_published(&self) -> u64;
}

/// Broadcast-backed bus for async consumers of bug events.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<BugEvent>,
    published: AtomicU64,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// A bus whose subscribers may fall `capacity` events behind before
    /// they start losing the oldest ones.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            published: AtomicU64::new(0),
        }
    }

    /// Receive events matching `filter` from now on.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(topics = ?filter.topics, bugs = ?filter.bug_ids, "Subscribed to bug events");
        Subscription::new(self.sender.subscribe(), filter)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher for InMemoryEventBus {
    fn publish(&self, event: BugEvent) -> usize {
        self.published.fetch_add(1, Ordering::Relaxed);
        let topic = event.topic();
        let bug_id = event.bug_id();
        // No receivers is not an error.
        let receivers = self.sender.send(event).unwrap_or(0);
        trace!(?topic, ?bug_id, receivers, "Published bug event");
        receivers
    }

    fn events_published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}
