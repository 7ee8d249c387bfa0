//! Publishing side of the bus, with per-kind delivery accounting.

use crate::events::{EventFilter, MiningEvent};
use crate::subscriber::Subscription;
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Emits state-change events.
///
/// Never blocks and never fails the caller. An event nobody is listening
/// for is counted and then lost.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Returns how many subscribers were handed the event.
    async fn publish(&self, event: MiningEvent) -> usize;

    fn events_published(&self) -> u64;
}

/// Emission counts for one event kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindCount {
    pub published: u64,
    /// Published while no subscriber was attached.
    pub undelivered: u64,
}

/// Broadcast bus for a single node.
///
/// One `send` per event keeps each emitter's events in the order it
/// published them. A subscriber more than `capacity` events behind loses
/// the oldest.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<MiningEvent>,
    total: AtomicU64,
    by_kind: Mutex<BTreeMap<&'static str, KindCount>>,
    capacity: usize,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            total: AtomicU64::new(0),
            by_kind: Mutex::new(BTreeMap::new()),
            capacity,
        }
    }

    /// Attach a subscriber. It sees only events published after this call.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(topics = ?filter.topics, "Subscriber attached");
        Subscription::new(self.sender.subscribe(), filter)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Emission counts keyed by event kind, since the bus was created.
    #[must_use]
    pub fn counts_by_kind(&self) -> BTreeMap<&'static str, KindCount> {
        self.by_kind.lock().clone()
    }

    fn account(&self, kind: &'static str, delivered: bool) {
        self.total.fetch_add(1, Ordering::Relaxed);
        let mut by_kind = self.by_kind.lock();
        let count = by_kind.entry(kind).or_default();
        count.published += 1;
        if !delivered {
            count.undelivered += 1;
        }
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: MiningEvent) -> usize {
        let kind = event.kind();
        match self.sender.send(event) {
            Ok(receivers) => {
                self.account(kind, true);
                trace!(kind, receivers, "Event published");
                receivers
            }
            Err(_) => {
                self.account(kind, false);
                trace!(kind, "Event dropped, no subscribers");
                0
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}
