//! # Event Subscriber
//!
//! Receiving side of the event bus. Each `Subscription` owns a broadcast
//! receiver and applies its filter locally.

use crate::events::{EventFilter, MiningEvent};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The event bus was closed.
    #[error("Event bus closed")]
    Closed,
}

/// A subscription handle for receiving events.
///
/// Dropping the handle detaches it from the bus.
pub struct Subscription {
    receiver: broadcast::Receiver<MiningEvent>,
    filter: EventFilter,
    lagged: u64,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<MiningEvent>, filter: EventFilter) -> Self {
        Self {
            receiver,
            filter,
            lagged: 0,
        }
    }

    /// Receive the next matching event.
    ///
    /// Returns `None` once the bus is dropped.
    pub async fn recv(&mut self) -> Option<MiningEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    self.lagged += count;
                    debug!(lagged = count, "Subscriber lagged, events dropped");
                }
            }
        }
    }

    /// Receive the next matching event, giving up after `wait`.
    pub async fn recv_timeout(&mut self, wait: Duration) -> Option<MiningEvent> {
        tokio::time::timeout(wait, self.recv()).await.ok().flatten()
    }

    /// Receive without waiting.
    ///
    /// `Ok(None)` means nothing matching is buffered right now.
    pub fn try_recv(&mut self) -> Result<Option<MiningEvent>, SubscriptionError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Ok(Some(event)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    self.lagged += count;
                }
            }
        }
    }

    /// Take every matching event currently buffered.
    pub fn drain(&mut self) -> Vec<MiningEvent> {
        let mut events = Vec::new();
        while let Ok(Some(event)) = self.try_recv() {
            events.push(event);
        }
        events
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    /// Events lost to lag since the subscription was created.
    #[must_use]
    pub fn lagged(&self) -> u64 {
        self.lagged
    }
}
