//! # Shared Bus - Broadcast Collaborator
//!
//! Fire-and-forget, at-most-once delivery of state-change events from the
//! ledger, mining, consensus and record subsystems to any subscriber.
//!
//! ## Delivery Rules
//!
//! - Events published with no live subscriber are dropped.
//! - Each emitter's events arrive in the order it published them.
//! - No ordering is promised across emitters.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │ Subsystem A  │                    │  Dashboard   │
//! │              │    publish()       │  / Runtime   │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod operator;
pub mod publisher;
pub mod subscriber;

pub use events::{EventFilter, EventTopic, MiningEvent};
pub use operator::{operator_channel, LoggingOperatorChannel, OperatorChannel, OperatorSender};
pub use publisher::{EventPublisher, InMemoryEventBus, KindCount};
pub use subscriber::{Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before the oldest are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
