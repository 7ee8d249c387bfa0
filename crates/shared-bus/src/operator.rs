//! # Operator Channel
//!
//! Conditions that must not be silently abandoned (stalled consensus,
//! halted chains) are reported here in addition to the event bus. Unlike
//! bus events, alerts are queued until the operator side drains them.

use shared_types::OperatorAlert;
use tokio::sync::mpsc;
use tracing::{error, warn};

/// Sink for operator alerts.
pub trait OperatorChannel: Send + Sync {
    fn report(&self, alert: OperatorAlert);
}

/// Unbounded mpsc-backed channel.
#[derive(Debug, Clone)]
pub struct OperatorSender {
    sender: mpsc::UnboundedSender<OperatorAlert>,
}

/// Create a connected sender/receiver pair.
#[must_use]
pub fn operator_channel() -> (OperatorSender, mpsc::UnboundedReceiver<OperatorAlert>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (OperatorSender { sender }, receiver)
}

impl OperatorChannel for OperatorSender {
    fn report(&self, alert: OperatorAlert) {
        warn!(alert = %alert, "Operator alert raised");
        if let Err(e) = self.sender.send(alert) {
            // Receiver gone: the alert is still in the log above.
            error!(alert = %e.0, "Operator channel closed");
        }
    }
}

/// Channel that only logs. Used when no operator console is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingOperatorChannel;

impl OperatorChannel for LoggingOperatorChannel {
    fn report(&self, alert: OperatorAlert) {
        warn!(alert = %alert, "Operator alert raised (no operator attached)");
    }
}
