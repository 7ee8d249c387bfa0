//! Operator console: drains the operator channel into the log and keeps
//! the most recent alerts for `NodeApi`.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use shared_types::OperatorAlert;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Bounded history of operator alerts, oldest first.
#[derive(Debug)]
pub struct AlertLog {
    entries: Mutex<VecDeque<OperatorAlert>>,
    capacity: usize,
}

impl AlertLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&self, alert: OperatorAlert) {
        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(alert);
    }

    pub fn recent(&self) -> Vec<OperatorAlert> {
        self.entries.lock().iter().cloned().collect()
    }
}

pub fn spawn_operator_console(
    mut alerts: mpsc::UnboundedReceiver<OperatorAlert>,
    log: Arc<AlertLog>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                alert = alerts.recv() => match alert {
                    Some(alert) => {
                        match &alert {
                            OperatorAlert::ConsensusTimeout(report) => error!(
                                layer = %report.layer,
                                target = %report.target,
                                validations = report.validations,
                                required = report.required,
                                "[operator] Consensus timeout"
                            ),
                            OperatorAlert::LedgerHalted { reason } => {
                                error!(reason = %reason, "[operator] Ledger halted, resume required");
                            }
                            OperatorAlert::RecordChainHalted { chain_id, sequence, reason } => error!(
                                chain_id = %chain_id,
                                sequence,
                                reason = %reason,
                                "[operator] Record chain halted, resume required"
                            ),
                        }
                        log.push(alert);
                    }
                    None => break,
                },
                _ = shutdown.changed() => break,
            }
        }
        debug!("Operator console stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_bus::{operator_channel, OperatorChannel};

    #[test]
    fn test_alert_log_is_bounded() {
        let log = AlertLog::new(2);
        for i in 0..3 {
            log.push(OperatorAlert::LedgerHalted {
                reason: format!("halt {i}"),
            });
        }
        let recent = log.recent();
        assert_eq!(recent.len(), 2);
        assert_eq!(
            recent[0],
            OperatorAlert::LedgerHalted {
                reason: "halt 1".into()
            }
        );
    }

    #[tokio::test]
    async fn test_console_drains_channel() {
        let (sender, receiver) = operator_channel();
        let log = Arc::new(AlertLog::new(8));
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = spawn_operator_console(receiver, Arc::clone(&log), shutdown_rx);

        sender.report(OperatorAlert::LedgerHalted {
            reason: "broken link at 4".into(),
        });
        drop(sender);
        handle.await.unwrap();

        assert_eq!(log.recent().len(), 1);
    }
}
