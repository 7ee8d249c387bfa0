//! Bus events to Prometheus counters.

use pm_telemetry::metrics::{
    BLOCKS_APPENDED, CHAIN_HALTS, CHAIN_HEIGHT, CONSENSUS_ROUNDS, CONSENSUS_STALLS,
    EVENTS_PUBLISHED, FINALITY_TRANSITIONS, MINING_OPERATIONS, NETWORK_HASHRATE, POW_EXHAUSTED,
    RECORDS_APPENDED, VALIDATIONS_SUBMITTED, WORK_VALUE,
};
use shared_bus::{EventFilter, InMemoryEventBus, KindCount, MiningEvent};
use shared_types::{ConsensusLayer, FinalDecision, FinalityStage};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

fn layer_label(layer: ConsensusLayer) -> &'static str {
    match layer {
        ConsensusLayer::Stake => "stake",
        ConsensusLayer::Research => "research",
    }
}

fn stage_label(stage: &FinalityStage) -> &'static str {
    match stage {
        FinalityStage::Provisional => "provisional",
        FinalityStage::Staked => "staked",
        FinalityStage::Certified => "certified",
        FinalityStage::Immutable => "immutable",
        FinalityStage::Rejected { .. } => "rejected",
    }
}

const BUS_SYNC_INTERVAL: Duration = Duration::from_secs(5);

/// Copy the bus's own per-kind totals into the exported counter.
///
/// Read from the publisher, so events this recorder lagged past or that
/// had no subscriber still count. `seen` holds what was already exported.
pub fn sync_bus_counts(bus: &InMemoryEventBus, seen: &mut BTreeMap<&'static str, KindCount>) {
    for (kind, count) in bus.counts_by_kind() {
        let previous = seen.insert(kind, count).unwrap_or_default();
        let delta = count.published.saturating_sub(previous.published);
        if delta > 0 {
            EVENTS_PUBLISHED
                .with_label_values(&[kind])
                .inc_by(delta as f64);
        }
    }
}

/// Update domain counters for one event.
pub fn record_event(event: &MiningEvent) {
    match event {
        MiningEvent::MiningOperationStarted { .. } => {
            MINING_OPERATIONS.with_label_values(&["started"]).inc();
        }
        MiningEvent::WorkItemCreated {
            work_type, value, ..
        } => {
            MINING_OPERATIONS.with_label_values(&["completed"]).inc();
            WORK_VALUE
                .with_label_values(&[work_type.as_str()])
                .observe(*value);
        }
        MiningEvent::MiningOperationFailed { .. } => {
            MINING_OPERATIONS.with_label_values(&["failed"]).inc();
        }
        MiningEvent::MiningOperationCancelled { .. } => {
            MINING_OPERATIONS.with_label_values(&["cancelled"]).inc();
        }
        MiningEvent::BlockCreated {
            index,
            pow_satisfied,
            ..
        } => {
            BLOCKS_APPENDED.inc();
            CHAIN_HEIGHT.set(*index as f64);
            if !pow_satisfied {
                POW_EXHAUSTED.inc();
            }
        }
        MiningEvent::LedgerHalted { .. } => {
            CHAIN_HALTS.with_label_values(&["ledger"]).inc();
        }
        MiningEvent::ValidationSubmitted {
            layer, decision, ..
        } => {
            let decision = if decision.is_approval() {
                "approve"
            } else {
                "reject"
            };
            VALIDATIONS_SUBMITTED
                .with_label_values(&[layer_label(*layer), decision])
                .inc();
        }
        MiningEvent::ConsensusReached(result) => {
            let outcome = match result.decision() {
                Some(FinalDecision::Accepted) => "accepted",
                Some(FinalDecision::Rejected) => "rejected",
                None => "pending",
            };
            CONSENSUS_ROUNDS
                .with_label_values(&[layer_label(result.layer), outcome])
                .inc();
        }
        MiningEvent::ConsensusStalled(report) => {
            CONSENSUS_STALLS
                .with_label_values(&[layer_label(report.layer)])
                .inc();
        }
        MiningEvent::FinalityAdvanced { stage, .. } => {
            FINALITY_TRANSITIONS
                .with_label_values(&[stage_label(stage)])
                .inc();
        }
        MiningEvent::BlockRejected { .. } => {
            FINALITY_TRANSITIONS.with_label_values(&["rejected"]).inc();
        }
        MiningEvent::RecordAppended { chain_id, .. } => {
            RECORDS_APPENDED
                .with_label_values(&[chain_id.as_str()])
                .inc();
        }
        MiningEvent::RecordChainHalted { chain_id, .. } => {
            CHAIN_HALTS.with_label_values(&[chain_id.as_str()]).inc();
        }
        MiningEvent::NetworkMetrics {
            network_hashrate, ..
        } => {
            NETWORK_HASHRATE.set(*network_hashrate as f64);
        }
        MiningEvent::MiningProgress { .. } => {}
    }
}

/// Subscribe to every event and record it until shutdown or bus close.
pub fn spawn_event_metrics(
    bus: Arc<InMemoryEventBus>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let mut subscription = bus.subscribe(EventFilter::all());
    tokio::spawn(async move {
        let mut seen = BTreeMap::new();
        let mut sync = tokio::time::interval(BUS_SYNC_INTERVAL);
        loop {
            tokio::select! {
                event = subscription.recv() => match event {
                    Some(event) => record_event(&event),
                    None => break,
                },
                _ = sync.tick() => sync_bus_counts(&bus, &mut seen),
                _ = shutdown.changed() => break,
            }
        }
        sync_bus_counts(&bus, &mut seen);
        debug!(lagged = subscription.lagged(), "Event metrics recorder stopped");
    })
}
