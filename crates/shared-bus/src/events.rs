//! # Mining Events
//!
//! Defines all event types that flow through the shared bus.
//! Each subsystem emits in its own causal order; no ordering is promised
//! across emitters.

use serde::{Deserialize, Serialize};
use shared_types::{
    ChainId, ConsensusLayer, ConsensusResult, Decision, FinalityStage, Hash, MinerId, OperationId,
    StallReport, TargetRef, ValidatorId, WorkItemId, WorkType,
};

/// All events that can be published to the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MiningEvent {
    // =========================================================================
    // SUBSYSTEM 3: MINING COORDINATOR
    // =========================================================================
    /// A mining operation was accepted.
    MiningOperationStarted {
        operation_id: OperationId,
        work_type: WorkType,
        difficulty: u32,
        miner_id: MinerId,
        estimated_completion: u64,
    },

    /// A tick advanced an operation.
    MiningProgress {
        operation_id: OperationId,
        progress: f64,
    },

    /// An operation completed and emitted its work item.
    WorkItemCreated {
        operation_id: OperationId,
        work_item_id: WorkItemId,
        work_type: WorkType,
        value: f64,
    },

    /// Work synthesis failed; no work item exists.
    MiningOperationFailed {
        operation_id: OperationId,
        reason: String,
    },

    MiningOperationCancelled { operation_id: OperationId },

    // =========================================================================
    // SUBSYSTEM 2: BLOCKCHAIN LEDGER
    // =========================================================================
    /// A block was appended to the ledger.
    BlockCreated {
        index: u64,
        block_hash: Hash,
        previous_hash: Hash,
        miner_id: MinerId,
        pow_satisfied: bool,
    },

    /// The ledger stopped accepting appends.
    LedgerHalted { reason: String },

    // =========================================================================
    // SUBSYSTEMS 4/5: STAKE AND RESEARCH CONSENSUS
    // =========================================================================
    /// A validator decision was recorded.
    ValidationSubmitted {
        layer: ConsensusLayer,
        target: TargetRef,
        validator_id: ValidatorId,
        decision: Decision,
    },

    /// A consensus round reached a terminal decision.
    ConsensusReached(ConsensusResult),

    /// A consensus round missed its collection window.
    ConsensusStalled(StallReport),

    // =========================================================================
    // SUBSYSTEM 7: CONSENSUS ORCHESTRATOR
    // =========================================================================
    /// A block moved forward in the finality state machine.
    FinalityAdvanced {
        block_hash: Hash,
        index: u64,
        stage: FinalityStage,
    },

    /// A block was rejected. It stays in storage but leaves the canonical chain.
    BlockRejected {
        block_hash: Hash,
        index: u64,
        reason: String,
    },

    // =========================================================================
    // SUBSYSTEM 6: IMMUTABLE RECORDS
    // =========================================================================
    /// A record was appended to an audit chain.
    RecordAppended {
        chain_id: ChainId,
        sequence: u64,
        record_hash: Hash,
    },

    /// An audit chain halted on an integrity violation.
    RecordChainHalted {
        chain_id: ChainId,
        sequence: u64,
        reason: String,
    },

    // =========================================================================
    // RUNTIME
    // =========================================================================
    /// Periodic network metrics snapshot.
    NetworkMetrics {
        active_operations: usize,
        blocks_per_hour: f64,
        average_block_time_secs: f64,
        value_last_hour: f64,
        network_hashrate: u64,
        total_knowledge_created: f64,
    },
}

impl MiningEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            MiningEvent::MiningOperationStarted { .. }
            | MiningEvent::MiningProgress { .. }
            | MiningEvent::WorkItemCreated { .. }
            | MiningEvent::MiningOperationFailed { .. }
            | MiningEvent::MiningOperationCancelled { .. } => EventTopic::Mining,
            MiningEvent::BlockCreated { .. } | MiningEvent::LedgerHalted { .. } => {
                EventTopic::Ledger
            }
            MiningEvent::ValidationSubmitted { .. }
            | MiningEvent::ConsensusReached(_)
            | MiningEvent::ConsensusStalled(_) => EventTopic::Consensus,
            MiningEvent::FinalityAdvanced { .. } | MiningEvent::BlockRejected { .. } => {
                EventTopic::Finality
            }
            MiningEvent::RecordAppended { .. } | MiningEvent::RecordChainHalted { .. } => {
                EventTopic::Records
            }
            MiningEvent::NetworkMetrics { .. } => EventTopic::Metrics,
        }
    }

    /// Get the subsystem that emits this event.
    #[must_use]
    pub fn source_subsystem(&self) -> u8 {
        match self {
            MiningEvent::BlockCreated { .. } | MiningEvent::LedgerHalted { .. } => 2,
            MiningEvent::MiningOperationStarted { .. }
            | MiningEvent::MiningProgress { .. }
            | MiningEvent::WorkItemCreated { .. }
            | MiningEvent::MiningOperationFailed { .. }
            | MiningEvent::MiningOperationCancelled { .. } => 3,
            MiningEvent::ValidationSubmitted { layer, .. } => match layer {
                ConsensusLayer::Stake => 4,
                ConsensusLayer::Research => 5,
            },
            MiningEvent::ConsensusReached(result) => match result.layer {
                ConsensusLayer::Stake => 4,
                ConsensusLayer::Research => 5,
            },
            MiningEvent::ConsensusStalled(report) => match report.layer {
                ConsensusLayer::Stake => 4,
                ConsensusLayer::Research => 5,
            },
            MiningEvent::RecordAppended { .. } | MiningEvent::RecordChainHalted { .. } => 6,
            MiningEvent::FinalityAdvanced { .. } | MiningEvent::BlockRejected { .. } => 7,
            MiningEvent::NetworkMetrics { .. } => 0,
        }
    }

    /// Wire name used by dashboard subscribers.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            MiningEvent::MiningOperationStarted { .. } => "mining_started",
            MiningEvent::MiningProgress { .. } => "mining_update",
            MiningEvent::WorkItemCreated { .. } => "new_discovery",
            MiningEvent::MiningOperationFailed { .. } => "mining_failed",
            MiningEvent::MiningOperationCancelled { .. } => "mining_cancelled",
            MiningEvent::BlockCreated { .. } => "new_block",
            MiningEvent::LedgerHalted { .. } => "ledger_halted",
            MiningEvent::ValidationSubmitted { .. } => "validation_submitted",
            MiningEvent::ConsensusReached(_) => "consensus_reached",
            MiningEvent::ConsensusStalled(_) => "consensus_stalled",
            MiningEvent::FinalityAdvanced { .. } => "finality_advanced",
            MiningEvent::BlockRejected { .. } => "block_rejected",
            MiningEvent::RecordAppended { .. } => "record_appended",
            MiningEvent::RecordChainHalted { .. } => "record_chain_halted",
            MiningEvent::NetworkMetrics { .. } => "network_metrics",
        }
    }
}

/// Event topics for filtering subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// All events (no filtering).
    All,
    Mining,
    Ledger,
    Consensus,
    Finality,
    Records,
    Metrics,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Source subsystems to include. Empty means all sources.
    pub source_subsystems: Vec<u8>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            source_subsystems: Vec::new(),
        }
    }

    /// Create a filter for events from specific subsystems.
    #[must_use]
    pub fn from_subsystems(subsystems: Vec<u8>) -> Self {
        Self {
            topics: Vec::new(),
            source_subsystems: subsystems,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &MiningEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let source_match = self.source_subsystems.is_empty()
            || self.source_subsystems.contains(&event.source_subsystem());

        topic_match && source_match
    }
}
