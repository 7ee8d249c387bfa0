//! # Subsystem Container
//!
//! Construction order follows the dependency graph:
//!
//! ```text
//! Level 0: LedgerStore, event bus, operator channel, clock, node key
//! Level 1: BlockchainLedger, MiningCoordinator, ImmutableRecordChain
//! Level 2: StakeConsensus, ResearchConsensus
//! Level 3: ConsensusOrchestrator
//! ```
//!
//! Services are held behind their inbound API traits so the runtime's
//! tasks and `NodeApi` see exactly the surface other callers see.

use std::sync::Arc;

use pm_01_ledger_store::{InMemoryLedgerStore, LedgerStore};
use pm_02_blockchain_ledger::{BlockchainLedger, LedgerApi};
use pm_03_mining_coordinator::{
    DeterministicSynthesizer, MiningApi, MiningCoordinator, WeightedValueScorer,
};
use pm_04_stake_consensus::{
    DeterministicStakePolicy, LedgerStakeRepository, StakeConsensus, StakeConsensusApi,
};
use pm_05_research_consensus::{
    DeterministicQualityScorer, LedgerResearchRepository, QualityScorer, ResearchConsensus,
    ResearchConsensusApi, ScoreDistanceReviewer,
};
use pm_06_immutable_records::{ImmutableRecordChain, RecordChainApi};
use pm_07_consensus_orchestrator::{ConsensusOrchestrator, OrchestratorApi};
use shared_bus::{operator_channel, InMemoryEventBus, OperatorSender};
use shared_crypto::Ed25519KeyPair;
use shared_types::{OperatorAlert, SystemTimeSource, TimeSource};
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

use crate::container::config::NodeConfig;

/// Central container holding all subsystem instances.
pub struct NodeContainer {
    pub config: NodeConfig,

    // =========================================================================
    // LEVEL 0: Shared infrastructure
    // =========================================================================
    pub store: Arc<dyn LedgerStore>,
    pub event_bus: Arc<InMemoryEventBus>,
    pub operator: Arc<OperatorSender>,
    pub clock: Arc<dyn TimeSource>,
    pub signer: Arc<Ed25519KeyPair>,

    // =========================================================================
    // LEVEL 1
    // =========================================================================
    pub ledger: Arc<dyn LedgerApi>,
    pub mining: Arc<dyn MiningApi>,
    pub records: Arc<dyn RecordChainApi>,

    // =========================================================================
    // LEVEL 2
    // =========================================================================
    pub stake: Arc<dyn StakeConsensusApi>,
    pub research: Arc<dyn ResearchConsensusApi>,

    // =========================================================================
    // LEVEL 3
    // =========================================================================
    pub orchestrator: Arc<dyn OrchestratorApi>,
}

impl NodeContainer {
    /// In-memory store, wall clock.
    ///
    /// Returns the receiving end of the operator channel; alerts queue there
    /// until someone drains it.
    pub fn new(config: NodeConfig) -> (Self, mpsc::UnboundedReceiver<OperatorAlert>) {
        Self::with_parts(
            config,
            Arc::new(InMemoryLedgerStore::new()),
            Arc::new(SystemTimeSource),
        )
    }

    /// Build on a caller-supplied store and clock.
    #[instrument(skip_all, name = "container_init")]
    pub fn with_parts(
        config: NodeConfig,
        store: Arc<dyn LedgerStore>,
        clock: Arc<dyn TimeSource>,
    ) -> (Self, mpsc::UnboundedReceiver<OperatorAlert>) {
        info!("Initializing subsystem container");

        // Level 0
        let event_bus = Arc::new(InMemoryEventBus::new());
        let (sender, alerts) = operator_channel();
        let operator = Arc::new(sender);
        let signer = Arc::new(node_key(&config));
        info!(
            public_key = %hex::encode(signer.public_key().as_bytes()),
            "Node signing key ready"
        );

        // Level 1
        info!("  [pm-02] Initializing Blockchain Ledger...");
        let ledger: Arc<dyn LedgerApi> = Arc::new(BlockchainLedger::new(
            Arc::clone(&store),
            event_bus.clone(),
            operator.clone(),
            Arc::clone(&clock),
            config.ledger.clone(),
        ));

        info!("  [pm-03] Initializing Mining Coordinator...");
        let mining: Arc<dyn MiningApi> = Arc::new(MiningCoordinator::new(
            Arc::new(DeterministicSynthesizer),
            Arc::new(WeightedValueScorer::default()),
            Arc::clone(&signer),
            event_bus.clone(),
            Arc::clone(&clock),
            config.mining.clone(),
        ));

        info!("  [pm-06] Initializing Immutable Record Chain...");
        let records: Arc<dyn RecordChainApi> = Arc::new(ImmutableRecordChain::new(
            Arc::clone(&store),
            event_bus.clone(),
            operator.clone(),
            Arc::clone(&signer),
            Arc::clone(&clock),
            config.records.clone(),
        ));

        // Level 2
        info!("  [pm-04] Initializing Stake Consensus...");
        let stake: Arc<dyn StakeConsensusApi> = Arc::new(StakeConsensus::new(
            Arc::new(LedgerStakeRepository::new(Arc::clone(&store))),
            Arc::new(DeterministicStakePolicy),
            event_bus.clone(),
            Arc::clone(&clock),
            config.stake.clone(),
        ));

        info!("  [pm-05] Initializing Research Consensus...");
        let scorer: Arc<dyn QualityScorer> = Arc::new(DeterministicQualityScorer);
        let research: Arc<dyn ResearchConsensusApi> = Arc::new(ResearchConsensus::new(
            Arc::new(LedgerResearchRepository::new(Arc::clone(&store))),
            Arc::clone(&scorer),
            Arc::new(ScoreDistanceReviewer::new(
                scorer,
                config.research.agreement_tolerance,
            )),
            event_bus.clone(),
            Arc::clone(&clock),
            config.research.clone(),
        ));

        // Level 3
        info!("  [pm-07] Initializing Consensus Orchestrator...");
        let orchestrator: Arc<dyn OrchestratorApi> = Arc::new(ConsensusOrchestrator::new(
            Arc::clone(&stake),
            Arc::clone(&research),
            Arc::clone(&records),
            event_bus.clone(),
            operator.clone(),
            Arc::clone(&clock),
            config.orchestrator.clone(),
        ));

        info!("Subsystem container initialized");

        let container = Self {
            config,
            store,
            event_bus,
            operator,
            clock,
            signer,
            ledger,
            mining,
            records,
            stake,
            research,
            orchestrator,
        };
        (container, alerts)
    }

    pub fn now(&self) -> u64 {
        self.clock.now_millis()
    }
}

fn node_key(config: &NodeConfig) -> Ed25519KeyPair {
    match &config.node.node_key_seed {
        Some(seed) => Ed25519KeyPair::from_passphrase(seed.as_bytes()),
        None => {
            warn!("PM_NODE_KEY_SEED not set, generating an ephemeral node key");
            Ed25519KeyPair::generate()
        }
    }
}
