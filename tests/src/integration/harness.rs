//! Shared wiring for the integration flows.

use std::sync::Arc;

use pm_01_ledger_store::InMemoryLedgerStore;
use pm_02_blockchain_ledger::{BlockchainLedger, LedgerApi, LedgerConfig};
use pm_03_mining_coordinator::{
    CompletionOutcome, DeterministicSynthesizer, MiningApi, MiningConfig, MiningCoordinator,
    MiningRequest, WeightedValueScorer,
};
use pm_04_stake_consensus::{
    LedgerStakeRepository, Malformed, StakeConfig, StakeConsensus, StakeConsensusApi,
    StakeDecisionPolicy,
};
use pm_05_research_consensus::{
    LedgerResearchRepository, PeerReviewer, QualityScorer, ResearchConfig, ResearchConsensus,
    ResearchConsensusApi, ReviewVerdict,
};
use pm_06_immutable_records::{ImmutableRecordChain, RecordConfig};
use pm_07_consensus_orchestrator::{ConsensusOrchestrator, OrchestratorApi, OrchestratorConfig};
use shared_bus::{operator_channel, InMemoryEventBus};
use shared_crypto::Ed25519KeyPair;
use shared_types::{
    Block, Decision, ManualTimeSource, MinerId, OperatorAlert, Validator, ValidatorId, WorkItem,
    WorkType,
};
use tokio::sync::mpsc::UnboundedReceiver;

pub const START_MILLIS: u64 = 1_700_000_000_000;

/// Validators named `no-*` reject, everyone else approves.
pub struct ByNamePolicy;

impl StakeDecisionPolicy for ByNamePolicy {
    fn decide(&self, _item: &WorkItem, validator: &Validator) -> Result<Decision, Malformed> {
        if validator.id.as_str().starts_with("no-") {
            Ok(Decision::Rejected)
        } else {
            Ok(Decision::Approved)
        }
    }
}

/// Score encoded in the researcher id, e.g. `r82`.
pub struct IdScorer;

impl QualityScorer for IdScorer {
    fn score(&self, _block: &Block, researcher: &Validator) -> f64 {
        researcher
            .id
            .as_str()
            .trim_start_matches('r')
            .parse()
            .unwrap_or(0.0)
    }
}

pub struct AgreeingReviewer;

impl PeerReviewer for AgreeingReviewer {
    fn review(&self, _block: &Block, submitter_score: f64, _reviewer: &Validator) -> ReviewVerdict {
        ReviewVerdict {
            agreed: true,
            reviewer_score: submitter_score,
        }
    }
}

pub struct Harness {
    pub store: Arc<InMemoryLedgerStore>,
    pub bus: Arc<InMemoryEventBus>,
    pub clock: Arc<ManualTimeSource>,
    pub signer: Arc<Ed25519KeyPair>,
    pub alerts: UnboundedReceiver<OperatorAlert>,
    pub ledger: Arc<BlockchainLedger>,
    pub mining: Arc<MiningCoordinator>,
    pub stake: Arc<StakeConsensus>,
    pub research: Arc<ResearchConsensus>,
    pub records: Arc<ImmutableRecordChain>,
    pub orchestrator: Arc<ConsensusOrchestrator>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_ledger_config(LedgerConfig::default())
    }

    pub fn with_ledger_config(ledger_config: LedgerConfig) -> Self {
        let store = Arc::new(InMemoryLedgerStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let clock = Arc::new(ManualTimeSource::new(START_MILLIS));
        let signer = Arc::new(Ed25519KeyPair::from_passphrase(b"integration-node"));
        let (operator, alerts) = operator_channel();
        let operator = Arc::new(operator);

        let ledger = Arc::new(BlockchainLedger::new(
            store.clone(),
            bus.clone(),
            operator.clone(),
            clock.clone(),
            ledger_config,
        ));
        let mining = Arc::new(MiningCoordinator::new(
            Arc::new(DeterministicSynthesizer),
            Arc::new(WeightedValueScorer::default()),
            signer.clone(),
            bus.clone(),
            clock.clone(),
            MiningConfig::default(),
        ));
        let stake = Arc::new(StakeConsensus::new(
            Arc::new(LedgerStakeRepository::new(store.clone())),
            Arc::new(ByNamePolicy),
            bus.clone(),
            clock.clone(),
            StakeConfig::default(),
        ));
        let research = Arc::new(ResearchConsensus::new(
            Arc::new(LedgerResearchRepository::new(store.clone())),
            Arc::new(IdScorer),
            Arc::new(AgreeingReviewer),
            bus.clone(),
            clock.clone(),
            ResearchConfig::default(),
        ));
        let records = Arc::new(ImmutableRecordChain::new(
            store.clone(),
            bus.clone(),
            operator.clone(),
            signer.clone(),
            clock.clone(),
            RecordConfig::default(),
        ));
        let orchestrator = Arc::new(ConsensusOrchestrator::new(
            stake.clone(),
            research.clone(),
            records.clone(),
            bus.clone(),
            operator,
            clock.clone(),
            OrchestratorConfig::default(),
        ));

        Self {
            store,
            bus,
            clock,
            signer,
            alerts,
            ledger,
            mining,
            stake,
            research,
            records,
            orchestrator,
        }
    }

    /// Start an operation and force it to completion.
    pub async fn mine(&self, work_type: WorkType, difficulty: u32) -> WorkItem {
        let op = self
            .mining
            .start_operation(MiningRequest {
                work_type,
                difficulty,
                miner_id: MinerId::new("integration-miner"),
            })
            .await
            .unwrap();
        match self.mining.complete(op.id).await.unwrap() {
            CompletionOutcome::Emitted(item) => item,
            other => panic!("expected a fresh work item, got {other:?}"),
        }
    }

    /// Mine, append to the ledger and register for finality.
    pub async fn mine_block(&self) -> Block {
        let item = self.mine(WorkType::PrimePattern, 60).await;
        self.clock.advance(1_000);
        let block = self.ledger.append_work_item(item).await.unwrap();
        self.orchestrator.register_block(&block).await.unwrap();
        block
    }

    pub async fn register_stake(&self, holders: &[(&str, u64)]) {
        for (id, stake) in holders {
            self.stake
                .register_validator(ValidatorId::new(*id), *stake)
                .await
                .unwrap();
        }
    }

    pub async fn register_researchers(&self, ids: &[&str]) {
        for id in ids {
            self.research
                .register_researcher(ValidatorId::new(*id))
                .await
                .unwrap();
        }
    }

    /// Every named validator votes on every work item in `block`.
    pub async fn stake_votes(&self, block: &Block, ids: &[&str]) {
        for item in &block.work_items {
            for id in ids {
                self.stake
                    .submit_validation(item, &ValidatorId::new(*id))
                    .await
                    .unwrap();
            }
        }
    }

    pub async fn research_votes(&self, block: &Block, ids: &[&str]) {
        for id in ids {
            self.research
                .submit_validation(block, &ValidatorId::new(*id))
                .await
                .unwrap();
        }
    }

    /// Alerts queued on the operator channel so far.
    pub fn drain_alerts(&mut self) -> Vec<OperatorAlert> {
        let mut alerts = Vec::new();
        while let Ok(alert) = self.alerts.try_recv() {
            alerts.push(alert);
        }
        alerts
    }
}
