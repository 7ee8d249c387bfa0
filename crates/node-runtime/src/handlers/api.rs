//! # Node API
//!
//! The read and write surface a dashboard or RPC layer would sit on. Every
//! call returns a typed result; nothing fails silently.
//!
//! ## Queries
//!
//! chain head, recent blocks, block by index, active operations, validator
//! roster, consensus status, finality, canonical height, rejected blocks,
//! health, metrics, recent operator alerts.
//!
//! ## Commands
//!
//! submit or cancel a mining operation, submit a PoS or PoR decision,
//! verify the block chain, verify a record chain, resume a halted ledger or
//! record chain.

use std::sync::Arc;

use pm_01_ledger_store::StoreError;
use pm_02_blockchain_ledger::{ChainVerification, LedgerError};
use pm_03_mining_coordinator::{CancelOutcome, MiningError, MiningRequest, OperationSnapshot};
use pm_04_stake_consensus::StakeError;
use pm_05_research_consensus::{ResearchError, ResearchSubmission};
use pm_06_immutable_records::{ChainReport, RecordError};
use pm_07_consensus_orchestrator::{BlockFinality, OrchestratorError, RejectedBlock};
use pm_telemetry::TelemetryError;
use serde::{Deserialize, Serialize};
use shared_bus::EventPublisher;
use shared_types::{
    Block, ChainHead, ChainId, ChainState, ConsensusResult, Decision, Hash, OperationId,
    OperatorAlert, TargetRef, Validator, ValidatorId, WorkItemId,
};
use thiserror::Error;
use tracing::{info, instrument};

use crate::container::NodeContainer;
use crate::tasks::{collect_snapshot, HealthCheck, HealthReport, MiningPipeline, NetworkSnapshot};
use crate::wiring::operator_console::AlertLog;

/// Most blocks a single `recent_blocks` call returns.
pub const MAX_RECENT_BLOCKS: usize = 500;

pub type NodeResult<T> = Result<T, NodeError>;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Work item {0} not found")]
    WorkItemNotFound(WorkItemId),

    #[error("Block {} not found", hex::encode(.0))]
    BlockNotFound(Hash),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Mining(#[from] MiningError),

    #[error(transparent)]
    Stake(#[from] StakeError),

    #[error(transparent)]
    Research(#[from] ResearchError),

    #[error(transparent)]
    Records(#[from] RecordError),

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}

/// Stake holders and researchers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorRoster {
    pub stake_holders: Vec<Validator>,
    pub researchers: Vec<Validator>,
}

/// One-call overview of the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStatus {
    pub head: Option<ChainHead>,
    /// Head timestamp, RFC 3339.
    pub head_time: Option<String>,
    pub canonical_height: u64,
    pub pending_blocks: usize,
    pub rejected_blocks: usize,
    pub ledger_state: ChainState,
    pub network: NetworkSnapshot,
    pub events_published: u64,
    pub backlog: usize,
}

/// Query and command surface over the node container.
#[derive(Clone)]
pub struct NodeApi {
    container: Arc<NodeContainer>,
    pipeline: Arc<MiningPipeline>,
    alerts: Arc<AlertLog>,
}

impl NodeApi {
    pub fn new(
        container: Arc<NodeContainer>,
        pipeline: Arc<MiningPipeline>,
        alerts: Arc<AlertLog>,
    ) -> Self {
        Self {
            container,
            pipeline,
            alerts,
        }
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub async fn chain_head(&self) -> NodeResult<Option<ChainHead>> {
        Ok(self.container.ledger.head().await?)
    }

    /// Newest first, capped at [`MAX_RECENT_BLOCKS`].
    pub async fn recent_blocks(&self, limit: usize) -> NodeResult<Vec<Block>> {
        Ok(self
            .container
            .ledger
            .recent_blocks(limit.min(MAX_RECENT_BLOCKS))
            .await?)
    }

    pub async fn block(&self, index: u64) -> NodeResult<Option<Block>> {
        Ok(self.container.ledger.block(index).await?)
    }

    pub async fn active_operations(&self) -> Vec<OperationSnapshot> {
        self.container.mining.active_operations().await
    }

    pub async fn operation(&self, id: OperationId) -> Option<OperationSnapshot> {
        self.container.mining.operation(id).await
    }

    pub async fn validators(&self) -> NodeResult<ValidatorRoster> {
        Ok(ValidatorRoster {
            stake_holders: self.container.stake.validators().await?,
            researchers: self.container.research.researchers().await?,
        })
    }

    /// PoS status for a work item, PoR status for a block.
    pub async fn consensus_status(&self, target: TargetRef) -> NodeResult<ConsensusResult> {
        match target {
            TargetRef::WorkItem(id) => Ok(self.container.stake.aggregate(id).await?),
            TargetRef::Block(hash) => Ok(self.container.research.status(hash).await?),
        }
    }

    pub async fn finality(&self, block_hash: Hash) -> Option<BlockFinality> {
        self.container.orchestrator.finality(block_hash).await
    }

    pub async fn canonical_height(&self) -> u64 {
        self.container.orchestrator.canonical_height().await
    }

    pub async fn rejected_blocks(&self) -> Vec<RejectedBlock> {
        self.container.orchestrator.rejected_blocks().await
    }

    pub async fn network_snapshot(&self) -> NodeResult<NetworkSnapshot> {
        Ok(collect_snapshot(
            self.container.mining.as_ref(),
            self.container.ledger.as_ref(),
            self.container.now(),
        )
        .await?)
    }

    pub async fn health(&self) -> NodeResult<HealthReport> {
        let runtime = &self.container.config.runtime;
        let check = HealthCheck::new(
            Arc::clone(&self.container.mining),
            Arc::clone(&self.container.ledger),
            Arc::clone(&self.container.clock),
            runtime.health_min_active_operations,
            runtime.health_block_window_ms,
        );
        Ok(check.check().await?)
    }

    pub async fn status(&self) -> NodeResult<NodeStatus> {
        let orchestrator = &self.container.orchestrator;
        let head = self.container.ledger.head().await?;
        let head_time = head
            .as_ref()
            .and_then(|h| chrono::DateTime::from_timestamp_millis(h.timestamp as i64))
            .map(|t| t.to_rfc3339());
        Ok(NodeStatus {
            head,
            head_time,
            canonical_height: orchestrator.canonical_height().await,
            pending_blocks: orchestrator.pending_blocks().await.len(),
            rejected_blocks: orchestrator.rejected_blocks().await.len(),
            ledger_state: self.container.ledger.state().await,
            network: self.network_snapshot().await?,
            events_published: self.container.event_bus.events_published(),
            backlog: self.pipeline.backlog_len(),
        })
    }

    /// Prometheus text exposition.
    pub fn metrics(&self) -> NodeResult<String> {
        Ok(pm_telemetry::gather_metrics()?)
    }

    pub fn recent_alerts(&self) -> Vec<OperatorAlert> {
        self.alerts.recent()
    }

    // =========================================================================
    // COMMANDS
    // =========================================================================

    pub async fn submit_mining_operation(
        &self,
        request: MiningRequest,
    ) -> NodeResult<OperationSnapshot> {
        Ok(self.container.mining.start_operation(request).await?)
    }

    pub async fn cancel_operation(&self, id: OperationId) -> NodeResult<CancelOutcome> {
        Ok(self.container.mining.cancel(id).await?)
    }

    /// `validator_id`'s PoS decision on a stored work item.
    pub async fn submit_stake_validation(
        &self,
        work_item_id: WorkItemId,
        validator_id: &ValidatorId,
    ) -> NodeResult<Decision> {
        let item = self
            .container
            .store
            .work_item(&work_item_id)?
            .ok_or(NodeError::WorkItemNotFound(work_item_id))?;
        Ok(self
            .container
            .stake
            .submit_validation(&item, validator_id)
            .await?)
    }

    /// `validator_id`'s PoR review of a stored block.
    pub async fn submit_research_validation(
        &self,
        block_hash: Hash,
        validator_id: &ValidatorId,
    ) -> NodeResult<ResearchSubmission> {
        let block = self
            .container
            .store
            .block_by_hash(&block_hash)?
            .ok_or(NodeError::BlockNotFound(block_hash))?;
        Ok(self
            .container
            .research
            .submit_validation(&block, validator_id)
            .await?)
    }

    /// Full block-chain verification. A fault halts the ledger.
    #[instrument(skip(self))]
    pub async fn verify_chain(&self) -> NodeResult<ChainVerification> {
        let report = self.container.ledger.verify_stored_chain().await?;
        info!(
            blocks_checked = report.blocks_checked,
            valid = report.is_valid(),
            "Chain verification requested"
        );
        Ok(report)
    }

    /// Walk a record chain from genesis, to `up_to` or its tail.
    #[instrument(skip(self))]
    pub async fn verify_record_chain(
        &self,
        chain_id: &ChainId,
        up_to: Option<u64>,
    ) -> NodeResult<ChainReport> {
        Ok(self.container.records.verify_chain(chain_id, up_to).await?)
    }

    pub async fn record_chains(&self) -> NodeResult<Vec<ChainId>> {
        Ok(self.container.records.chain_ids().await?)
    }

    pub async fn resume_ledger(&self) -> NodeResult<()> {
        self.container.ledger.resume().await?;
        info!("Ledger resumed by operator");
        Ok(())
    }

    pub async fn resume_record_chain(&self, chain_id: &ChainId) -> NodeResult<()> {
        self.container.records.resume_chain(chain_id).await?;
        info!(chain_id = %chain_id, "Record chain resumed by operator");
        Ok(())
    }
}
