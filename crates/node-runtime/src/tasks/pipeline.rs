//! # Mining Pipeline
//!
//! Carries a completed work item into the chain:
//!
//! ```text
//! WorkItem ──append_work_item──→ Block ──register_block──→ Provisional
//!     │                            │
//!     └── head contention or halt  └── registration failed
//!         → backlog, retried           → retried on next flush
//! ```
//!
//! `append_work_item` already retries head contention internally; what
//! reaches the backlog outlived that budget or hit a halted ledger.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use pm_02_blockchain_ledger::{LedgerApi, LedgerError};
use pm_07_consensus_orchestrator::{OrchestratorApi, OrchestratorError};
use shared_types::{short_hex, Block, FinalityStage, WorkItem};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Work items held while the ledger cannot take them.
pub const MAX_BACKLOG: usize = 1024;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Kept in the backlog; a later flush retries it.
    #[error("Work item deferred: {0}")]
    Deferred(LedgerError),

    /// Dropped: retrying cannot succeed.
    #[error("Work item rejected by the ledger: {0}")]
    Rejected(LedgerError),

    /// The block is in the ledger but finality tracking has not started.
    #[error("Block registration deferred: {0}")]
    Registration(OrchestratorError),
}

/// Outcome of a successful commit.
#[derive(Debug, Clone)]
pub struct Committed {
    pub block: Block,
    pub stage: FinalityStage,
}

pub struct MiningPipeline {
    ledger: Arc<dyn LedgerApi>,
    orchestrator: Arc<dyn OrchestratorApi>,
    backlog: Mutex<VecDeque<WorkItem>>,
    unregistered: Mutex<VecDeque<Block>>,
}

impl MiningPipeline {
    pub fn new(ledger: Arc<dyn LedgerApi>, orchestrator: Arc<dyn OrchestratorApi>) -> Self {
        Self {
            ledger,
            orchestrator,
            backlog: Mutex::new(VecDeque::new()),
            unregistered: Mutex::new(VecDeque::new()),
        }
    }

    /// Append `item` and start tracking its block's finality.
    pub async fn commit(&self, item: WorkItem) -> Result<Committed, PipelineError> {
        match self.append(&item).await {
            Ok(block) => self.track(block).await,
            Err(e @ PipelineError::Deferred(_)) => {
                self.defer(item);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    async fn append(&self, item: &WorkItem) -> Result<Block, PipelineError> {
        match self.ledger.append_work_item(item.clone()).await {
            Ok(block) => Ok(block),
            Err(e) if e.is_recoverable() || e.is_critical() => {
                warn!(work_item = %item.id, error = %e, "[pipeline] Append deferred");
                Err(PipelineError::Deferred(e))
            }
            Err(e @ LedgerError::WorkItemAlreadyIncluded(_)) => {
                debug!(work_item = %item.id, "[pipeline] Work item already on chain");
                Err(PipelineError::Rejected(e))
            }
            Err(e) => {
                error!(work_item = %item.id, error = %e, "[pipeline] Work item rejected");
                Err(PipelineError::Rejected(e))
            }
        }
    }

    async fn track(&self, block: Block) -> Result<Committed, PipelineError> {
        let stage = self.register(block.clone()).await?;
        info!(
            index = block.index,
            block_hash = %short_hex(&block.block_hash),
            stage = %stage,
            "[pipeline] Block committed"
        );
        Ok(Committed { block, stage })
    }

    async fn register(&self, block: Block) -> Result<FinalityStage, PipelineError> {
        match self.orchestrator.register_block(&block).await {
            Ok(stage) => Ok(stage),
            Err(OrchestratorError::AlreadyRegistered(_)) => self
                .orchestrator
                .stage(block.block_hash)
                .await
                .ok_or(PipelineError::Registration(OrchestratorError::UnknownBlock(
                    block.block_hash,
                ))),
            Err(e) => {
                warn!(index = block.index, error = %e, "[pipeline] Registration deferred");
                self.unregistered.lock().push_back(block);
                Err(PipelineError::Registration(e))
            }
        }
    }

    fn defer(&self, item: WorkItem) {
        let mut backlog = self.backlog.lock();
        if backlog.len() >= MAX_BACKLOG {
            if let Some(dropped) = backlog.pop_front() {
                error!(work_item = %dropped.id, "[pipeline] Backlog full, dropping oldest work item");
            }
        }
        backlog.push_back(item);
    }

    /// Retry deferred registrations, then deferred work items, oldest first.
    ///
    /// Returns how many made it through. Stops at the first work item that
    /// is deferred again so a halted ledger is not hammered.
    pub async fn flush(&self) -> usize {
        let mut committed = 0;

        let blocks: Vec<Block> = self.unregistered.lock().drain(..).collect();
        for block in blocks {
            if self.register(block).await.is_ok() {
                committed += 1;
            }
        }

        loop {
            let Some(item) = self.backlog.lock().pop_front() else {
                break;
            };
            match self.append(&item).await {
                Ok(block) => {
                    if self.track(block).await.is_ok() {
                        committed += 1;
                    }
                }
                Err(PipelineError::Deferred(_)) => {
                    self.backlog.lock().push_front(item);
                    break;
                }
                Err(_) => {}
            }
        }
        committed
    }

    pub fn backlog_len(&self) -> usize {
        self.backlog.lock().len()
    }

    pub fn unregistered_len(&self) -> usize {
        self.unregistered.lock().len()
    }
}
