//! Driving Port (API - Inbound)

use async_trait::async_trait;
use shared_types::{Block, ChainHead, ChainState, MinerId, WorkItem};

use crate::domain::ChainVerification;
use crate::error::LedgerResult;

/// Primary ledger API.
#[async_trait]
pub trait LedgerApi: Send + Sync {
    /// Build, seal and append a block for `work_item` on top of `prior`.
    ///
    /// `prior` must be the current head (`None` for genesis). A stale prior,
    /// or losing the head CAS to another writer, is `ChainContinuity`.
    async fn create_block(
        &self,
        work_item: WorkItem,
        miner_id: MinerId,
        prior: Option<Block>,
    ) -> LedgerResult<Block>;

    /// `create_block` against the latest head, re-reading it after each
    /// continuity failure up to the configured retry budget.
    async fn append_work_item(&self, work_item: WorkItem) -> LedgerResult<Block>;

    async fn head(&self) -> LedgerResult<Option<ChainHead>>;

    /// Newest first.
    async fn recent_blocks(&self, limit: usize) -> LedgerResult<Vec<Block>>;

    async fn block(&self, index: u64) -> LedgerResult<Option<Block>>;

    /// Verify every stored block from genesis. A fault halts the ledger.
    async fn verify_stored_chain(&self) -> LedgerResult<ChainVerification>;

    async fn state(&self) -> ChainState;

    /// Operator intervention: clear a halt.
    async fn resume(&self) -> LedgerResult<()>;
}
