//! Driving Port (API - Inbound)

use async_trait::async_trait;
use shared_types::{Block, FinalityStage, Hash, StallReport};

use crate::domain::{BlockFinality, RejectedBlock};
use crate::error::OrchestratorResult;

#[async_trait]
pub trait OrchestratorApi: Send + Sync {
    /// Start tracking a block the ledger accepted.
    ///
    /// A block whose hash or merkle root does not recompute is rejected
    /// immediately.
    async fn register_block(&self, block: &Block) -> OrchestratorResult<FinalityStage>;

    /// Advance a block as far as the current consensus state allows.
    async fn process(&self, block_hash: Hash) -> OrchestratorResult<FinalityStage>;

    /// Run `process` over non-terminal blocks, lowest index first.
    async fn process_pending(&self) -> Vec<(Hash, OrchestratorResult<FinalityStage>)>;

    async fn stage(&self, block_hash: Hash) -> Option<FinalityStage>;

    async fn finality(&self, block_hash: Hash) -> Option<BlockFinality>;

    /// Non-terminal blocks, lowest index first.
    async fn pending_blocks(&self) -> Vec<BlockFinality>;

    /// Registered blocks that are not rejected.
    async fn canonical_height(&self) -> u64;

    async fn rejected_blocks(&self) -> Vec<RejectedBlock>;

    /// Mark consensus rounds past their window as stalled and raise an
    /// operator alert for each.
    async fn sweep_stalled(&self, now: u64) -> OrchestratorResult<Vec<StallReport>>;
}
