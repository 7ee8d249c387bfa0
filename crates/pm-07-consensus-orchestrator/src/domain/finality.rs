//! Per-block finality tracking.

use serde::{Deserialize, Serialize};
use shared_crypto::merkle_root;
use shared_types::{
    Block, ConsensusResult, FinalDecision, FinalityStage, Hash, WorkItemId,
};

use crate::error::{OrchestratorError, OrchestratorResult};

/// Read-only view of a block's finality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockFinality {
    pub block_hash: Hash,
    pub index: u64,
    pub stage: FinalityStage,
    pub registered_at: u64,
    pub updated_at: u64,
}

/// A rejected block. It stays in storage but leaves the canonical chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedBlock {
    pub block_hash: Hash,
    pub index: u64,
    pub reason: String,
}

/// Finality state of one registered block.
#[derive(Debug, Clone)]
pub struct FinalityTracker {
    pub block_hash: Hash,
    pub index: u64,
    pub work_items: Vec<WorkItemId>,
    pub stage: FinalityStage,
    pub registered_at: u64,
    pub updated_at: u64,
}

impl FinalityTracker {
    #[must_use]
    pub fn register(block: &Block, now: u64) -> Self {
        Self {
            block_hash: block.block_hash,
            index: block.index,
            work_items: block.work_items.iter().map(|w| w.id).collect(),
            stage: FinalityStage::Provisional,
            registered_at: now,
            updated_at: now,
        }
    }

    /// Move one step forward, or to `Rejected` before certification.
    pub fn advance(&mut self, next: FinalityStage, now: u64) -> OrchestratorResult<()> {
        if !self.stage.can_advance_to(&next) {
            return Err(OrchestratorError::InvalidTransition {
                from: self.stage.clone(),
                to: next,
            });
        }
        self.stage = next;
        self.updated_at = now;
        Ok(())
    }

    #[must_use]
    pub fn snapshot(&self) -> BlockFinality {
        BlockFinality {
            block_hash: self.block_hash,
            index: self.index,
            stage: self.stage.clone(),
            registered_at: self.registered_at,
            updated_at: self.updated_at,
        }
    }
}

/// Why a block cannot enter finality at all, if anything.
///
/// The stored hash must recompute and the merkle root must cover the work
/// items. An unmet PoW target is not a fault: exhausted searches seal
/// their best candidate.
#[must_use]
pub fn proof_of_work_fault(block: &Block) -> Option<&'static str> {
    if block.work_items.is_empty() {
        return Some("block carries no work items");
    }
    if block.compute_hash() != block.block_hash {
        return Some("block hash does not recompute");
    }
    if merkle_root(&block.work_item_hashes()) != block.merkle_root {
        return Some("merkle root does not cover the work items");
    }
    None
}

/// Combined stake outcome over a block's work items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StakeVerdict {
    Pending,
    Approved,
    Rejected(WorkItemId),
}

/// Any rejected work item rejects the block; all must be accepted to
/// approve it.
#[must_use]
pub fn combine_stake(results: &[(WorkItemId, ConsensusResult)]) -> StakeVerdict {
    if let Some((id, _)) = results
        .iter()
        .find(|(_, r)| r.decision() == Some(FinalDecision::Rejected))
    {
        return StakeVerdict::Rejected(*id);
    }
    if !results.is_empty()
        && results
            .iter()
            .all(|(_, r)| r.decision() == Some(FinalDecision::Accepted))
    {
        StakeVerdict::Approved
    } else {
        StakeVerdict::Pending
    }
}
