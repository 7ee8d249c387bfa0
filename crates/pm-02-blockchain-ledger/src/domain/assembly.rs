//! Block assembly.

use shared_crypto::merkle_root;
use shared_types::{Block, MinerId, WorkItem, GENESIS_HASH};

use super::pow::{self, PowOutcome};
use crate::config::LedgerConfig;

/// Header fields fixed before the nonce search.
#[derive(Debug, Clone)]
pub struct BlockTemplate {
    pub index: u64,
    pub previous_hash: [u8; 32],
    pub timestamp: u64,
    pub miner_id: MinerId,
    pub work_items: Vec<WorkItem>,
}

impl BlockTemplate {
    /// Template extending `prior`, or a genesis template when `prior` is `None`.
    #[must_use]
    pub fn extending(
        prior: Option<&Block>,
        miner_id: MinerId,
        work_items: Vec<WorkItem>,
        timestamp: u64,
    ) -> Self {
        let (index, previous_hash) = match prior {
            Some(block) => (block.index + 1, block.block_hash),
            None => (0, GENESIS_HASH),
        };
        Self {
            index,
            previous_hash,
            timestamp,
            miner_id,
            work_items,
        }
    }
}

/// Fill in aggregates and merkle root, then run the bounded PoW search.
///
/// Block difficulty is the highest work item difficulty.
#[must_use]
pub fn assemble_block(template: BlockTemplate, config: &LedgerConfig) -> (Block, PowOutcome) {
    let difficulty = template
        .work_items
        .iter()
        .map(|w| w.difficulty)
        .max()
        .unwrap_or(1);
    let hashes: Vec<_> = template.work_items.iter().map(WorkItem::content_hash).collect();

    let mut block = Block {
        index: template.index,
        timestamp: template.timestamp,
        previous_hash: template.previous_hash,
        merkle_root: merkle_root(&hashes),
        difficulty,
        target_bits: config.target_bits(difficulty),
        nonce: 0,
        block_hash: [0u8; 32],
        miner_id: template.miner_id,
        total_value: template.work_items.iter().map(|w| w.value).sum(),
        energy_consumed: template.work_items.iter().map(|w| w.energy_consumed).sum(),
        knowledge_created: template.work_items.iter().map(|w| w.knowledge_created).sum(),
        work_items: template.work_items,
    };

    let outcome = pow::search(&block, config.max_pow_iterations);
    block.nonce = outcome.nonce;
    block.block_hash = outcome.hash;
    (block, outcome)
}
