//! Full-chain verification.
//!
//! Per block, in order: index continuity, hash link, recomputed hash,
//! merkle root. Verification stops at the first fault, so nothing before the
//! reported index is ever flagged.

use serde::{Deserialize, Serialize};
use shared_crypto::merkle_root;
use shared_types::{Block, GENESIS_HASH};
use std::fmt;

/// What was wrong with the first faulty block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultKind {
    /// `index` does not follow its predecessor.
    IndexGap,
    /// `previous_hash` does not equal the predecessor's `block_hash`.
    BrokenLink,
    /// Stored `block_hash` differs from the recomputed header hash.
    HashMismatch,
    /// Stored `merkle_root` differs from the root over the work items.
    MerkleMismatch,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FaultKind::IndexGap => "index gap",
            FaultKind::BrokenLink => "broken hash link",
            FaultKind::HashMismatch => "block hash mismatch",
            FaultKind::MerkleMismatch => "merkle root mismatch",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainFault {
    pub index: u64,
    pub kind: FaultKind,
}

impl fmt::Display for ChainFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at block {}", self.kind, self.index)
    }
}

/// Outcome of `verify_chain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainVerification {
    /// Blocks fully checked before stopping.
    pub blocks_checked: u64,
    pub fault: Option<ChainFault>,
}

impl ChainVerification {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.fault.is_none()
    }

    #[must_use]
    pub fn first_invalid_index(&self) -> Option<u64> {
        self.fault.map(|f| f.index)
    }
}

/// Check a single block against its predecessor.
///
/// `previous` is `None` only for the first block of the slice; that block
/// must then be genesis.
pub fn check_block(block: &Block, previous: Option<&Block>) -> Result<(), FaultKind> {
    let (expected_index, expected_link) = match previous {
        Some(prev) => (prev.index + 1, prev.block_hash),
        None => (0, GENESIS_HASH),
    };
    if block.index != expected_index {
        return Err(FaultKind::IndexGap);
    }
    if block.previous_hash != expected_link {
        return Err(FaultKind::BrokenLink);
    }
    if block.compute_hash() != block.block_hash {
        return Err(FaultKind::HashMismatch);
    }
    if merkle_root(&block.work_item_hashes()) != block.merkle_root {
        return Err(FaultKind::MerkleMismatch);
    }
    Ok(())
}

/// Verify a chain slice starting at genesis.
#[tracing::instrument(skip(blocks), fields(len = blocks.len()))]
pub fn verify_chain(blocks: &[Block]) -> ChainVerification {
    let mut previous: Option<&Block> = None;
    for (checked, block) in blocks.iter().enumerate() {
        if let Err(kind) = check_block(block, previous) {
            return ChainVerification {
                blocks_checked: checked as u64,
                fault: Some(ChainFault {
                    index: block.index,
                    kind,
                }),
            };
        }
        previous = Some(block);
    }
    ChainVerification {
        blocks_checked: blocks.len() as u64,
        fault: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use shared_types::MinerId;

    fn create_test_chain(len: u64) -> Vec<Block> {
        let mut chain: Vec<Block> = Vec::new();
        for index in 0..len {
            let previous_hash = chain.last().map_or(GENESIS_HASH, |b| b.block_hash);
            let mut block = Block {
                index,
                timestamp: 1_000 + index,
                previous_hash,
                merkle_root: merkle_root(&[]),
                difficulty: 1,
                target_bits: 1,
                nonce: index,
                block_hash: [0u8; 32],
                miner_id: MinerId::new("m"),
                total_value: index as f64,
                energy_consumed: 0.0,
                knowledge_created: 0.0,
                work_items: Vec::new(),
            };
            block.block_hash = block.compute_hash();
            chain.push(block);
        }
        chain
    }

    #[test]
    fn test_valid_chain() {
        let chain = create_test_chain(5);
        let result = verify_chain(&chain);
        assert!(result.is_valid());
        assert_eq!(result.blocks_checked, 5);
    }

    #[test]
    fn test_empty_chain_is_valid() {
        assert!(verify_chain(&[]).is_valid());
    }

    #[test]
    fn test_mid_chain_payload_mutation_reports_first_index_only() {
        let mut chain = create_test_chain(6);
        chain[3].total_value = 999.0;

        let result = verify_chain(&chain);
        assert_eq!(result.first_invalid_index(), Some(3));
        assert_eq!(result.fault.map(|f| f.kind), Some(FaultKind::HashMismatch));
        assert_eq!(result.blocks_checked, 3);
    }

    #[test]
    fn test_rehashed_tamper_breaks_successor_link() {
        let mut chain = create_test_chain(4);
        chain[1].total_value = 5.0;
        chain[1].block_hash = chain[1].compute_hash();

        let result = verify_chain(&chain);
        assert_eq!(result.first_invalid_index(), Some(2));
        assert_eq!(result.fault.map(|f| f.kind), Some(FaultKind::BrokenLink));
    }

    #[test]
    fn test_merkle_mismatch_detected() {
        let mut chain = create_test_chain(3);
        chain[2].merkle_root = [9u8; 32];
        chain[2].block_hash = chain[2].compute_hash();

        let result = verify_chain(&chain);
        assert_eq!(result.fault.map(|f| f.kind), Some(FaultKind::MerkleMismatch));
    }

    #[test]
    fn test_index_gap_detected() {
        let mut chain = create_test_chain(4);
        chain.remove(2);
        assert_eq!(verify_chain(&chain).fault.map(|f| f.kind), Some(FaultKind::IndexGap));
    }

    proptest! {
        #[test]
        fn test_first_fault_is_the_tampered_block(len in 2u64..12, pick in 0u64..12, delta in 1.0f64..1e6) {
            let tampered = pick % len;
            let mut chain = create_test_chain(len);
            chain[tampered as usize].total_value += delta;

            let result = verify_chain(&chain);
            prop_assert_eq!(result.first_invalid_index(), Some(tampered));
            prop_assert_eq!(result.blocks_checked, tampered);
        }
    }

    #[test]
    fn test_non_genesis_start_rejected() {
        let chain = create_test_chain(3);
        let result = verify_chain(&chain[1..]);
        assert_eq!(result.first_invalid_index(), Some(1));
    }
}
