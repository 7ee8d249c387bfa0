//! # Merkle Tree
//!
//! Binary hash tree where each non-leaf node is `SHA-256(left || right)`.
//!
//! - Leaves are padded to the next power of two (minimum 2) with the
//!   all-zero sentinel.
//! - The same leaves in the same order always produce the same root.
//! - An empty leaf set has the sentinel as its root.

use crate::hashing::{sha256_many, Hash};

/// Padding value for empty leaf slots.
pub const SENTINEL_HASH: Hash = [0u8; 32];

/// A fully materialized merkle tree.
///
/// Nodes are stored in a flat array: the root at index 0, children of node
/// `i` at `2i + 1` and `2i + 2`, leaves in the last `padded_leaf_count` slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    nodes: Vec<Hash>,
    leaf_count: usize,
    padded_leaf_count: usize,
}

impl MerkleTree {
    /// Build a tree from leaf hashes.
    pub fn build(leaves: Vec<Hash>) -> Self {
        let leaf_count = leaves.len();
        if leaf_count == 0 {
            return Self {
                nodes: vec![SENTINEL_HASH],
                leaf_count: 0,
                padded_leaf_count: 0,
            };
        }

        let padded_leaf_count = if leaf_count == 1 {
            2
        } else {
            leaf_count.next_power_of_two()
        };
        let mut padded = leaves;
        padded.resize(padded_leaf_count, SENTINEL_HASH);

        let total_nodes = 2 * padded_leaf_count - 1;
        let mut nodes = vec![SENTINEL_HASH; total_nodes];
        let leaf_start = padded_leaf_count - 1;
        nodes[leaf_start..].copy_from_slice(&padded);

        for i in (0..leaf_start).rev() {
            nodes[i] = hash_pair(&nodes[2 * i + 1], &nodes[2 * i + 2]);
        }

        Self {
            nodes,
            leaf_count,
            padded_leaf_count,
        }
    }

    pub fn root(&self) -> Hash {
        self.nodes[0]
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Sibling path from leaf `index` up to (excluding) the root.
    pub fn proof(&self, index: usize) -> Option<Vec<Hash>> {
        if index >= self.leaf_count {
            return None;
        }
        let mut path = Vec::new();
        let mut node = self.padded_leaf_count - 1 + index;
        while node > 0 {
            let sibling = if node % 2 == 1 { node + 1 } else { node - 1 };
            path.push(self.nodes[sibling]);
            node = (node - 1) / 2;
        }
        Some(path)
    }
}

/// Merkle root over the given leaves.
pub fn merkle_root(leaves: &[Hash]) -> Hash {
    MerkleTree::build(leaves.to_vec()).root()
}

/// Check an inclusion proof produced by [`MerkleTree::proof`].
pub fn verify_proof(leaf: Hash, index: usize, path: &[Hash], root: Hash) -> bool {
    let mut current = leaf;
    let mut position = index;
    for sibling in path {
        current = if position % 2 == 0 {
            hash_pair(&current, sibling)
        } else {
            hash_pair(sibling, &current)
        };
        position /= 2;
    }
    current == root
}

fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    sha256_many(&[left, right])
}
