//! Bounded proof-of-work search.
//!
//! The search never runs past `max_iterations`. If no nonce reaches the
//! target, the best candidate (most leading zero bits, lowest nonce on ties)
//! is returned instead of an error.

use sha2::Digest;
use shared_types::{leading_zero_bits, Block, Hash};
use tracing::{debug, warn};

/// Result of a PoW search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowOutcome {
    pub nonce: u64,
    pub hash: Hash,
    pub leading_zeros: u32,
    /// Nonces hashed, always `<= max_iterations`.
    pub iterations: u64,
    /// Whether `hash` met the block's `target_bits`.
    pub satisfied: bool,
}

/// Search nonces `0..max_iterations` for a hash with at least
/// `block.target_bits` leading zero bits.
///
/// Only the nonce varies, so the header prefix is hashed once and cloned
/// per attempt.
#[tracing::instrument(skip(block), fields(index = block.index, target = block.target_bits))]
pub fn search(block: &Block, max_iterations: u64) -> PowOutcome {
    let target = u32::from(block.target_bits);
    let prefix = block.pre_nonce_hasher();
    let attempts = max_iterations.max(1);

    let mut best = PowOutcome {
        nonce: 0,
        hash: [0xFF; 32],
        leading_zeros: 0,
        iterations: 0,
        satisfied: false,
    };

    for nonce in 0..attempts {
        let mut hasher = prefix.clone();
        hasher.update(nonce.to_le_bytes());
        let hash: Hash = hasher.finalize().into();
        let zeros = leading_zero_bits(&hash);

        if best.iterations == 0 || zeros > best.leading_zeros {
            best.nonce = nonce;
            best.hash = hash;
            best.leading_zeros = zeros;
        }
        best.iterations = nonce + 1;

        if zeros >= target {
            best.satisfied = true;
            debug!(nonce, iterations = best.iterations, "[pm-02] PoW target met");
            return best;
        }
    }

    warn!(
        index = block.index,
        target,
        best_zeros = best.leading_zeros,
        iterations = best.iterations,
        "[pm-02] PoW iteration cap reached, using best candidate"
    );
    best
}
