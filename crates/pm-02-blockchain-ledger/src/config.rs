//! Ledger configuration.

use serde::{Deserialize, Serialize};

/// Proof-of-work and append tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Upper bound on nonces tried per block. The search never exceeds it.
    pub max_pow_iterations: u64,
    /// Work item difficulty points per required leading zero bit.
    pub difficulty_divisor: u32,
    /// Ceiling on required leading zero bits.
    pub max_target_bits: u8,
    /// Attempts `append_work_item` makes when the head keeps moving.
    pub max_append_retries: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_pow_iterations: 250_000,
            difficulty_divisor: 64,
            max_target_bits: 20,
            max_append_retries: 5,
        }
    }
}

impl LedgerConfig {
    /// Leading zero bits required for a work item difficulty.
    ///
    /// `min(1 + difficulty / divisor, max_target_bits)`, never below 1.
    #[must_use]
    pub fn target_bits(&self, difficulty: u32) -> u8 {
        let divisor = self.difficulty_divisor.max(1);
        let bits = 1 + difficulty / divisor;
        bits.min(u32::from(self.max_target_bits)).max(1) as u8
    }
}
