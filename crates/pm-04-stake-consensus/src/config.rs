//! Stake consensus configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakeConfig {
    /// Approving stake over validated stake needed for approval.
    pub approval_threshold: f64,
    /// Validations needed before any decision.
    pub min_validators: usize,
    /// Stake needed to participate.
    pub min_stake: u64,
    /// Reputation moved per validator once the disposition is known.
    pub reputation_delta: f64,
    /// Collection window before a round is reported as stalled.
    pub collection_window_ms: u64,
}

impl Default for StakeConfig {
    fn default() -> Self {
        Self {
            approval_threshold: 0.6,
            min_validators: 3,
            min_stake: 10,
            reputation_delta: 5.0,
            collection_window_ms: 120_000,
        }
    }
}
