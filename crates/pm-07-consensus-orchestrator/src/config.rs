//! Orchestrator configuration.

use pm_06_immutable_records::{BLOCK_FINALITY_CHAIN, VALIDATOR_REPUTATION_CHAIN};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Audit chain for certification and rejection events.
    pub finality_chain: String,
    /// Audit chain for reputation changes.
    pub reputation_chain: String,
    /// Blocks advanced per `process_pending` pass.
    pub max_blocks_per_pass: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            finality_chain: BLOCK_FINALITY_CHAIN.to_string(),
            reputation_chain: VALIDATOR_REPUTATION_CHAIN.to_string(),
            max_blocks_per_pass: 64,
        }
    }
}
