//! Mining coordinator configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningConfig {
    pub min_difficulty: u32,
    pub max_difficulty: u32,
    /// Operations in `Active` or `Completing` at once.
    pub max_active_operations: usize,
    /// Estimated completion is `difficulty * millis_per_difficulty` after start.
    pub millis_per_difficulty: u64,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            min_difficulty: 1,
            max_difficulty: 1000,
            max_active_operations: 256,
            millis_per_difficulty: 2_000,
        }
    }
}
