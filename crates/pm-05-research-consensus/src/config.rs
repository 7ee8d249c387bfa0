//! Research consensus configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Validations that close a round.
    pub required_validations: usize,
    /// Minimum score for an initial `Approved`.
    pub approval_score: f64,
    /// Approval rate needed for acceptance, compared at three decimals.
    pub consensus_threshold: f64,
    /// Mean quality needed for acceptance.
    pub quality_threshold: f64,
    /// Largest score gap at which a reviewer still agrees.
    pub agreement_tolerance: f64,
    pub collection_window_ms: u64,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            required_validations: 3,
            approval_score: 70.0,
            consensus_threshold: 0.667,
            quality_threshold: 70.0,
            agreement_tolerance: 15.0,
            collection_window_ms: 180_000,
        }
    }
}
