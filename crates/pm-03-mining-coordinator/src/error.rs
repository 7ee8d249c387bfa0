//! Error types for the mining coordinator.

use shared_types::OperationId;
use thiserror::Error;

pub type MiningResult<T> = Result<T, MiningError>;

#[derive(Debug, Error)]
pub enum MiningError {
    #[error("Mining operation {0} not found")]
    OperationNotFound(OperationId),

    /// The operation was cancelled; ticks and completion are refused.
    #[error("Mining operation {0} was cancelled")]
    OperationCancelled(OperationId),

    #[error("Mining operation {id} failed: {reason}")]
    OperationFailed { id: OperationId, reason: String },

    #[error("Difficulty {difficulty} outside {min}..={max}")]
    InvalidDifficulty { difficulty: u32, min: u32, max: u32 },

    #[error("Progress delta must be finite and non-negative, got {0}")]
    InvalidProgress(f64),

    #[error("Active operation limit reached ({limit})")]
    CapacityExceeded { limit: usize },

    /// Work synthesis failed; the operation moved to `Failed`.
    #[error("Work synthesis failed for {id}: {reason}")]
    SynthesisFailed { id: OperationId, reason: String },

    /// A second work item was about to be published for one operation.
    #[error("Mining operation {0} attempted to emit a second work item")]
    DuplicateCompletion(OperationId),
}

impl MiningError {
    /// The operation can no longer produce a work item.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MiningError::OperationCancelled(_)
                | MiningError::OperationFailed { .. }
                | MiningError::SynthesisFailed { .. }
        )
    }
}
