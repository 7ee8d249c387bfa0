//! Error types for stake consensus.

use pm_01_ledger_store::StoreError;
use shared_types::{TargetRef, ValidatorId, WorkItemId};
use thiserror::Error;

pub type StakeResult<T> = Result<T, StakeError>;

#[derive(Debug, Error)]
pub enum StakeError {
    #[error("Validator {0} not found")]
    ValidatorNotFound(ValidatorId),

    #[error("Validator {0} is not an active stake holder")]
    NotEligible(ValidatorId),

    /// Stake below the participation minimum.
    #[error("Validator {validator} stake {stake} below minimum {minimum}")]
    InsufficientStake {
        validator: ValidatorId,
        stake: u64,
        minimum: u64,
    },

    #[error("Validator {validator} already validated {target}")]
    DuplicateValidation {
        validator: ValidatorId,
        target: TargetRef,
    },

    /// The round for this target already reached its decision.
    #[error("Consensus on {0} is closed")]
    ConsensusClosed(TargetRef),

    /// The submission was excluded from aggregation.
    #[error("Malformed submission from {validator}: {reason}")]
    MalformedSubmission {
        validator: ValidatorId,
        reason: String,
    },

    #[error("Work item {0} not found")]
    WorkItemNotFound(WorkItemId),

    /// `apply_disposition` before the round was finalized.
    #[error("Consensus on {0} has not been finalized")]
    NotFinalized(TargetRef),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl StakeError {
    /// The failure concerns only this submission; the round is unaffected.
    #[must_use]
    pub fn is_submission_local(&self) -> bool {
        matches!(
            self,
            StakeError::InsufficientStake { .. }
                | StakeError::DuplicateValidation { .. }
                | StakeError::MalformedSubmission { .. }
                | StakeError::NotEligible(_)
                | StakeError::ValidatorNotFound(_)
        )
    }
}
