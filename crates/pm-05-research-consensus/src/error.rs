//! Error types for research consensus.

use pm_01_ledger_store::StoreError;
use shared_types::{TargetRef, ValidatorId};
use thiserror::Error;

pub type ResearchResult<T> = Result<T, ResearchError>;

#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("Validator {0} not found")]
    ValidatorNotFound(ValidatorId),

    #[error("Validator {0} is not an active researcher")]
    NotEligible(ValidatorId),

    #[error("Researcher {validator} already validated {target}")]
    DuplicateValidation {
        validator: ValidatorId,
        target: TargetRef,
    },

    /// The round reached its required validations; nothing more is accepted.
    #[error("Research consensus on {0} is closed")]
    ConsensusClosed(TargetRef),

    /// The score was unusable; the submission is excluded.
    #[error("Malformed submission from {validator}: {reason}")]
    MalformedSubmission {
        validator: ValidatorId,
        reason: String,
    },

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}
