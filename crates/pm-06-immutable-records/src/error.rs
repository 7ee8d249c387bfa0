//! Error types for the immutable record chain.

use pm_01_ledger_store::StoreError;
use shared_types::{ChainId, Hash};
use thiserror::Error;

use crate::domain::IntegrityFault;

pub type RecordResult<T> = Result<T, RecordError>;

#[derive(Debug, Error)]
pub enum RecordError {
    /// A record failed re-verification.
    #[error("Integrity violation on {chain_id} at sequence {sequence}: {fault}")]
    IntegrityViolation {
        chain_id: ChainId,
        sequence: u64,
        fault: IntegrityFault,
    },

    /// Appends are refused until an operator resumes the chain.
    #[error("Record chain {chain_id} halted: {reason}")]
    ChainHalted { chain_id: ChainId, reason: String },

    /// A correction referenced a record that does not exist.
    #[error("Original record {0:?} not found")]
    OriginalNotFound(Hash),

    #[error("Sequence {sequence} not found on {chain_id}")]
    RecordNotFound { chain_id: ChainId, sequence: u64 },

    #[error("Batch must contain at least one event")]
    EmptyBatch,

    #[error("Batch of {size} exceeds the limit of {limit}")]
    BatchTooLarge { size: usize, limit: usize },

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl RecordError {
    /// Another writer touched the chain; re-reading the tail and retrying
    /// may succeed.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RecordError::Store(e) if e.is_conflict())
    }

    /// Needs an operator before the chain accepts appends again.
    #[must_use]
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            RecordError::ChainHalted { .. } | RecordError::IntegrityViolation { .. }
        )
    }
}
