//! Error types for the blockchain ledger.

use pm_01_ledger_store::StoreError;
use shared_types::{Hash, WorkItemId};
use thiserror::Error;

/// Result type alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors that can occur while building or appending blocks.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The prior block handed in is not the current head, or the head moved
    /// before the append landed.
    #[error("Chain continuity violated: expected head {expected:?}, found {actual:?}")]
    ChainContinuity {
        /// Head the caller built on.
        expected: Option<Hash>,
        /// Head the ledger observed.
        actual: Option<Hash>,
    },

    /// Appends are refused until an operator resumes the ledger.
    #[error("Ledger halted awaiting operator intervention: {reason}")]
    Halted { reason: String },

    /// The work item failed basic well-formedness checks.
    #[error("Invalid work item {id}: {reason}")]
    InvalidWorkItem { id: WorkItemId, reason: String },

    /// The work item is already included in a block.
    #[error("Work item {0} is already included in a block")]
    WorkItemAlreadyIncluded(WorkItemId),

    /// Head contention did not clear within the retry budget.
    #[error("Append retries exhausted after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Re-reading the head and retrying may succeed.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LedgerError::ChainContinuity { .. } | LedgerError::RetriesExhausted { .. }
        )
    }

    /// Needs an operator before the ledger accepts appends again.
    #[must_use]
    pub fn is_critical(&self) -> bool {
        matches!(self, LedgerError::Halted { .. })
    }
}
