//! Store error types.

use shared_types::{ChainId, Hash};
use thiserror::Error;

/// Errors returned by a `LedgerStore`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The chain head moved since the caller read it.
    #[error("Head mismatch: expected {expected:?}, current {actual:?}")]
    HeadMismatch {
        expected: Option<Hash>,
        actual: Option<Hash>,
    },

    /// The block does not extend the head it claims to extend.
    #[error("Block {index} does not extend the head: {reason}")]
    InvalidBlock { index: u64, reason: String },

    /// An insert-once entity already exists.
    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: &'static str, id: String },

    /// A validator already has a record for this target in this layer.
    #[error("Duplicate validation by {validator} on {target}")]
    DuplicateValidation { validator: String, target: String },

    /// A record append raced with another writer on the same chain.
    #[error("Sequence conflict on {chain_id}: expected {expected}, got {actual}")]
    SequenceConflict {
        chain_id: ChainId,
        expected: u64,
        actual: u64,
    },

    /// The record's back-link does not match the chain tail.
    #[error("Record {sequence} on {chain_id} does not link to the chain tail")]
    BrokenLink { chain_id: ChainId, sequence: u64 },

    #[error("Not found: {0}")]
    NotFound(String),
}

impl StoreError {
    /// Whether re-reading state and retrying can succeed.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::HeadMismatch { .. } | StoreError::SequenceConflict { .. }
        )
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
