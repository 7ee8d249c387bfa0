//! # Outbound Port: Ledger Store
//!
//! The storage collaborator every subsystem writes through.
//!
//! Production deployments plug a durable engine in behind this trait;
//! `InMemoryLedgerStore` is the shipped adapter.
//!
//! ## Guarantees required of implementations
//!
//! - `compare_and_append_block` is linearizable: of two writers extending
//!   the same head, exactly one succeeds. It indexes the block's work items
//!   in the same step, so a work item lands in at most one block.
//! - `append_record` is linearizable per chain id.
//! - Work items and validation records are insert-once.
//! - Nothing is ever deleted or overwritten, validators excepted (upsert).

use shared_types::{
    Block, ChainHead, ChainId, ConsensusLayer, Hash, ImmutableRecord, TargetRef, ValidationRecord,
    Validator, ValidatorId, ValidatorRole, WorkItem, WorkItemId,
};

use crate::error::StoreResult;

/// Append-only repository for the ledger's entities.
pub trait LedgerStore: Send + Sync {
    // =========================================================================
    // BLOCKS
    // =========================================================================

    /// Current chain head, `None` before genesis.
    fn head(&self) -> StoreResult<Option<ChainHead>>;

    /// Append `block` if and only if the head is still `expected_head`.
    ///
    /// `None` means "the chain is empty". The block must sit at the next
    /// index and link to the expected head. Its work items are inserted
    /// atomically with the block; `AlreadyExists` if any is already stored.
    fn compare_and_append_block(
        &self,
        expected_head: Option<Hash>,
        block: Block,
    ) -> StoreResult<ChainHead>;

    fn block_by_index(&self, index: u64) -> StoreResult<Option<Block>>;

    fn block_by_hash(&self, hash: &Hash) -> StoreResult<Option<Block>>;

    /// Blocks with `index >= from`, ascending, at most `limit`.
    fn blocks_from(&self, from: u64, limit: usize) -> StoreResult<Vec<Block>>;

    /// Most recent blocks, newest first.
    fn recent_blocks(&self, limit: usize) -> StoreResult<Vec<Block>>;

    fn block_count(&self) -> StoreResult<u64>;

    // =========================================================================
    // WORK ITEMS
    // =========================================================================

    /// Insert a work item. Fails with `AlreadyExists` on a repeated id.
    fn insert_work_item(&self, item: WorkItem) -> StoreResult<()>;

    fn work_item(&self, id: &WorkItemId) -> StoreResult<Option<WorkItem>>;

    /// Most recent work items, newest first.
    fn recent_work_items(&self, limit: usize) -> StoreResult<Vec<WorkItem>>;

    // =========================================================================
    // VALIDATORS
    // =========================================================================

    /// Insert or replace a validator.
    fn upsert_validator(&self, validator: Validator) -> StoreResult<()>;

    fn validator(&self, id: &ValidatorId) -> StoreResult<Option<Validator>>;

    /// Validators sorted by id, optionally filtered by role.
    fn validators(&self, role: Option<ValidatorRole>) -> StoreResult<Vec<Validator>>;

    // =========================================================================
    // VALIDATION RECORDS
    // =========================================================================

    /// Insert a record. Fails with `DuplicateValidation` if the validator
    /// already has one for the same `(layer, target)`.
    fn insert_validation_record(&self, record: ValidationRecord) -> StoreResult<()>;

    /// Records for a target in insertion order.
    fn validation_records(
        &self,
        layer: ConsensusLayer,
        target: &TargetRef,
    ) -> StoreResult<Vec<ValidationRecord>>;

    // =========================================================================
    // IMMUTABLE RECORDS
    // =========================================================================

    /// Append to a record chain.
    ///
    /// The record's sequence must be `tail + 1` (1 for an empty chain) and its
    /// `previous_record_hash` must equal the tail's `record_hash`.
    fn append_record(&self, record: ImmutableRecord) -> StoreResult<()>;

    fn latest_record(&self, chain_id: &ChainId) -> StoreResult<Option<ImmutableRecord>>;

    fn record(&self, chain_id: &ChainId, sequence: u64) -> StoreResult<Option<ImmutableRecord>>;

    fn record_by_hash(&self, hash: &Hash) -> StoreResult<Option<ImmutableRecord>>;

    /// Records with `sequence >= from`, ascending, at most `limit`.
    fn records(
        &self,
        chain_id: &ChainId,
        from: u64,
        limit: usize,
    ) -> StoreResult<Vec<ImmutableRecord>>;

    fn chain_ids(&self) -> StoreResult<Vec<ChainId>>;
}
