//! Inbound API for the record chain.

use async_trait::async_trait;
use shared_types::{ChainId, ChainState, Hash, ImmutableRecord};

use crate::domain::{ActivityEvent, ChainReport};
use crate::error::RecordResult;

#[async_trait]
pub trait RecordChainApi: Send + Sync {
    /// Append one event to `chain_id`.
    async fn append(&self, chain_id: &ChainId, event: ActivityEvent)
        -> RecordResult<ImmutableRecord>;

    /// Append events as one batch sharing a merkle root over their
    /// activity hashes. Records are contiguous on the chain.
    async fn append_batch(
        &self,
        chain_id: &ChainId,
        events: Vec<ActivityEvent>,
    ) -> RecordResult<Vec<ImmutableRecord>>;

    /// Append a compensating record that references `original`.
    async fn correct(
        &self,
        chain_id: &ChainId,
        original: Hash,
        event: ActivityEvent,
    ) -> RecordResult<ImmutableRecord>;

    /// Re-verify a record and every stored record before it.
    ///
    /// Reports the first broken sequence. Never halts the chain.
    async fn verify_integrity(&self, record: &ImmutableRecord) -> RecordResult<()>;

    /// Walk `chain_id` from genesis up to `up_to` (the tail when `None`).
    ///
    /// A fault halts the chain.
    async fn verify_chain(&self, chain_id: &ChainId, up_to: Option<u64>)
        -> RecordResult<ChainReport>;

    async fn chain_state(&self, chain_id: &ChainId) -> ChainState;

    async fn resume_chain(&self, chain_id: &ChainId) -> RecordResult<()>;

    async fn latest(&self, chain_id: &ChainId) -> RecordResult<Option<ImmutableRecord>>;

    async fn records(
        &self,
        chain_id: &ChainId,
        from: u64,
        limit: usize,
    ) -> RecordResult<Vec<ImmutableRecord>>;

    async fn chain_ids(&self) -> RecordResult<Vec<ChainId>>;
}
