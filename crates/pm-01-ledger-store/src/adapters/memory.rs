//! In-memory `LedgerStore`.
//!
//! Each entity family sits behind its own `RwLock`, so block appends, record
//! appends and validator writes do not contend with each other.

use parking_lot::RwLock;
use shared_types::{
    short_hex, Block, ChainHead, ChainId, ConsensusLayer, Hash, ImmutableRecord, TargetRef,
    ValidationRecord, Validator, ValidatorId, ValidatorRole, WorkItem, WorkItemId, GENESIS_HASH,
};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::ports::LedgerStore;

#[derive(Default)]
struct BlockTable {
    /// Position equals block index.
    blocks: Vec<Block>,
    by_hash: HashMap<Hash, u64>,
}

#[derive(Default)]
struct WorkItemTable {
    items: HashMap<WorkItemId, WorkItem>,
    order: Vec<WorkItemId>,
}

#[derive(Default)]
struct RecordTable {
    /// Position equals `sequence - 1`.
    chains: BTreeMap<ChainId, Vec<ImmutableRecord>>,
    by_hash: HashMap<Hash, (ChainId, u64)>,
}

/// Thread-safe in-memory store.
#[derive(Default)]
pub struct InMemoryLedgerStore {
    blocks: RwLock<BlockTable>,
    work_items: RwLock<WorkItemTable>,
    validators: RwLock<BTreeMap<ValidatorId, Validator>>,
    validations: RwLock<HashMap<(ConsensusLayer, TargetRef), Vec<ValidationRecord>>>,
    records: RwLock<RecordTable>,
}

impl InMemoryLedgerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn head(&self) -> StoreResult<Option<ChainHead>> {
        Ok(self.blocks.read().blocks.last().map(ChainHead::from))
    }

    fn compare_and_append_block(
        &self,
        expected_head: Option<Hash>,
        block: Block,
    ) -> StoreResult<ChainHead> {
        let mut table = self.blocks.write();
        let current = table.blocks.last().map(|b| b.block_hash);
        if current != expected_head {
            return Err(StoreError::HeadMismatch {
                expected: expected_head,
                actual: current,
            });
        }

        let next_index = table.blocks.len() as u64;
        if block.index != next_index {
            return Err(StoreError::InvalidBlock {
                index: block.index,
                reason: format!("expected index {next_index}"),
            });
        }
        let expected_link = current.unwrap_or(GENESIS_HASH);
        if block.previous_hash != expected_link {
            return Err(StoreError::InvalidBlock {
                index: block.index,
                reason: format!("previous hash must be {}", short_hex(&expected_link)),
            });
        }
        if table.by_hash.contains_key(&block.block_hash) {
            return Err(StoreError::AlreadyExists {
                kind: "block",
                id: short_hex(&block.block_hash),
            });
        }

        // Lock order: blocks, then work items.
        let mut items = self.work_items.write();
        if let Some(taken) = block
            .work_items
            .iter()
            .find(|item| items.items.contains_key(&item.id))
        {
            return Err(StoreError::AlreadyExists {
                kind: "work item",
                id: taken.id.to_string(),
            });
        }
        for item in &block.work_items {
            items.order.push(item.id);
            items.items.insert(item.id, item.clone());
        }
        drop(items);

        let head = ChainHead::from(&block);
        table.by_hash.insert(block.block_hash, block.index);
        table.blocks.push(block);
        debug!(index = head.index, hash = %short_hex(&head.block_hash), "[pm-01] Head advanced");
        Ok(head)
    }

    fn block_by_index(&self, index: u64) -> StoreResult<Option<Block>> {
        Ok(self.blocks.read().blocks.get(index as usize).cloned())
    }

    fn block_by_hash(&self, hash: &Hash) -> StoreResult<Option<Block>> {
        let table = self.blocks.read();
        Ok(table
            .by_hash
            .get(hash)
            .and_then(|index| table.blocks.get(*index as usize))
            .cloned())
    }

    fn blocks_from(&self, from: u64, limit: usize) -> StoreResult<Vec<Block>> {
        let table = self.blocks.read();
        Ok(table
            .blocks
            .iter()
            .skip(from as usize)
            .take(limit)
            .cloned()
            .collect())
    }

    fn recent_blocks(&self, limit: usize) -> StoreResult<Vec<Block>> {
        Ok(self
            .blocks
            .read()
            .blocks
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    fn block_count(&self) -> StoreResult<u64> {
        Ok(self.blocks.read().blocks.len() as u64)
    }

    fn insert_work_item(&self, item: WorkItem) -> StoreResult<()> {
        let mut table = self.work_items.write();
        if table.items.contains_key(&item.id) {
            return Err(StoreError::AlreadyExists {
                kind: "work item",
                id: item.id.to_string(),
            });
        }
        table.order.push(item.id);
        table.items.insert(item.id, item);
        Ok(())
    }

    fn work_item(&self, id: &WorkItemId) -> StoreResult<Option<WorkItem>> {
        Ok(self.work_items.read().items.get(id).cloned())
    }

    fn recent_work_items(&self, limit: usize) -> StoreResult<Vec<WorkItem>> {
        let table = self.work_items.read();
        Ok(table
            .order
            .iter()
            .rev()
            .take(limit)
            .filter_map(|id| table.items.get(id).cloned())
            .collect())
    }

    fn upsert_validator(&self, validator: Validator) -> StoreResult<()> {
        self.validators
            .write()
            .insert(validator.id.clone(), validator);
        Ok(())
    }

    fn validator(&self, id: &ValidatorId) -> StoreResult<Option<Validator>> {
        Ok(self.validators.read().get(id).cloned())
    }

    fn validators(&self, role: Option<ValidatorRole>) -> StoreResult<Vec<Validator>> {
        Ok(self
            .validators
            .read()
            .values()
            .filter(|v| role.map_or(true, |r| v.role == r))
            .cloned()
            .collect())
    }

    fn insert_validation_record(&self, record: ValidationRecord) -> StoreResult<()> {
        let mut table = self.validations.write();
        let entry = table.entry((record.layer, record.target)).or_default();
        if entry.iter().any(|r| r.validator_id == record.validator_id) {
            return Err(StoreError::DuplicateValidation {
                validator: record.validator_id.to_string(),
                target: record.target.to_string(),
            });
        }
        entry.push(record);
        Ok(())
    }

    fn validation_records(
        &self,
        layer: ConsensusLayer,
        target: &TargetRef,
    ) -> StoreResult<Vec<ValidationRecord>> {
        Ok(self
            .validations
            .read()
            .get(&(layer, *target))
            .cloned()
            .unwrap_or_default())
    }

    fn append_record(&self, record: ImmutableRecord) -> StoreResult<()> {
        let mut table = self.records.write();
        if table.by_hash.contains_key(&record.record_hash) {
            return Err(StoreError::AlreadyExists {
                kind: "record",
                id: short_hex(&record.record_hash),
            });
        }
        let chain = table.chains.entry(record.chain_id.clone()).or_default();
        let expected = chain.len() as u64 + 1;
        if record.sequence != expected {
            return Err(StoreError::SequenceConflict {
                chain_id: record.chain_id.clone(),
                expected,
                actual: record.sequence,
            });
        }
        let tail_hash = chain.last().map_or(GENESIS_HASH, |r| r.record_hash);
        if record.previous_record_hash != tail_hash {
            return Err(StoreError::BrokenLink {
                chain_id: record.chain_id.clone(),
                sequence: record.sequence,
            });
        }

        let key = (record.chain_id.clone(), record.sequence);
        let hash = record.record_hash;
        chain.push(record);
        table.by_hash.insert(hash, key);
        Ok(())
    }

    fn latest_record(&self, chain_id: &ChainId) -> StoreResult<Option<ImmutableRecord>> {
        Ok(self
            .records
            .read()
            .chains
            .get(chain_id)
            .and_then(|chain| chain.last().cloned()))
    }

    fn record(&self, chain_id: &ChainId, sequence: u64) -> StoreResult<Option<ImmutableRecord>> {
        if sequence == 0 {
            return Ok(None);
        }
        Ok(self
            .records
            .read()
            .chains
            .get(chain_id)
            .and_then(|chain| chain.get(sequence as usize - 1).cloned()))
    }

    fn record_by_hash(&self, hash: &Hash) -> StoreResult<Option<ImmutableRecord>> {
        let table = self.records.read();
        Ok(table.by_hash.get(hash).and_then(|(chain_id, sequence)| {
            table
                .chains
                .get(chain_id)
                .and_then(|chain| chain.get(*sequence as usize - 1).cloned())
        }))
    }

    fn records(
        &self,
        chain_id: &ChainId,
        from: u64,
        limit: usize,
    ) -> StoreResult<Vec<ImmutableRecord>> {
        let skip = from.saturating_sub(1) as usize;
        Ok(self
            .records
            .read()
            .chains
            .get(chain_id)
            .map(|chain| chain.iter().skip(skip).take(limit).cloned().collect())
            .unwrap_or_default())
    }

    fn chain_ids(&self) -> StoreResult<Vec<ChainId>> {
        Ok(self.records.read().chains.keys().cloned().collect())
    }
}

/// Storage-level corruption helpers.
///
/// They bypass every append-only check and exist only so integrity
/// verification can be exercised against a tampered store.
#[cfg(any(test, feature = "test-helpers"))]
impl InMemoryLedgerStore {
    /// Mutate a stored block in place. Returns `false` if it does not exist.
    pub fn tamper_block(&self, index: u64, mutate: impl FnOnce(&mut Block)) -> bool {
        let mut table = self.blocks.write();
        match table.blocks.get_mut(index as usize) {
            Some(block) => {
                mutate(block);
                true
            }
            None => false,
        }
    }

    /// Mutate a stored record in place. Returns `false` if it does not exist.
    pub fn tamper_record(
        &self,
        chain_id: &ChainId,
        sequence: u64,
        mutate: impl FnOnce(&mut ImmutableRecord),
    ) -> bool {
        let mut table = self.records.write();
        match table
            .chains
            .get_mut(chain_id)
            .and_then(|chain| chain.get_mut(sequence.saturating_sub(1) as usize))
        {
            Some(record) => {
                mutate(record);
                true
            }
            None => false,
        }
    }
}
