//! Immutable record chain service.

use async_trait::async_trait;
use parking_lot::Mutex;
use pm_01_ledger_store::LedgerStore;
use shared_bus::{EventPublisher, MiningEvent, OperatorChannel};
use shared_crypto::{merkle_root, Ed25519KeyPair};
use shared_types::{
    short_hex, BatchMembership, ChainId, ChainState, Hash, ImmutableRecord, OperatorAlert,
    TimeSource, GENESIS_HASH,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::RecordConfig;
use crate::domain::{
    seal_record, verify_record, ActivityEvent, ChainReport, ChainWalker, IntegrityFault,
    RecordFault, RecordHeader,
};
use crate::error::{RecordError, RecordResult};
use crate::ports::inbound::RecordChainApi;

#[derive(Debug, Default)]
struct ChainSlot {
    state: ChainState,
}

struct Draft {
    event: ActivityEvent,
    references: Option<Hash>,
}

/// Hash-linked audit chains over the ledger store.
///
/// Each chain id has its own lock: appends to one chain are serialized,
/// different chains append concurrently.
pub struct ImmutableRecordChain {
    store: Arc<dyn LedgerStore>,
    events: Arc<dyn EventPublisher>,
    operator: Arc<dyn OperatorChannel>,
    signer: Arc<Ed25519KeyPair>,
    clock: Arc<dyn TimeSource>,
    config: RecordConfig,
    chains: Mutex<HashMap<ChainId, Arc<Mutex<ChainSlot>>>>,
}

impl ImmutableRecordChain {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        events: Arc<dyn EventPublisher>,
        operator: Arc<dyn OperatorChannel>,
        signer: Arc<Ed25519KeyPair>,
        clock: Arc<dyn TimeSource>,
        config: RecordConfig,
    ) -> Self {
        Self {
            store,
            events,
            operator,
            signer,
            clock,
            config,
            chains: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, chain_id: &ChainId) -> Arc<Mutex<ChainSlot>> {
        self.chains
            .lock()
            .entry(chain_id.clone())
            .or_default()
            .clone()
    }

    /// Halt the chain. Returns the event to publish once the lock is
    /// released, or `None` if it was already halted.
    fn halt_locked(
        &self,
        slot: &mut ChainSlot,
        chain_id: &ChainId,
        sequence: u64,
        reason: String,
    ) -> Option<MiningEvent> {
        if slot.state.is_halted() {
            return None;
        }
        slot.state = ChainState::HaltedAwaitingIntervention {
            reason: reason.clone(),
        };
        error!(chain = %chain_id, sequence, reason = %reason, "[pm-06] Record chain halted");
        self.operator.report(OperatorAlert::RecordChainHalted {
            chain_id: chain_id.clone(),
            sequence,
            reason: reason.clone(),
        });
        Some(MiningEvent::RecordChainHalted {
            chain_id: chain_id.clone(),
            sequence,
            reason,
        })
    }

    fn append_locked(
        &self,
        slot: &mut ChainSlot,
        chain_id: &ChainId,
        drafts: Vec<Draft>,
        batched: bool,
        halt_event: &mut Option<MiningEvent>,
    ) -> RecordResult<Vec<ImmutableRecord>> {
        if let ChainState::HaltedAwaitingIntervention { reason } = &slot.state {
            return Err(RecordError::ChainHalted {
                chain_id: chain_id.clone(),
                reason: reason.clone(),
            });
        }

        let tail = self.store.latest_record(chain_id)?;
        if let Some(tail) = &tail {
            if let Err(fault) = verify_record(tail) {
                *halt_event = self.halt_locked(
                    slot,
                    chain_id,
                    tail.sequence,
                    format!("chain tail failed verification: {fault}"),
                );
                return Err(RecordError::IntegrityViolation {
                    chain_id: chain_id.clone(),
                    sequence: tail.sequence,
                    fault,
                });
            }
        }

        let batch_root = batched.then(|| {
            let leaves: Vec<Hash> = drafts
                .iter()
                .map(|d| ImmutableRecord::hash_payload(&d.event.payload))
                .collect();
            merkle_root(&leaves)
        });
        let size = drafts.len() as u32;
        let timestamp = self.clock.now_millis();
        let mut previous = tail.as_ref().map_or(GENESIS_HASH, |r| r.record_hash);
        let mut sequence = tail.as_ref().map_or(0, |r| r.sequence);

        // Every record is sealed before the first store write.
        let mut sealed = Vec::with_capacity(drafts.len());
        for (position, draft) in drafts.into_iter().enumerate() {
            sequence += 1;
            let header = RecordHeader {
                chain_id: chain_id.clone(),
                sequence,
                previous_record_hash: previous,
                batch: batch_root.map(|merkle_root| BatchMembership {
                    merkle_root,
                    position: position as u32,
                    size,
                }),
                references: draft.references,
                timestamp,
            };
            let record = seal_record(header, draft.event, &self.signer);
            previous = record.record_hash;
            sealed.push(record);
        }
        for record in &sealed {
            self.store.append_record(record.clone())?;
        }
        Ok(sealed)
    }

    async fn write(
        &self,
        chain_id: &ChainId,
        drafts: Vec<Draft>,
        batched: bool,
    ) -> RecordResult<Vec<ImmutableRecord>> {
        let slot = self.slot(chain_id);
        let mut halt_event = None;
        let result = {
            let mut slot = slot.lock();
            self.append_locked(&mut slot, chain_id, drafts, batched, &mut halt_event)
        };
        if let Some(event) = halt_event {
            self.events.publish(event).await;
        }
        let records = result?;

        for record in &records {
            debug!(
                chain = %chain_id,
                sequence = record.sequence,
                activity = %record.activity_type,
                hash = %short_hex(&record.record_hash),
                "[pm-06] Record appended"
            );
            self.events
                .publish(MiningEvent::RecordAppended {
                    chain_id: chain_id.clone(),
                    sequence: record.sequence,
                    record_hash: record.record_hash,
                })
                .await;
        }
        Ok(records)
    }

    /// Feed sequences `1..=up_to` into `walker`, a page at a time.
    ///
    /// The outer result is a store failure; the inner one is the first
    /// broken record.
    fn walk(
        &self,
        chain_id: &ChainId,
        up_to: u64,
        walker: &mut ChainWalker,
    ) -> RecordResult<Result<(), RecordFault>> {
        let page_size = self.config.verify_page_size.max(1) as u64;
        let mut next = 1u64;
        while next <= up_to {
            let limit = (up_to - next + 1).min(page_size) as usize;
            let page = self.store.records(chain_id, next, limit)?;
            if page.is_empty() {
                return Ok(Err(RecordFault {
                    sequence: next,
                    kind: IntegrityFault::SequenceGap,
                }));
            }
            for record in page {
                next = record.sequence.saturating_add(1);
                if let Err(fault) = walker.push(record) {
                    return Ok(Err(fault));
                }
            }
        }
        Ok(Ok(()))
    }

    async fn halt_on_fault(&self, chain_id: &ChainId, fault: RecordFault) {
        let event = {
            let slot = self.slot(chain_id);
            let mut slot = slot.lock();
            self.halt_locked(
                &mut slot,
                chain_id,
                fault.sequence,
                format!("chain verification failed: {fault}"),
            )
        };
        if let Some(event) = event {
            self.events.publish(event).await;
        }
    }
}

#[async_trait]
impl RecordChainApi for ImmutableRecordChain {
    async fn append(
        &self,
        chain_id: &ChainId,
        event: ActivityEvent,
    ) -> RecordResult<ImmutableRecord> {
        let draft = Draft {
            event,
            references: None,
        };
        let mut records = self.write(chain_id, vec![draft], false).await?;
        records.pop().ok_or(RecordError::EmptyBatch)
    }

    async fn append_batch(
        &self,
        chain_id: &ChainId,
        events: Vec<ActivityEvent>,
    ) -> RecordResult<Vec<ImmutableRecord>> {
        if events.is_empty() {
            return Err(RecordError::EmptyBatch);
        }
        if events.len() > self.config.max_batch_size {
            return Err(RecordError::BatchTooLarge {
                size: events.len(),
                limit: self.config.max_batch_size,
            });
        }
        let drafts = events
            .into_iter()
            .map(|event| Draft {
                event,
                references: None,
            })
            .collect();
        let records = self.write(chain_id, drafts, true).await?;
        info!(chain = %chain_id, size = records.len(), "[pm-06] Batch appended");
        Ok(records)
    }

    async fn correct(
        &self,
        chain_id: &ChainId,
        original: Hash,
        event: ActivityEvent,
    ) -> RecordResult<ImmutableRecord> {
        if self.store.record_by_hash(&original)?.is_none() {
            return Err(RecordError::OriginalNotFound(original));
        }
        let draft = Draft {
            event,
            references: Some(original),
        };
        let mut records = self.write(chain_id, vec![draft], false).await?;
        let record = records.pop().ok_or(RecordError::EmptyBatch)?;
        info!(
            chain = %chain_id,
            sequence = record.sequence,
            original = %short_hex(&original),
            "[pm-06] Correction appended"
        );
        Ok(record)
    }

    async fn verify_integrity(&self, record: &ImmutableRecord) -> RecordResult<()> {
        let violation = |fault: RecordFault| RecordError::IntegrityViolation {
            chain_id: record.chain_id.clone(),
            sequence: fault.sequence,
            fault: fault.kind,
        };
        if record.sequence == 0 {
            return Err(violation(RecordFault {
                sequence: 0,
                kind: IntegrityFault::SequenceGap,
            }));
        }
        // The record only stands if every predecessor does.
        let mut walker = ChainWalker::new();
        self.walk(&record.chain_id, record.sequence - 1, &mut walker)?
            .and_then(|()| walker.push(record.clone()))
            .map_err(violation)
    }

    #[tracing::instrument(skip(self), fields(chain = %chain_id))]
    async fn verify_chain(
        &self,
        chain_id: &ChainId,
        up_to: Option<u64>,
    ) -> RecordResult<ChainReport> {
        let tail = self
            .store
            .latest_record(chain_id)?
            .map_or(0, |r| r.sequence);
        let up_to = match up_to {
            Some(sequence) if sequence > tail => {
                return Err(RecordError::RecordNotFound {
                    chain_id: chain_id.clone(),
                    sequence,
                })
            }
            Some(sequence) => sequence,
            None => tail,
        };

        let mut walker = ChainWalker::new();
        if let Err(fault) = self.walk(chain_id, up_to, &mut walker)? {
            self.halt_on_fault(chain_id, fault).await;
            return Ok(ChainReport {
                chain_id: chain_id.clone(),
                records_checked: walker.checked(),
                fault: Some(fault),
            });
        }

        info!(chain = %chain_id, records = walker.checked(), "[pm-06] Record chain verified");
        Ok(ChainReport {
            chain_id: chain_id.clone(),
            records_checked: walker.checked(),
            fault: None,
        })
    }

    async fn chain_state(&self, chain_id: &ChainId) -> ChainState {
        let slot = self.chains.lock().get(chain_id).cloned();
        slot.map(|s| s.lock().state.clone()).unwrap_or_default()
    }

    async fn resume_chain(&self, chain_id: &ChainId) -> RecordResult<()> {
        let slot = self.slot(chain_id);
        let mut slot = slot.lock();
        if let ChainState::HaltedAwaitingIntervention { reason } = &slot.state {
            info!(chain = %chain_id, previous_reason = %reason, "[pm-06] Record chain resumed by operator");
        }
        slot.state = ChainState::Running;
        Ok(())
    }

    async fn latest(&self, chain_id: &ChainId) -> RecordResult<Option<ImmutableRecord>> {
        Ok(self.store.latest_record(chain_id)?)
    }

    async fn records(
        &self,
        chain_id: &ChainId,
        from: u64,
        limit: usize,
    ) -> RecordResult<Vec<ImmutableRecord>> {
        Ok(self.store.records(chain_id, from, limit)?)
    }

    async fn chain_ids(&self) -> RecordResult<Vec<ChainId>> {
        Ok(self.store.chain_ids()?)
    }
}
