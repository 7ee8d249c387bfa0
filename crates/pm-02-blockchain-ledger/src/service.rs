//! Blockchain ledger service.

use async_trait::async_trait;
use parking_lot::RwLock;
use pm_01_ledger_store::{LedgerStore, StoreError};
use shared_bus::{EventPublisher, MiningEvent, OperatorChannel};
use shared_types::{
    short_hex, Block, ChainHead, ChainState, MinerId, OperatorAlert, TimeSource, WorkItem,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::LedgerConfig;
use crate::domain::{assemble_block, check_block, BlockTemplate, ChainVerification, FaultKind};
use crate::domain::verification::ChainFault;
use crate::error::{LedgerError, LedgerResult};
use crate::ports::inbound::LedgerApi;

/// Blocks fetched per page during full verification.
const VERIFY_PAGE: usize = 256;

/// The blockchain ledger.
///
/// Head ownership lives in the store: every append is a compare-and-set
/// against the head this service read. A losing writer gets
/// `ChainContinuity` and may retry; it never overwrites.
pub struct BlockchainLedger {
    store: Arc<dyn LedgerStore>,
    events: Arc<dyn EventPublisher>,
    operator: Arc<dyn OperatorChannel>,
    clock: Arc<dyn TimeSource>,
    config: LedgerConfig,
    state: RwLock<ChainState>,
}

impl BlockchainLedger {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        events: Arc<dyn EventPublisher>,
        operator: Arc<dyn OperatorChannel>,
        clock: Arc<dyn TimeSource>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            store,
            events,
            operator,
            clock,
            config,
            state: RwLock::new(ChainState::Running),
        }
    }

    #[must_use]
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    fn ensure_running(&self) -> LedgerResult<()> {
        match &*self.state.read() {
            ChainState::Running => Ok(()),
            ChainState::HaltedAwaitingIntervention { reason } => Err(LedgerError::Halted {
                reason: reason.clone(),
            }),
        }
    }

    async fn halt(&self, reason: String) {
        {
            let mut state = self.state.write();
            if state.is_halted() {
                return;
            }
            *state = ChainState::HaltedAwaitingIntervention {
                reason: reason.clone(),
            };
        }
        error!(reason = %reason, "[pm-02] Ledger halted, awaiting operator");
        self.operator.report(OperatorAlert::LedgerHalted {
            reason: reason.clone(),
        });
        self.events.publish(MiningEvent::LedgerHalted { reason }).await;
    }

    fn validate_work_item(&self, work_item: &WorkItem) -> LedgerResult<()> {
        if !work_item.is_well_formed() {
            return Err(LedgerError::InvalidWorkItem {
                id: work_item.id,
                reason: "difficulty or numeric fields out of range".into(),
            });
        }
        if self.store.work_item(&work_item.id)?.is_some() {
            return Err(LedgerError::WorkItemAlreadyIncluded(work_item.id));
        }
        Ok(())
    }

    /// Re-check the stored head block before building on it.
    async fn check_head_integrity(&self, head: &Block) -> LedgerResult<()> {
        let previous = match head.index {
            0 => None,
            i => self.store.block_by_index(i - 1)?,
        };
        let fault = match (head.index, previous.as_ref()) {
            (0, _) | (_, Some(_)) => check_block(head, previous.as_ref()).err(),
            (_, None) => Some(FaultKind::IndexGap),
        };
        if let Some(kind) = fault {
            let fault = ChainFault {
                index: head.index,
                kind,
            };
            self.halt(format!("stored head failed verification: {fault}"))
                .await;
            return Err(LedgerError::Halted {
                reason: fault.to_string(),
            });
        }
        Ok(())
    }

    async fn current_head_block(&self) -> LedgerResult<Option<Block>> {
        match self.store.head()? {
            Some(head) => Ok(self.store.block_by_index(head.index)?),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl LedgerApi for BlockchainLedger {
    async fn create_block(
        &self,
        work_item: WorkItem,
        miner_id: MinerId,
        prior: Option<Block>,
    ) -> LedgerResult<Block> {
        self.ensure_running()?;
        self.validate_work_item(&work_item)?;

        let expected = prior.as_ref().map(|b| b.block_hash);
        let actual = self.store.head()?.map(|h| h.block_hash);
        if expected != actual {
            debug!(
                expected = ?expected.map(|h| short_hex(&h)),
                actual = ?actual.map(|h| short_hex(&h)),
                "[pm-02] Stale prior block"
            );
            return Err(LedgerError::ChainContinuity { expected, actual });
        }
        if let Some(prior_block) = prior.as_ref() {
            self.check_head_integrity(prior_block).await?;
        }

        let template = BlockTemplate::extending(
            prior.as_ref(),
            miner_id,
            vec![work_item.clone()],
            self.clock.now_millis(),
        );
        let (block, outcome) = assemble_block(template, &self.config);

        // The store indexes the work item with the head swap, so a racing
        // append of the same item cannot land a second block.
        match self.store.compare_and_append_block(expected, block.clone()) {
            Ok(_) => {}
            Err(StoreError::HeadMismatch { expected, actual }) => {
                debug!(index = block.index, "[pm-02] Lost head CAS");
                return Err(LedgerError::ChainContinuity { expected, actual });
            }
            Err(StoreError::AlreadyExists {
                kind: "work item", ..
            }) => return Err(LedgerError::WorkItemAlreadyIncluded(work_item.id)),
            Err(e) => return Err(e.into()),
        }

        info!(
            index = block.index,
            hash = %short_hex(&block.block_hash),
            pow_satisfied = outcome.satisfied,
            iterations = outcome.iterations,
            "[pm-02] Block appended"
        );
        self.events
            .publish(MiningEvent::BlockCreated {
                index: block.index,
                block_hash: block.block_hash,
                previous_hash: block.previous_hash,
                miner_id: block.miner_id.clone(),
                pow_satisfied: outcome.satisfied,
            })
            .await;
        Ok(block)
    }

    async fn append_work_item(&self, work_item: WorkItem) -> LedgerResult<Block> {
        let attempts = self.config.max_append_retries.max(1);
        for attempt in 1..=attempts {
            let prior = self.current_head_block().await?;
            match self
                .create_block(work_item.clone(), work_item.miner_id.clone(), prior)
                .await
            {
                Err(e @ LedgerError::ChainContinuity { .. }) => {
                    debug!(attempt, error = %e, "[pm-02] Retrying append against new head");
                }
                other => return other,
            }
        }
        warn!(attempts, "[pm-02] Append retries exhausted");
        Err(LedgerError::RetriesExhausted { attempts })
    }

    async fn head(&self) -> LedgerResult<Option<ChainHead>> {
        Ok(self.store.head()?)
    }

    async fn recent_blocks(&self, limit: usize) -> LedgerResult<Vec<Block>> {
        Ok(self.store.recent_blocks(limit)?)
    }

    async fn block(&self, index: u64) -> LedgerResult<Option<Block>> {
        Ok(self.store.block_by_index(index)?)
    }

    async fn verify_stored_chain(&self) -> LedgerResult<ChainVerification> {
        let mut checked = 0u64;
        let mut previous: Option<Block> = None;
        loop {
            let page = self.store.blocks_from(checked, VERIFY_PAGE)?;
            if page.is_empty() {
                break;
            }
            for block in page {
                if let Err(kind) = check_block(&block, previous.as_ref()) {
                    let fault = ChainFault {
                        index: block.index,
                        kind,
                    };
                    self.halt(format!("chain verification failed: {fault}")).await;
                    return Ok(ChainVerification {
                        blocks_checked: checked,
                        fault: Some(fault),
                    });
                }
                checked += 1;
                previous = Some(block);
            }
        }
        info!(blocks = checked, "[pm-02] Stored chain verified");
        Ok(ChainVerification {
            blocks_checked: checked,
            fault: None,
        })
    }

    async fn state(&self) -> ChainState {
        self.state.read().clone()
    }

    async fn resume(&self) -> LedgerResult<()> {
        let mut state = self.state.write();
        if let ChainState::HaltedAwaitingIntervention { reason } = &*state {
            info!(previous_reason = %reason, "[pm-02] Ledger resumed by operator");
        }
        *state = ChainState::Running;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pm_01_ledger_store::InMemoryLedgerStore;
    use shared_bus::{operator_channel, EventFilter, EventTopic, InMemoryEventBus};
    use shared_types::{ManualTimeSource, OperationId, WorkItemId, WorkType};
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Harness {
        ledger: Arc<BlockchainLedger>,
        store: Arc<InMemoryLedgerStore>,
        bus: Arc<InMemoryEventBus>,
        alerts: UnboundedReceiver<OperatorAlert>,
    }

    fn create_test_ledger() -> Harness {
        let store = Arc::new(InMemoryLedgerStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let (operator, alerts) = operator_channel();
        let config = LedgerConfig {
            max_pow_iterations: 5_000,
            max_target_bits: 6,
            ..LedgerConfig::default()
        };
        let ledger = Arc::new(BlockchainLedger::new(
            store.clone(),
            bus.clone(),
            Arc::new(operator),
            Arc::new(ManualTimeSource::new(1_700_000_000_000)),
            config,
        ));
        Harness {
            ledger,
            store,
            bus,
            alerts,
        }
    }

    fn create_test_work_item(value: f64) -> WorkItem {
        WorkItem {
            id: WorkItemId::new(),
            operation_id: OperationId::new(),
            work_type: WorkType::RiemannZero,
            difficulty: 50,
            value,
            result_digest: [1u8; 32],
            computational_cost: 4.0,
            energy_consumed: 1.0,
            knowledge_created: 2.0,
            miner_id: MinerId::new("miner-1"),
            created_at: 1,
            signer: [0u8; 32],
            signature: [0u8; 64],
        }
    }

    async fn build_chain(h: &Harness, len: usize) -> Vec<Block> {
        let mut blocks = Vec::new();
        for i in 0..len {
            let block = h
                .ledger
                .append_work_item(create_test_work_item(i as f64))
                .await
                .expect("append");
            blocks.push(block);
        }
        blocks
    }

    #[tokio::test]
    async fn test_genesis_and_linkage() {
        let h = create_test_ledger();
        let blocks = build_chain(&h, 4).await;

        assert_eq!(blocks[0].index, 0);
        for pair in blocks.windows(2) {
            assert_eq!(pair[1].previous_hash, pair[0].block_hash);
            assert_eq!(pair[1].index, pair[0].index + 1);
        }
        let head = h.ledger.head().await.unwrap().unwrap();
        assert_eq!(head.block_hash, blocks[3].block_hash);
    }

    #[tokio::test]
    async fn test_stored_merkle_roots_match() {
        let h = create_test_ledger();
        build_chain(&h, 3).await;
        for block in h.store.blocks_from(0, 10).unwrap() {
            assert_eq!(
                shared_crypto::merkle_root(&block.work_item_hashes()),
                block.merkle_root
            );
        }
    }

    #[tokio::test]
    async fn test_stale_prior_is_continuity_error() {
        let h = create_test_ledger();
        let genesis = h
            .ledger
            .create_block(create_test_work_item(1.0), MinerId::new("a"), None)
            .await
            .unwrap();
        h.ledger
            .create_block(create_test_work_item(2.0), MinerId::new("a"), Some(genesis.clone()))
            .await
            .unwrap();

        let err = h
            .ledger
            .create_block(create_test_work_item(3.0), MinerId::new("b"), Some(genesis))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::ChainContinuity { .. }));
        assert!(err.is_recoverable());
        assert_eq!(h.ledger.state().await, ChainState::Running);
        assert_eq!(h.store.block_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_appends_linearize() {
        let h = create_test_ledger();
        build_chain(&h, 1).await;

        let mut handles = Vec::new();
        for i in 0..8 {
            let ledger = h.ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.append_work_item(create_test_work_item(i as f64)).await
            }));
        }
        let mut appended = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => appended += 1,
                Err(e) => assert!(e.is_recoverable(), "unexpected error {e}"),
            }
        }

        let blocks = h.store.blocks_from(0, 100).unwrap();
        assert_eq!(blocks.len(), 1 + appended);
        assert!(crate::domain::verify_chain(&blocks).is_valid());
    }

    #[tokio::test]
    async fn test_duplicate_work_item_refused() {
        let h = create_test_ledger();
        let item = create_test_work_item(1.0);
        h.ledger.append_work_item(item.clone()).await.unwrap();
        let err = h.ledger.append_work_item(item).await.unwrap_err();
        assert!(matches!(err, LedgerError::WorkItemAlreadyIncluded(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_appends_of_one_work_item_land_once() {
        let h = create_test_ledger();
        build_chain(&h, 1).await;
        let item = create_test_work_item(7.0);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = h.ledger.clone();
            let item = item.clone();
            handles.push(tokio::spawn(async move { ledger.append_work_item(item).await }));
        }
        let mut appended = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => appended += 1,
                Err(LedgerError::WorkItemAlreadyIncluded(id)) => assert_eq!(id, item.id),
                Err(e) => assert!(e.is_recoverable(), "unexpected error {e}"),
            }
        }

        let holders = h
            .store
            .blocks_from(0, 100)
            .unwrap()
            .into_iter()
            .filter(|b| b.work_items.iter().any(|w| w.id == item.id))
            .count();
        assert_eq!(appended, 1);
        assert_eq!(holders, 1);
        assert!(h.store.work_item(&item.id).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_malformed_work_item_refused() {
        let h = create_test_ledger();
        let mut item = create_test_work_item(1.0);
        item.difficulty = 0;
        let err = h.ledger.append_work_item(item).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidWorkItem { .. }));
    }

    #[tokio::test]
    async fn test_block_created_event() {
        let h = create_test_ledger();
        let mut sub = h.bus.subscribe(EventFilter::topics(vec![EventTopic::Ledger]));
        let block = build_chain(&h, 1).await.remove(0);

        match sub.try_recv().unwrap() {
            Some(MiningEvent::BlockCreated { block_hash, .. }) => {
                assert_eq!(block_hash, block.block_hash)
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_tampered_chain_halts_until_resume() {
        let mut h = create_test_ledger();
        build_chain(&h, 5).await;
        assert!(h.store.tamper_block(2, |b| b.total_value += 100.0));

        let verification = h.ledger.verify_stored_chain().await.unwrap();
        assert_eq!(verification.first_invalid_index(), Some(2));
        assert_eq!(verification.blocks_checked, 2);
        assert!(h.ledger.state().await.is_halted());
        assert!(matches!(
            h.alerts.try_recv(),
            Ok(OperatorAlert::LedgerHalted { .. })
        ));

        let err = h
            .ledger
            .append_work_item(create_test_work_item(9.0))
            .await
            .unwrap_err();
        assert!(err.is_critical());

        h.ledger.resume().await.unwrap();
        assert_eq!(h.ledger.state().await, ChainState::Running);
    }

    #[tokio::test]
    async fn test_corrupted_head_halts_on_append() {
        let h = create_test_ledger();
        build_chain(&h, 2).await;
        assert!(h.store.tamper_block(1, |b| b.knowledge_created = -1.0));

        let err = h
            .ledger
            .append_work_item(create_test_work_item(1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Halted { .. }));
        assert!(h.ledger.state().await.is_halted());
        assert_eq!(h.store.block_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_verify_clean_chain() {
        let h = create_test_ledger();
        build_chain(&h, 3).await;
        let verification = h.ledger.verify_stored_chain().await.unwrap();
        assert!(verification.is_valid());
        assert_eq!(verification.blocks_checked, 3);
        assert_eq!(h.ledger.state().await, ChainState::Running);
    }
}
