//! Consensus orchestrator service.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use pm_04_stake_consensus::{StakeConsensusApi, StakeError};
use pm_05_research_consensus::ResearchConsensusApi;
use pm_06_immutable_records::{ActivityEvent, RecordChainApi};
use serde_json::json;
use shared_bus::{EventPublisher, MiningEvent, OperatorChannel};
use shared_types::{
    short_hex, Block, ChainId, FinalDecision, FinalityStage, Hash, OperatorAlert, StallReport,
    TimeSource,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::OrchestratorConfig;
use crate::domain::{
    combine_stake, proof_of_work_fault, BlockFinality, FinalityTracker, RejectedBlock,
    StakeVerdict,
};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::ports::inbound::OrchestratorApi;

/// Drives each registered block through
/// `Provisional -> Staked -> Certified -> Immutable`, or to `Rejected`.
///
/// Every block has its own async lock, held while its consensus state is
/// read and its records are written, so two drivers never advance the same
/// block concurrently.
pub struct ConsensusOrchestrator {
    stake: Arc<dyn StakeConsensusApi>,
    research: Arc<dyn ResearchConsensusApi>,
    records: Arc<dyn RecordChainApi>,
    events: Arc<dyn EventPublisher>,
    operator: Arc<dyn OperatorChannel>,
    clock: Arc<dyn TimeSource>,
    config: OrchestratorConfig,
    trackers: Mutex<HashMap<Hash, Arc<tokio::sync::Mutex<FinalityTracker>>>>,
    /// Snapshots mirrored after every transition for lock-free queries.
    snapshots: RwLock<HashMap<Hash, BlockFinality>>,
}

impl ConsensusOrchestrator {
    pub fn new(
        stake: Arc<dyn StakeConsensusApi>,
        research: Arc<dyn ResearchConsensusApi>,
        records: Arc<dyn RecordChainApi>,
        events: Arc<dyn EventPublisher>,
        operator: Arc<dyn OperatorChannel>,
        clock: Arc<dyn TimeSource>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            stake,
            research,
            records,
            events,
            operator,
            clock,
            config,
            trackers: Mutex::new(HashMap::new()),
            snapshots: RwLock::new(HashMap::new()),
        }
    }

    fn finality_chain(&self) -> ChainId {
        ChainId::new(self.config.finality_chain.as_str())
    }

    async fn stake_verdict(&self, tracker: &FinalityTracker) -> OrchestratorResult<StakeVerdict> {
        let mut results = Vec::with_capacity(tracker.work_items.len());
        for id in &tracker.work_items {
            results.push((*id, self.stake.finalize(*id).await?));
        }
        Ok(combine_stake(&results))
    }

    /// Apply `next` and announce it.
    async fn transition(
        &self,
        tracker: &mut FinalityTracker,
        next: FinalityStage,
    ) -> OrchestratorResult<()> {
        tracker.advance(next, self.clock.now_millis())?;
        self.snapshots
            .write()
            .insert(tracker.block_hash, tracker.snapshot());
        info!(
            block = %short_hex(&tracker.block_hash),
            index = tracker.index,
            stage = %tracker.stage,
            "[pm-07] Finality advanced"
        );
        self.events
            .publish(MiningEvent::FinalityAdvanced {
                block_hash: tracker.block_hash,
                index: tracker.index,
                stage: tracker.stage.clone(),
            })
            .await;
        Ok(())
    }

    async fn certify(&self, tracker: &mut FinalityTracker) -> OrchestratorResult<()> {
        let mut stake = Vec::with_capacity(tracker.work_items.len());
        for id in &tracker.work_items {
            let result = self.stake.aggregate(*id).await?;
            stake.push(json!({
                "work_item": id.0.to_string(),
                "approval_ratio": result.approval_ratio,
                "validations": result.validations,
            }));
        }
        let research = self.research.status(tracker.block_hash).await?;
        let event = ActivityEvent::new(
            "block_certified",
            json!({
                "block_hash": hex::encode(tracker.block_hash),
                "index": tracker.index,
                "stake": stake,
                "research": {
                    "approval_rate": research.approval_ratio,
                    "average_quality": research.average_quality,
                    "validations": research.validations,
                },
            }),
        );
        self.records.append(&self.finality_chain(), event).await?;
        self.transition(tracker, FinalityStage::Immutable).await?;
        self.apply_dispositions(tracker, true).await;
        Ok(())
    }

    async fn reject(&self, tracker: &mut FinalityTracker, reason: String) -> OrchestratorResult<()> {
        let event = ActivityEvent::new(
            "block_rejected",
            json!({
                "block_hash": hex::encode(tracker.block_hash),
                "index": tracker.index,
                "stage": tracker.stage.to_string(),
                "reason": reason,
            }),
        );
        self.records.append(&self.finality_chain(), event).await?;
        self.transition(
            tracker,
            FinalityStage::Rejected {
                reason: reason.clone(),
            },
        )
        .await?;
        warn!(
            block = %short_hex(&tracker.block_hash),
            index = tracker.index,
            reason = %reason,
            "[pm-07] Block rejected"
        );
        self.events
            .publish(MiningEvent::BlockRejected {
                block_hash: tracker.block_hash,
                index: tracker.index,
                reason,
            })
            .await;
        self.apply_dispositions(tracker, false).await;
        Ok(())
    }

    /// Settle stake reputation once the block's fate is known and keep
    /// the changes on the reputation chain.
    ///
    /// Runs after the terminal transition, so failures are logged rather
    /// than returned.
    async fn apply_dispositions(&self, tracker: &FinalityTracker, confirmed: bool) {
        let mut changes = Vec::new();
        for id in &tracker.work_items {
            match self.stake.apply_disposition(*id, confirmed).await {
                Ok(applied) => changes.extend(applied),
                Err(StakeError::NotFinalized(target)) => {
                    debug!(target = %target, "[pm-07] No finalized stake round to settle");
                }
                Err(e) => {
                    warn!(work_item = %id, error = %e, "[pm-07] Reputation disposition failed");
                }
            }
        }
        if changes.is_empty() {
            return;
        }

        let events = changes
            .iter()
            .map(|change| {
                ActivityEvent::new(
                    "reputation_adjusted",
                    json!({
                        "validator": change.validator_id.as_str(),
                        "before": change.before,
                        "after": change.after,
                        "block_hash": hex::encode(tracker.block_hash),
                        "confirmed": confirmed,
                    }),
                )
            })
            .collect();
        let chain = ChainId::new(self.config.reputation_chain.as_str());
        if let Err(e) = self.records.append_batch(&chain, events).await {
            warn!(error = %e, "[pm-07] Reputation records not written");
        }
    }
}

#[async_trait]
impl OrchestratorApi for ConsensusOrchestrator {
    async fn register_block(&self, block: &Block) -> OrchestratorResult<FinalityStage> {
        let tracker = {
            let mut trackers = self.trackers.lock();
            if trackers.contains_key(&block.block_hash) {
                return Err(OrchestratorError::AlreadyRegistered(block.block_hash));
            }
            let tracker = FinalityTracker::register(block, self.clock.now_millis());
            self.snapshots
                .write()
                .insert(block.block_hash, tracker.snapshot());
            let tracker = Arc::new(tokio::sync::Mutex::new(tracker));
            trackers.insert(block.block_hash, tracker.clone());
            tracker
        };

        let mut tracker = tracker.lock().await;
        debug!(
            block = %short_hex(&block.block_hash),
            index = block.index,
            "[pm-07] Block registered"
        );
        self.events
            .publish(MiningEvent::FinalityAdvanced {
                block_hash: block.block_hash,
                index: block.index,
                stage: FinalityStage::Provisional,
            })
            .await;

        if let Some(fault) = proof_of_work_fault(block) {
            self.reject(&mut tracker, format!("proof of work invalid: {fault}"))
                .await?;
        }
        Ok(tracker.stage.clone())
    }

    async fn process(&self, block_hash: Hash) -> OrchestratorResult<FinalityStage> {
        let tracker = self
            .trackers
            .lock()
            .get(&block_hash)
            .cloned()
            .ok_or(OrchestratorError::UnknownBlock(block_hash))?;
        let mut tracker = tracker.lock().await;

        loop {
            match tracker.stage {
                FinalityStage::Provisional => match self.stake_verdict(&tracker).await? {
                    StakeVerdict::Pending => break,
                    StakeVerdict::Approved => {
                        self.transition(&mut tracker, FinalityStage::Staked).await?;
                    }
                    StakeVerdict::Rejected(id) => {
                        self.reject(&mut tracker, format!("stake consensus rejected work item {id}"))
                            .await?;
                    }
                },
                FinalityStage::Staked => {
                    let result = self.research.status(block_hash).await?;
                    match result.decision() {
                        None => break,
                        Some(FinalDecision::Accepted) => {
                            self.transition(&mut tracker, FinalityStage::Certified)
                                .await?;
                        }
                        Some(FinalDecision::Rejected) => {
                            let reason = format!(
                                "research consensus rejected block (approval {:.3}, quality {:.1})",
                                result.approval_ratio,
                                result.average_quality.unwrap_or(0.0)
                            );
                            self.reject(&mut tracker, reason).await?;
                        }
                    }
                }
                FinalityStage::Certified => self.certify(&mut tracker).await?,
                FinalityStage::Immutable | FinalityStage::Rejected { .. } => break,
            }
        }
        Ok(tracker.stage.clone())
    }

    async fn process_pending(&self) -> Vec<(Hash, OrchestratorResult<FinalityStage>)> {
        let pending = self.pending_blocks().await;
        let mut outcomes = Vec::new();
        for block in pending.into_iter().take(self.config.max_blocks_per_pass) {
            let outcome = self.process(block.block_hash).await;
            if let Err(e) = &outcome {
                warn!(block = %short_hex(&block.block_hash), error = %e, "[pm-07] Finality step failed");
            }
            outcomes.push((block.block_hash, outcome));
        }
        outcomes
    }

    async fn stage(&self, block_hash: Hash) -> Option<FinalityStage> {
        self.snapshots.read().get(&block_hash).map(|s| s.stage.clone())
    }

    async fn finality(&self, block_hash: Hash) -> Option<BlockFinality> {
        self.snapshots.read().get(&block_hash).cloned()
    }

    async fn pending_blocks(&self) -> Vec<BlockFinality> {
        let mut pending: Vec<BlockFinality> = self
            .snapshots
            .read()
            .values()
            .filter(|s| !s.stage.is_terminal())
            .cloned()
            .collect();
        pending.sort_by_key(|s| s.index);
        pending
    }

    async fn canonical_height(&self) -> u64 {
        self.snapshots
            .read()
            .values()
            .filter(|s| !s.stage.is_rejected())
            .count() as u64
    }

    async fn rejected_blocks(&self) -> Vec<RejectedBlock> {
        let mut rejected: Vec<RejectedBlock> = self
            .snapshots
            .read()
            .values()
            .filter_map(|s| match &s.stage {
                FinalityStage::Rejected { reason } => Some(RejectedBlock {
                    block_hash: s.block_hash,
                    index: s.index,
                    reason: reason.clone(),
                }),
                _ => None,
            })
            .collect();
        rejected.sort_by_key(|r| r.index);
        rejected
    }

    async fn sweep_stalled(&self, now: u64) -> OrchestratorResult<Vec<StallReport>> {
        let mut reports = self.stake.sweep_stalled(now).await?;
        reports.extend(self.research.sweep_stalled(now).await?);
        for report in &reports {
            self.operator
                .report(OperatorAlert::ConsensusTimeout(report.clone()));
        }
        Ok(reports)
    }
}
