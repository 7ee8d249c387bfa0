//! Mining coordinator service.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_bus::{EventPublisher, MiningEvent};
use shared_crypto::Ed25519KeyPair;
use shared_types::{OperationId, TimeSource, WorkItem, WorkItemId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::MiningConfig;
use crate::domain::{
    MiningOperation, OperationSnapshot, OperationState, ValueScorer, WorkSynthesizer,
};
use crate::error::{MiningError, MiningResult};
use crate::ports::inbound::{
    CancelOutcome, CompletionOutcome, MiningApi, MiningRequest, TickOutcome,
};

/// Coordinates concurrent mining operations.
///
/// The map lock is held only to look operations up; every state change
/// goes through the operation's own atomics.
pub struct MiningCoordinator {
    operations: RwLock<HashMap<OperationId, Arc<MiningOperation>>>,
    synthesizer: Arc<dyn WorkSynthesizer>,
    scorer: Arc<dyn ValueScorer>,
    signer: Arc<Ed25519KeyPair>,
    events: Arc<dyn EventPublisher>,
    clock: Arc<dyn TimeSource>,
    config: MiningConfig,
}

impl MiningCoordinator {
    pub fn new(
        synthesizer: Arc<dyn WorkSynthesizer>,
        scorer: Arc<dyn ValueScorer>,
        signer: Arc<Ed25519KeyPair>,
        events: Arc<dyn EventPublisher>,
        clock: Arc<dyn TimeSource>,
        config: MiningConfig,
    ) -> Self {
        Self {
            operations: RwLock::new(HashMap::new()),
            synthesizer,
            scorer,
            signer,
            events,
            clock,
            config,
        }
    }

    fn lookup(&self, id: OperationId) -> MiningResult<Arc<MiningOperation>> {
        self.operations
            .read()
            .get(&id)
            .cloned()
            .ok_or(MiningError::OperationNotFound(id))
    }

    /// Map a lost completion guard to the outcome the caller should see.
    fn settled_outcome(op: &MiningOperation) -> MiningResult<CompletionOutcome> {
        match op.state() {
            OperationState::Completed => match op.result() {
                Some(item) => Ok(CompletionOutcome::AlreadyEmitted(item.clone())),
                None => Ok(CompletionOutcome::InProgress),
            },
            OperationState::Completing | OperationState::Active => {
                Ok(CompletionOutcome::InProgress)
            }
            OperationState::Cancelled => Err(MiningError::OperationCancelled(op.id)),
            OperationState::Failed => Err(MiningError::OperationFailed {
                id: op.id,
                reason: op.failure().unwrap_or("unknown").to_string(),
            }),
        }
    }

    /// Runs only for the caller that won the completion guard.
    async fn run_completion(&self, op: &MiningOperation) -> MiningResult<CompletionOutcome> {
        let work = match self
            .synthesizer
            .synthesize(&op.id, op.work_type, op.difficulty)
        {
            Ok(work) => work,
            Err(e) => {
                let reason = e.to_string();
                op.fail(reason.clone(), self.clock.now_millis());
                warn!(operation = %op.id, reason = %reason, "[pm-03] Work synthesis failed");
                self.events
                    .publish(MiningEvent::MiningOperationFailed {
                        operation_id: op.id,
                        reason: reason.clone(),
                    })
                    .await;
                return Err(MiningError::SynthesisFailed { id: op.id, reason });
            }
        };

        let value = self.scorer.score(op.work_type, op.difficulty, &work);
        let now = self.clock.now_millis();
        let mut item = WorkItem {
            id: WorkItemId::new(),
            operation_id: op.id,
            work_type: op.work_type,
            difficulty: op.difficulty,
            value,
            result_digest: work.result_digest,
            computational_cost: work.computational_cost,
            energy_consumed: work.energy_consumed,
            knowledge_created: work.knowledge_created,
            miner_id: op.miner_id.clone(),
            created_at: now,
            signer: self.signer.public_key().to_bytes(),
            signature: [0u8; 64],
        };
        item.signature = self.signer.sign(&item.content_hash()).to_bytes();

        if op.publish_result(item.clone(), now).is_err() {
            return Err(MiningError::DuplicateCompletion(op.id));
        }

        info!(
            operation = %op.id,
            work_item = %item.id,
            work_type = %item.work_type,
            value = item.value,
            summary = %work.summary,
            "[pm-03] Work item created"
        );
        self.events
            .publish(MiningEvent::WorkItemCreated {
                operation_id: op.id,
                work_item_id: item.id,
                work_type: item.work_type,
                value: item.value,
            })
            .await;
        Ok(CompletionOutcome::Emitted(item))
    }
}

#[async_trait]
impl MiningApi for MiningCoordinator {
    async fn start_operation(&self, request: MiningRequest) -> MiningResult<OperationSnapshot> {
        let (min, max) = (self.config.min_difficulty, self.config.max_difficulty);
        if !(min..=max).contains(&request.difficulty) {
            return Err(MiningError::InvalidDifficulty {
                difficulty: request.difficulty,
                min,
                max,
            });
        }

        let now = self.clock.now_millis();
        let estimated = now + u64::from(request.difficulty) * self.config.millis_per_difficulty;
        let op = Arc::new(MiningOperation::new(
            request.work_type,
            request.difficulty,
            request.miner_id,
            now,
            estimated,
        ));

        {
            let mut ops = self.operations.write();
            let in_flight = ops.values().filter(|o| o.state().is_in_flight()).count();
            if in_flight >= self.config.max_active_operations {
                return Err(MiningError::CapacityExceeded {
                    limit: self.config.max_active_operations,
                });
            }
            ops.insert(op.id, op.clone());
        }

        info!(
            operation = %op.id,
            work_type = %op.work_type,
            difficulty = op.difficulty,
            miner = %op.miner_id,
            "[pm-03] Mining operation started"
        );
        self.events
            .publish(MiningEvent::MiningOperationStarted {
                operation_id: op.id,
                work_type: op.work_type,
                difficulty: op.difficulty,
                miner_id: op.miner_id.clone(),
                estimated_completion: estimated,
            })
            .await;
        Ok(op.snapshot())
    }

    async fn tick(&self, id: OperationId, delta: f64) -> MiningResult<TickOutcome> {
        if !delta.is_finite() || delta < 0.0 {
            return Err(MiningError::InvalidProgress(delta));
        }
        let op = self.lookup(id)?;

        let Some(progress) = op.advance(delta) else {
            return Self::settled_outcome(&op).map(TickOutcome::Completion);
        };
        self.events
            .publish(MiningEvent::MiningProgress {
                operation_id: id,
                progress,
            })
            .await;

        if progress >= 1.0 {
            return self.complete(id).await.map(TickOutcome::Completion);
        }
        Ok(TickOutcome::Progressed(progress))
    }

    async fn complete(&self, id: OperationId) -> MiningResult<CompletionOutcome> {
        let op = self.lookup(id)?;
        if !op.try_begin_completion() {
            debug!(operation = %id, state = ?op.state(), "[pm-03] Completion guard already taken");
            return Self::settled_outcome(&op);
        }
        self.run_completion(&op).await
    }

    async fn cancel(&self, id: OperationId) -> MiningResult<CancelOutcome> {
        let op = self.lookup(id)?;
        if !op.try_cancel(self.clock.now_millis()) {
            debug!(operation = %id, state = ?op.state(), "[pm-03] Cancel was a no-op");
            return Ok(CancelOutcome::NoOpCancellation);
        }
        info!(operation = %id, progress = op.progress(), "[pm-03] Mining operation cancelled");
        self.events
            .publish(MiningEvent::MiningOperationCancelled { operation_id: id })
            .await;
        Ok(CancelOutcome::Cancelled)
    }

    async fn operation(&self, id: OperationId) -> Option<OperationSnapshot> {
        self.operations.read().get(&id).map(|op| op.snapshot())
    }

    async fn active_operations(&self) -> Vec<OperationSnapshot> {
        let mut active: Vec<_> = self
            .operations
            .read()
            .values()
            .filter(|op| op.state().is_in_flight())
            .map(|op| op.snapshot())
            .collect();
        active.sort_by_key(|s| s.started_at);
        active
    }

    async fn prune_finished(&self, before: u64) -> usize {
        let mut ops = self.operations.write();
        let len = ops.len();
        ops.retain(|_, op| !op.finished_at().is_some_and(|t| t < before));
        len - ops.len()
    }
}
