//! # Mining Tasks
//!
//! - `AutonomousMiner`: keeps a miner's operations topped up.
//! - `MiningTicker`: the clock the coordinator does not own. Each run
//!   advances every active operation by the share of its estimated
//!   duration one tick represents, and sends fresh work items down the
//!   pipeline.
//! - `OperationPruner`: drops long-finished operations.

use std::sync::Arc;

use async_trait::async_trait;
use pm_03_mining_coordinator::{
    CompletionOutcome, MiningApi, MiningError, MiningRequest, OperationSnapshot, OperationState,
    TickOutcome,
};
use rand::Rng;
use shared_types::{MinerId, TimeSource, WorkType};
use tracing::{debug, info, warn};

use crate::container::RuntimeConfig;
use crate::scheduler::PeriodicTask;
use crate::tasks::pipeline::MiningPipeline;

/// Work types that get a dedicated miner, in roster order.
const SPECIALISATIONS: [WorkType; 5] = [
    WorkType::RiemannZero,
    WorkType::PrimePattern,
    WorkType::YangMills,
    WorkType::NavierStokes,
    WorkType::GoldbachVerification,
];

/// One autonomous miner.
pub struct AutonomousMiner {
    miner_id: MinerId,
    specialization: Option<WorkType>,
    difficulty: (u32, u32),
    max_in_flight: usize,
    mining: Arc<dyn MiningApi>,
}

impl AutonomousMiner {
    /// The configured roster: specialists first, then generalists.
    pub fn roster(config: &RuntimeConfig, mining: &Arc<dyn MiningApi>) -> Vec<AutonomousMiner> {
        (0..config.autonomous_miners)
            .map(|i| match SPECIALISATIONS.get(i) {
                Some(work_type) => AutonomousMiner {
                    miner_id: MinerId::new(format!("autonomous-{}", work_type.as_str())),
                    specialization: Some(*work_type),
                    difficulty: config.specialist_difficulty,
                    max_in_flight: config.operations_per_miner,
                    mining: Arc::clone(mining),
                },
                None => AutonomousMiner {
                    miner_id: MinerId::new(format!(
                        "autonomous-general-{}",
                        i + 1 - SPECIALISATIONS.len()
                    )),
                    specialization: None,
                    difficulty: config.generalist_difficulty,
                    max_in_flight: config.operations_per_miner,
                    mining: Arc::clone(mining),
                },
            })
            .collect()
    }

    pub fn miner_id(&self) -> &MinerId {
        &self.miner_id
    }

    pub fn specialization(&self) -> Option<WorkType> {
        self.specialization
    }

    fn next_request(&self) -> MiningRequest {
        let mut rng = rand::thread_rng();
        let work_type = self
            .specialization
            .unwrap_or_else(|| WorkType::ALL[rng.gen_range(0..WorkType::ALL.len())]);
        let (min, max) = self.difficulty;
        MiningRequest {
            work_type,
            difficulty: rng.gen_range(min..=max.max(min)),
            miner_id: self.miner_id.clone(),
        }
    }
}

#[async_trait]
impl PeriodicTask for AutonomousMiner {
    async fn run(&self) -> anyhow::Result<()> {
        let in_flight = self
            .mining
            .active_operations()
            .await
            .iter()
            .filter(|op| op.miner_id == self.miner_id)
            .count();
        if in_flight >= self.max_in_flight {
            return Ok(());
        }

        let request = self.next_request();
        match self.mining.start_operation(request).await {
            Ok(op) => {
                info!(
                    miner = %self.miner_id,
                    work_type = %op.work_type,
                    difficulty = op.difficulty,
                    "[miner] Operation started"
                );
                Ok(())
            }
            Err(MiningError::CapacityExceeded { limit }) => {
                debug!(miner = %self.miner_id, limit, "[miner] Coordinator at capacity");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Progress delta one tick of `tick_ms` represents for `op`.
pub fn tick_delta(op: &OperationSnapshot, tick_ms: u64) -> f64 {
    let span = op.estimated_completion.saturating_sub(op.started_at).max(1);
    tick_ms as f64 / span as f64
}

pub struct MiningTicker {
    mining: Arc<dyn MiningApi>,
    pipeline: Arc<MiningPipeline>,
    tick_ms: u64,
}

impl MiningTicker {
    pub fn new(mining: Arc<dyn MiningApi>, pipeline: Arc<MiningPipeline>, tick_ms: u64) -> Self {
        Self {
            mining,
            pipeline,
            tick_ms,
        }
    }
}

#[async_trait]
impl PeriodicTask for MiningTicker {
    async fn run(&self) -> anyhow::Result<()> {
        self.pipeline.flush().await;

        let mut failures = 0usize;
        for op in self.mining.active_operations().await {
            if op.state != OperationState::Active {
                continue;
            }
            match self.mining.tick(op.id, tick_delta(&op, self.tick_ms)).await {
                Ok(TickOutcome::Completion(CompletionOutcome::Emitted(item))) => {
                    // Pipeline errors are logged there and retried from its backlog.
                    let _ = self.pipeline.commit(item).await;
                }
                Ok(_) => {}
                Err(e) if e.is_terminal() => {
                    debug!(operation = %op.id, error = %e, "[ticker] Operation ended");
                }
                Err(e) => {
                    failures += 1;
                    warn!(operation = %op.id, error = %e, "[ticker] Tick failed");
                }
            }
        }

        if failures > 0 {
            anyhow::bail!("{failures} operations failed to tick");
        }
        Ok(())
    }
}

pub struct OperationPruner {
    mining: Arc<dyn MiningApi>,
    clock: Arc<dyn TimeSource>,
    retain_ms: u64,
}

impl OperationPruner {
    pub fn new(mining: Arc<dyn MiningApi>, clock: Arc<dyn TimeSource>, retain_ms: u64) -> Self {
        Self {
            mining,
            clock,
            retain_ms,
        }
    }
}

#[async_trait]
impl PeriodicTask for OperationPruner {
    async fn run(&self) -> anyhow::Result<()> {
        let cutoff = self.clock.now_millis().saturating_sub(self.retain_ms);
        let removed = self.mining.prune_finished(cutoff).await;
        if removed > 0 {
            debug!(removed, "[pruner] Finished operations dropped");
        }
        Ok(())
    }
}
