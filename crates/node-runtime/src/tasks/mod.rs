//! # Runtime Tasks
//!
//! Everything the node does on a clock, registered with the scheduler by
//! name:
//!
//! | Task | Does |
//! |------|------|
//! | `miner:<id>` | keeps one autonomous miner busy |
//! | `mining-ticker` | advances operations, commits completed work |
//! | `validator-rounds` | submits PoS and PoR validations |
//! | `finality-driver` | advances block finality |
//! | `stall-sweeper` | reports stalled consensus rounds |
//! | `network-metrics` | publishes a metrics snapshot |
//! | `health-check` | logs activity warnings |
//! | `operation-pruner` | drops long-finished operations |

pub mod finality;
pub mod metrics;
pub mod miners;
pub mod pipeline;
pub mod validators;

use std::sync::Arc;
use std::time::Duration;

pub use finality::{FinalityDriver, StallSweeper};
pub use metrics::{collect_snapshot, HealthCheck, HealthReport, HealthWarning, NetworkMetricsTask, NetworkSnapshot};
pub use miners::{AutonomousMiner, MiningTicker, OperationPruner};
pub use pipeline::{Committed, MiningPipeline, PipelineError};
pub use validators::{RoundStats, ValidatorRounds};

use crate::container::NodeContainer;
use crate::scheduler::{Scheduler, SchedulerError};

pub const MINING_TICKER: &str = "mining-ticker";
pub const VALIDATOR_ROUNDS: &str = "validator-rounds";
pub const FINALITY_DRIVER: &str = "finality-driver";
pub const STALL_SWEEPER: &str = "stall-sweeper";
pub const NETWORK_METRICS: &str = "network-metrics";
pub const HEALTH_CHECK: &str = "health-check";
pub const OPERATION_PRUNER: &str = "operation-pruner";

pub fn miner_task_name(miner: &AutonomousMiner) -> String {
    format!("miner:{}", miner.miner_id())
}

/// Register every runtime task. Returns the scheduled names.
pub fn register_tasks(
    container: &NodeContainer,
    scheduler: &Scheduler,
    pipeline: Arc<MiningPipeline>,
) -> Result<Vec<String>, SchedulerError> {
    let runtime = &container.config.runtime;
    let every = Duration::from_millis;

    for miner in AutonomousMiner::roster(runtime, &container.mining) {
        scheduler.schedule(
            miner_task_name(&miner),
            every(runtime.miner_interval_ms),
            Arc::new(miner),
        )?;
    }

    scheduler.schedule(
        MINING_TICKER,
        every(runtime.tick_interval_ms),
        Arc::new(MiningTicker::new(
            Arc::clone(&container.mining),
            pipeline,
            runtime.tick_interval_ms,
        )),
    )?;

    scheduler.schedule(
        VALIDATOR_ROUNDS,
        every(runtime.validator_interval_ms),
        Arc::new(ValidatorRounds::new(
            Arc::clone(&container.ledger),
            Arc::clone(&container.stake),
            Arc::clone(&container.research),
            Arc::clone(&container.orchestrator),
            container.config.orchestrator.max_blocks_per_pass,
        )),
    )?;

    scheduler.schedule(
        FINALITY_DRIVER,
        every(runtime.finality_interval_ms),
        Arc::new(FinalityDriver::new(Arc::clone(&container.orchestrator))),
    )?;

    scheduler.schedule(
        STALL_SWEEPER,
        every(runtime.stall_sweep_interval_ms),
        Arc::new(StallSweeper::new(
            Arc::clone(&container.orchestrator),
            Arc::clone(&container.clock),
        )),
    )?;

    scheduler.schedule(
        NETWORK_METRICS,
        every(runtime.metrics_interval_ms),
        Arc::new(NetworkMetricsTask::new(
            Arc::clone(&container.mining),
            Arc::clone(&container.ledger),
            container.event_bus.clone(),
            Arc::clone(&container.clock),
        )),
    )?;

    scheduler.schedule(
        HEALTH_CHECK,
        every(runtime.health_interval_ms),
        Arc::new(HealthCheck::new(
            Arc::clone(&container.mining),
            Arc::clone(&container.ledger),
            Arc::clone(&container.clock),
            runtime.health_min_active_operations,
            runtime.health_block_window_ms,
        )),
    )?;

    scheduler.schedule(
        OPERATION_PRUNER,
        every(runtime.prune_interval_ms),
        Arc::new(OperationPruner::new(
            Arc::clone(&container.mining),
            Arc::clone(&container.clock),
            runtime.prune_after_ms,
        )),
    )?;

    Ok(scheduler.task_names())
}
