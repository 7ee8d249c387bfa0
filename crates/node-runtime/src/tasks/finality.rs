//! Finality driver and stall sweeper.

use std::sync::Arc;

use async_trait::async_trait;
use pm_07_consensus_orchestrator::OrchestratorApi;
use pm_telemetry::metrics::CANONICAL_HEIGHT;
use shared_types::{short_hex, TimeSource};
use tracing::{debug, info, warn};

use crate::scheduler::PeriodicTask;

/// Advances every pending block as far as consensus allows.
pub struct FinalityDriver {
    orchestrator: Arc<dyn OrchestratorApi>,
}

impl FinalityDriver {
    pub fn new(orchestrator: Arc<dyn OrchestratorApi>) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl PeriodicTask for FinalityDriver {
    async fn run(&self) -> anyhow::Result<()> {
        let results = self.orchestrator.process_pending().await;
        let mut failures = 0usize;
        for (block_hash, result) in &results {
            match result {
                Ok(stage) => debug!(block_hash = %short_hex(block_hash), stage = %stage, "[finality] Processed"),
                Err(e) => {
                    failures += 1;
                    warn!(block_hash = %short_hex(block_hash), error = %e, "[finality] Processing failed");
                }
            }
        }
        CANONICAL_HEIGHT.set(self.orchestrator.canonical_height().await as f64);

        if failures > 0 {
            anyhow::bail!("{failures} of {} blocks failed to process", results.len());
        }
        Ok(())
    }
}

/// Reports consensus rounds that outlived their collection window.
pub struct StallSweeper {
    orchestrator: Arc<dyn OrchestratorApi>,
    clock: Arc<dyn TimeSource>,
}

impl StallSweeper {
    pub fn new(orchestrator: Arc<dyn OrchestratorApi>, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            orchestrator,
            clock,
        }
    }
}

#[async_trait]
impl PeriodicTask for StallSweeper {
    async fn run(&self) -> anyhow::Result<()> {
        let reports = self
            .orchestrator
            .sweep_stalled(self.clock.now_millis())
            .await?;
        if !reports.is_empty() {
            info!(stalled = reports.len(), "[stall] Stalled rounds reported to operator");
        }
        Ok(())
    }
}
