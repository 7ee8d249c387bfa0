//! # Network Metrics and Health
//!
//! Both read the same inputs: in-flight operations and the most recent
//! blocks. Metrics publish a `NetworkMetrics` event and set gauges; health
//! only logs.

use std::sync::Arc;

use async_trait::async_trait;
use pm_02_blockchain_ledger::{LedgerApi, LedgerResult};
use pm_03_mining_coordinator::MiningApi;
use pm_telemetry::metrics::{ACTIVE_OPERATIONS, CHAIN_HEIGHT, NETWORK_HASHRATE};
use serde::{Deserialize, Serialize};
use shared_bus::{EventPublisher, MiningEvent};
use shared_types::{ChainState, TimeSource};
use tracing::{info, warn};

use crate::scheduler::PeriodicTask;

/// Blocks considered for rates and totals.
pub const METRICS_WINDOW_BLOCKS: usize = 100;

const HOUR_MS: u64 = 3_600_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub active_operations: usize,
    pub blocks_per_hour: f64,
    pub average_block_time_secs: f64,
    pub value_last_hour: f64,
    /// `sum(difficulty) * 1000` over active operations.
    pub network_hashrate: u64,
    pub total_knowledge_created: f64,
    pub chain_height: Option<u64>,
}

impl NetworkSnapshot {
    pub fn to_event(&self) -> MiningEvent {
        MiningEvent::NetworkMetrics {
            active_operations: self.active_operations,
            blocks_per_hour: self.blocks_per_hour,
            average_block_time_secs: self.average_block_time_secs,
            value_last_hour: self.value_last_hour,
            network_hashrate: self.network_hashrate,
            total_knowledge_created: self.total_knowledge_created,
        }
    }
}

/// Build a snapshot as of `now`.
pub async fn collect_snapshot(
    mining: &dyn MiningApi,
    ledger: &dyn LedgerApi,
    now: u64,
) -> LedgerResult<NetworkSnapshot> {
    let operations = mining.active_operations().await;
    let blocks = ledger.recent_blocks(METRICS_WINDOW_BLOCKS).await?;

    let last_hour: Vec<_> = blocks
        .iter()
        .filter(|b| now.saturating_sub(b.timestamp) < HOUR_MS)
        .collect();
    let blocks_per_hour = last_hour.len() as f64;
    let average_block_time_secs = if last_hour.is_empty() {
        0.0
    } else {
        3600.0 / blocks_per_hour
    };

    Ok(NetworkSnapshot {
        active_operations: operations.len(),
        blocks_per_hour,
        average_block_time_secs,
        value_last_hour: last_hour.iter().map(|b| b.total_value).sum(),
        network_hashrate: operations
            .iter()
            .map(|op| u64::from(op.difficulty))
            .sum::<u64>()
            * 1000,
        total_knowledge_created: blocks.iter().map(|b| b.knowledge_created).sum(),
        chain_height: blocks.first().map(|b| b.index),
    })
}

pub struct NetworkMetricsTask {
    mining: Arc<dyn MiningApi>,
    ledger: Arc<dyn LedgerApi>,
    events: Arc<dyn EventPublisher>,
    clock: Arc<dyn TimeSource>,
}

impl NetworkMetricsTask {
    pub fn new(
        mining: Arc<dyn MiningApi>,
        ledger: Arc<dyn LedgerApi>,
        events: Arc<dyn EventPublisher>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            mining,
            ledger,
            events,
            clock,
        }
    }
}

#[async_trait]
impl PeriodicTask for NetworkMetricsTask {
    async fn run(&self) -> anyhow::Result<()> {
        let snapshot =
            collect_snapshot(self.mining.as_ref(), self.ledger.as_ref(), self.clock.now_millis())
                .await?;

        ACTIVE_OPERATIONS.set(snapshot.active_operations as f64);
        NETWORK_HASHRATE.set(snapshot.network_hashrate as f64);
        if let Some(height) = snapshot.chain_height {
            CHAIN_HEIGHT.set(height as f64);
        }

        self.events.publish(snapshot.to_event()).await;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HealthWarning {
    LowMiningActivity { active: usize, floor: usize },
    NoRecentBlocks { window_ms: u64 },
    LedgerHalted { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub active_operations: usize,
    /// Age of the newest block, `None` before the first block.
    pub last_block_age_ms: Option<u64>,
    pub warnings: Vec<HealthWarning>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.warnings.is_empty()
    }
}

pub struct HealthCheck {
    mining: Arc<dyn MiningApi>,
    ledger: Arc<dyn LedgerApi>,
    clock: Arc<dyn TimeSource>,
    min_active_operations: usize,
    block_window_ms: u64,
}

impl HealthCheck {
    pub fn new(
        mining: Arc<dyn MiningApi>,
        ledger: Arc<dyn LedgerApi>,
        clock: Arc<dyn TimeSource>,
        min_active_operations: usize,
        block_window_ms: u64,
    ) -> Self {
        Self {
            mining,
            ledger,
            clock,
            min_active_operations,
            block_window_ms,
        }
    }

    pub async fn check(&self) -> LedgerResult<HealthReport> {
        let now = self.clock.now_millis();
        let active = self.mining.active_operations().await.len();
        let last_block_age_ms = self
            .ledger
            .head()
            .await?
            .map(|head| now.saturating_sub(head.timestamp));

        let mut warnings = Vec::new();
        if active < self.min_active_operations {
            warnings.push(HealthWarning::LowMiningActivity {
                active,
                floor: self.min_active_operations,
            });
        }
        if last_block_age_ms.map_or(true, |age| age >= self.block_window_ms) {
            warnings.push(HealthWarning::NoRecentBlocks {
                window_ms: self.block_window_ms,
            });
        }
        if let ChainState::HaltedAwaitingIntervention { reason } = self.ledger.state().await {
            warnings.push(HealthWarning::LedgerHalted { reason });
        }

        Ok(HealthReport {
            active_operations: active,
            last_block_age_ms,
            warnings,
        })
    }
}

#[async_trait]
impl PeriodicTask for HealthCheck {
    async fn run(&self) -> anyhow::Result<()> {
        let report = self.check().await?;
        info!(
            active_operations = report.active_operations,
            last_block_age_ms = ?report.last_block_age_ms,
            "[health] Check complete"
        );
        for warning in &report.warnings {
            match warning {
                HealthWarning::LowMiningActivity { active, floor } => {
                    warn!(active, floor, "[health] Low mining activity");
                }
                HealthWarning::NoRecentBlocks { window_ms } => {
                    warn!(window_ms, "[health] No recent blocks");
                }
                HealthWarning::LedgerHalted { reason } => {
                    warn!(reason = %reason, "[health] Ledger halted");
                }
            }
        }
        Ok(())
    }
}
