//! # Node Configuration
//!
//! One `NodeConfig` aggregates every subsystem's configuration plus the
//! runtime's task cadence and the genesis validator roster.
//!
//! Values start from `Default` and are overridden from `PM_*` environment
//! variables. A variable that does not parse is logged and ignored; the
//! default stays in place. `validate()` rejects combinations the node
//! cannot make progress with.

use std::fmt::Display;
use std::str::FromStr;

use pm_02_blockchain_ledger::LedgerConfig;
use pm_03_mining_coordinator::MiningConfig;
use pm_04_stake_consensus::StakeConfig;
use pm_05_research_consensus::ResearchConfig;
use pm_06_immutable_records::RecordConfig;
use pm_07_consensus_orchestrator::OrchestratorConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{info, warn};

use crate::genesis::GenesisConfig;

/// Complete node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    pub node: NodeSettings,
    pub ledger: LedgerConfig,
    pub mining: MiningConfig,
    pub stake: StakeConfig,
    pub research: ResearchConfig,
    pub records: RecordConfig,
    pub orchestrator: OrchestratorConfig,
    pub runtime: RuntimeConfig,
    pub genesis: GenesisConfig,
}

/// Node identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSettings {
    /// Passphrase the node signing key is derived from. `None` generates a
    /// fresh key each start.
    pub node_key_seed: Option<String>,
    /// Network name, used for log and metric labels only.
    pub network: String,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            node_key_seed: None,
            network: "devnet".to_string(),
        }
    }
}

/// Cadence of the runtime's periodic tasks and the autonomous workload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Autonomous miners started at boot. The first five specialise in one
    /// work type each; the rest pick a work type per operation.
    pub autonomous_miners: usize,
    /// Difficulty range for specialised miners.
    pub specialist_difficulty: (u32, u32),
    /// Difficulty range for general miners.
    pub generalist_difficulty: (u32, u32),
    /// Operations one autonomous miner keeps in flight.
    pub operations_per_miner: usize,
    pub miner_interval_ms: u64,
    pub tick_interval_ms: u64,
    pub validator_interval_ms: u64,
    pub finality_interval_ms: u64,
    pub stall_sweep_interval_ms: u64,
    pub metrics_interval_ms: u64,
    pub health_interval_ms: u64,
    pub prune_interval_ms: u64,
    /// Terminal operations older than this are dropped from the coordinator.
    pub prune_after_ms: u64,
    /// Health warns below this many active operations.
    pub health_min_active_operations: usize,
    /// Health warns when no block was appended within this window.
    pub health_block_window_ms: u64,
    /// Grace period for tasks to stop on shutdown.
    pub shutdown_grace_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            autonomous_miners: 8,
            specialist_difficulty: (50, 100),
            generalist_difficulty: (40, 80),
            operations_per_miner: 1,
            miner_interval_ms: 15_000,
            tick_interval_ms: 1_000,
            validator_interval_ms: 2_000,
            finality_interval_ms: 1_000,
            stall_sweep_interval_ms: 10_000,
            metrics_interval_ms: 30_000,
            health_interval_ms: 120_000,
            prune_interval_ms: 60_000,
            prune_after_ms: 600_000,
            health_min_active_operations: 3,
            health_block_window_ms: 300_000,
            shutdown_grace_ms: 2_000,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be in (0, 1], got {value}")]
    InvalidRatio { name: &'static str, value: f64 },

    #[error("{name} must be in [0, 100], got {value}")]
    InvalidScore { name: &'static str, value: f64 },

    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },

    #[error("{name} difficulty range {min}..={max} is empty or starts at zero")]
    InvalidDifficultyRange {
        name: &'static str,
        min: u32,
        max: u32,
    },

    #[error("{name} difficulty range {min}..={max} exceeds the coordinator's {limit}")]
    DifficultyAboveLimit {
        name: &'static str,
        min: u32,
        max: u32,
        limit: u32,
    },

    #[error("Genesis roster lists validator {0} more than once")]
    DuplicateValidator(String),

    #[error("Genesis stake holder {id} has stake {stake}, below minimum {minimum}")]
    InsufficientGenesisStake { id: String, stake: u64, minimum: u64 },

    #[error("Genesis roster has {have} {role}, consensus needs at least {need}")]
    RosterTooSmall {
        role: &'static str,
        have: usize,
        need: usize,
    },
}

impl NodeConfig {
    /// Defaults overridden from the process environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Apply `PM_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(seed) = lookup("PM_NODE_KEY_SEED").filter(|s| !s.is_empty()) {
            self.node.node_key_seed = Some(seed);
            info!("Loaded node key seed from environment");
        }
        if let Some(network) = lookup("PM_NETWORK").filter(|s| !s.is_empty()) {
            self.node.network = network;
        }

        override_parsed(&lookup, "PM_POW_MAX_ITERATIONS", &mut self.ledger.max_pow_iterations);
        override_parsed(&lookup, "PM_MAX_APPEND_RETRIES", &mut self.ledger.max_append_retries);
        override_parsed(&lookup, "PM_MAX_ACTIVE_OPERATIONS", &mut self.mining.max_active_operations);

        override_parsed(&lookup, "PM_APPROVAL_THRESHOLD", &mut self.stake.approval_threshold);
        override_parsed(&lookup, "PM_MIN_VALIDATORS", &mut self.stake.min_validators);
        override_parsed(&lookup, "PM_MIN_STAKE", &mut self.stake.min_stake);
        override_parsed(&lookup, "PM_REPUTATION_DELTA", &mut self.stake.reputation_delta);

        override_parsed(&lookup, "PM_REQUIRED_VALIDATIONS", &mut self.research.required_validations);
        override_parsed(&lookup, "PM_CONSENSUS_THRESHOLD", &mut self.research.consensus_threshold);
        override_parsed(&lookup, "PM_QUALITY_THRESHOLD", &mut self.research.quality_threshold);

        let runtime = &mut self.runtime;
        override_parsed(&lookup, "PM_AUTONOMOUS_MINERS", &mut runtime.autonomous_miners);
        override_parsed(&lookup, "PM_MINER_INTERVAL_MS", &mut runtime.miner_interval_ms);
        override_parsed(&lookup, "PM_TICK_INTERVAL_MS", &mut runtime.tick_interval_ms);
        override_parsed(&lookup, "PM_VALIDATOR_INTERVAL_MS", &mut runtime.validator_interval_ms);
        override_parsed(&lookup, "PM_FINALITY_INTERVAL_MS", &mut runtime.finality_interval_ms);
        override_parsed(&lookup, "PM_STALL_SWEEP_INTERVAL_MS", &mut runtime.stall_sweep_interval_ms);
        override_parsed(&lookup, "PM_METRICS_INTERVAL_MS", &mut runtime.metrics_interval_ms);
        override_parsed(&lookup, "PM_HEALTH_INTERVAL_MS", &mut runtime.health_interval_ms);
    }

    /// Reject configurations the node cannot make progress with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ratio("approval_threshold", self.stake.approval_threshold)?;
        ratio("consensus_threshold", self.research.consensus_threshold)?;
        score("quality_threshold", self.research.quality_threshold)?;
        score("approval_score", self.research.approval_score)?;

        non_zero("max_pow_iterations", self.ledger.max_pow_iterations)?;
        non_zero("min_validators", self.stake.min_validators as u64)?;
        non_zero("required_validations", self.research.required_validations as u64)?;
        non_zero("max_batch_size", self.records.max_batch_size as u64)?;

        let runtime = &self.runtime;
        for (name, value) in [
            ("miner_interval_ms", runtime.miner_interval_ms),
            ("tick_interval_ms", runtime.tick_interval_ms),
            ("validator_interval_ms", runtime.validator_interval_ms),
            ("finality_interval_ms", runtime.finality_interval_ms),
            ("stall_sweep_interval_ms", runtime.stall_sweep_interval_ms),
            ("metrics_interval_ms", runtime.metrics_interval_ms),
            ("health_interval_ms", runtime.health_interval_ms),
            ("prune_interval_ms", runtime.prune_interval_ms),
        ] {
            non_zero(name, value)?;
        }

        self.difficulty_range("specialist", runtime.specialist_difficulty)?;
        self.difficulty_range("generalist", runtime.generalist_difficulty)?;

        self.validate_genesis()
    }

    fn difficulty_range(&self, name: &'static str, (min, max): (u32, u32)) -> Result<(), ConfigError> {
        if min == 0 || min > max {
            return Err(ConfigError::InvalidDifficultyRange { name, min, max });
        }
        if min < self.mining.min_difficulty || max > self.mining.max_difficulty {
            return Err(ConfigError::DifficultyAboveLimit {
                name,
                min,
                max,
                limit: self.mining.max_difficulty,
            });
        }
        Ok(())
    }

    fn validate_genesis(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        let ids = self
            .genesis
            .stake_holders
            .iter()
            .map(|holder| holder.id.as_str())
            .chain(self.genesis.researchers.iter().map(String::as_str));
        for id in ids {
            if !seen.insert(id) {
                return Err(ConfigError::DuplicateValidator(id.to_string()));
            }
        }

        if let Some(holder) = self
            .genesis
            .stake_holders
            .iter()
            .find(|holder| holder.stake < self.stake.min_stake)
        {
            return Err(ConfigError::InsufficientGenesisStake {
                id: holder.id.clone(),
                stake: holder.stake,
                minimum: self.stake.min_stake,
            });
        }

        if self.genesis.stake_holders.len() < self.stake.min_validators {
            return Err(ConfigError::RosterTooSmall {
                role: "stake holders",
                have: self.genesis.stake_holders.len(),
                need: self.stake.min_validators,
            });
        }
        // Every submission needs a second researcher to review it.
        let need = self.research.required_validations.max(2);
        if self.genesis.researchers.len() < need {
            return Err(ConfigError::RosterTooSmall {
                role: "researchers",
                have: self.genesis.researchers.len(),
                need,
            });
        }
        Ok(())
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => *target = value,
        Err(e) => warn!(key, value = %raw, error = %e, "Ignoring invalid environment override"),
    }
}

fn ratio(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidRatio { name, value })
    }
}

fn score(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidScore { name, value })
    }
}

fn non_zero(name: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::Zero { name })
    } else {
        Ok(())
    }
}
