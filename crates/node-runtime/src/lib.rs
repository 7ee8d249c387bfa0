//! # Node Runtime Library
//!
//! Wiring for the productive-mining node. The `main.rs` binary is a thin
//! shell over [`NodeRuntime`].
//!
//! ## Flow
//!
//! ```text
//! AutonomousMiner ──start──→ MiningCoordinator(3)
//!                                  │ tick (MiningTicker)
//!                                  ▼
//!                              WorkItem ──pipeline──→ BlockchainLedger(2)
//!                                                          │
//!                                                          ▼
//!                                     ConsensusOrchestrator(7) ◀── ValidatorRounds
//!                                      │         │              (StakeConsensus(4),
//!                                      │         │               ResearchConsensus(5))
//!                                      ▼         ▼
//!                             FinalityDriver  ImmutableRecordChain(6)
//! ```
//!
//! ## Modules
//!
//! - `container/` - configuration and dependency injection
//! - `genesis/` - validator roster bootstrap
//! - `scheduler/` - named periodic tasks with cancellation
//! - `tasks/` - miners, pipeline, validator rounds, finality, metrics, health
//! - `handlers/` - `NodeApi` query and command surface
//! - `wiring/` - bus metrics recorder and operator console

#![allow(clippy::type_complexity)]
#![allow(clippy::too_many_lines)]

pub mod container;
pub mod genesis;
pub mod handlers;
pub mod runtime;
pub mod scheduler;
pub mod tasks;
pub mod wiring;

pub use container::{ConfigError, NodeConfig, NodeContainer};
pub use handlers::{NodeApi, NodeError, NodeResult};
pub use runtime::NodeRuntime;
pub use scheduler::{PeriodicTask, Scheduler, SchedulerError};
