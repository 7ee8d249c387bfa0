//! # pm-07-consensus-orchestrator
//!
//! Composes PoW validity, stake approval (PoS) and research acceptance
//! (PoR) into a per-block finality state machine.
//!
//! ## Finality
//!
//! ```text
//! [Provisional] ──PoS approved──→ [Staked] ──PoR accepted──→ [Certified]
//!       │                            │                            │
//!   PoS rejected                PoR rejected          certification record
//!   or PoW invalid                   │                        appended
//!       ↓                            ↓                            ↓
//!  [Rejected{reason}]        [Rejected{reason}]              [Immutable]
//! ```
//!
//! Stages only move forward; anything else is `InvalidTransition`.
//! Rejected blocks are kept with their reason but do not count towards
//! `canonical_height`.
//!
//! ## Side Effects
//!
//! - Certification and rejection events go to the `block-finality` chain.
//! - Stake reputation is settled at `Immutable` (confirmed) and `Rejected`
//!   (not confirmed), and each change goes to `validator-reputation`.
//! - `sweep_stalled` raises `OperatorAlert::ConsensusTimeout` per stalled
//!   round.

pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use config::OrchestratorConfig;
pub use domain::{BlockFinality, RejectedBlock};
pub use error::{OrchestratorError, OrchestratorResult};
pub use ports::OrchestratorApi;
pub use service::ConsensusOrchestrator;
