//! # pm-04-stake-consensus
//!
//! Stake-weighted validator agreement (PoS) on work items.
//!
//! ## Decision Rule
//!
//! ```text
//! validations < min_validators                       → pending
//! approving_stake / validated_stake >= threshold     → approved
//! otherwise                                          → rejected
//! ```
//!
//! Defaults: `threshold = 0.6`, `min_validators = 3`.
//!
//! ## Guarantees
//!
//! - Each decision is a deterministic function of `(work item, validator)`
//!   through the injected `StakeDecisionPolicy`.
//! - Aggregation is pure over the stored records and independent of their
//!   arrival order.
//! - One record per validator per work item; a finalized round accepts no
//!   more submissions.
//! - Reputation moves by `±reputation_delta` once the work item's final
//!   disposition is known, clamped to `[0, 100]`.
//!
//! ## Architecture
//!
//! ```text
//! Validators ──submit_validation──→ Stake Consensus (4) ──records──→ StakeRepository
//!                                         │
//! Orchestrator (7) ──finalize / apply_disposition──┘
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::LedgerStakeRepository;
pub use config::StakeConfig;
pub use domain::{aggregate, DeterministicStakePolicy, Malformed, StakeDecisionPolicy};
pub use error::{StakeError, StakeResult};
pub use ports::{ReputationChange, StakeConsensusApi, StakeRepository};
pub use service::StakeConsensus;
