//! # pm-03-mining-coordinator
//!
//! Manages concurrent in-flight mining operations.
//!
//! ## Overview
//!
//! - **Reactive**: progress moves only on `tick`; a scheduler owns timing
//! - **Idempotent completion**: one atomic `Active -> Completing` CAS picks
//!   the single caller that synthesizes and signs the work item
//! - **Cooperative cancellation**: a cancelled operation never emits a work
//!   item, and later ticks are refused
//! - **Injectable work**: `WorkSynthesizer` and `ValueScorer` are traits
//!
//! ## Flow
//!
//! ```text
//! Scheduler ──tick──→ Mining Coordinator (3) ──WorkItem──→ Blockchain Ledger (2)
//!                          │
//!                          └── MiningProgress / WorkItemCreated ──→ Event Bus
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use config::MiningConfig;
pub use domain::{
    DeterministicSynthesizer, MiningOperation, OperationSnapshot, OperationState, SynthesisError,
    SynthesizedWork, ValueScorer, WeightedValueScorer, WorkSynthesizer,
};
pub use error::{MiningError, MiningResult};
pub use ports::{CancelOutcome, CompletionOutcome, MiningApi, MiningRequest, TickOutcome};
pub use service::MiningCoordinator;
