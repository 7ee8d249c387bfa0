//! # pm-06-immutable-records
//!
//! Append-only, hash-linked, signed audit chains.
//!
//! ## Record Layout
//!
//! ```text
//! record[n].previous_record_hash == record[n-1].record_hash   (GENESIS for n = 1)
//! record_hash = SHA-256(chain_id, sequence, activity_type, activity_hash,
//!                       previous_record_hash, batch, references, timestamp, signer)
//! signature   = Ed25519(node key, record_hash)
//! ```
//!
//! Batched appends add a merkle root over the batch's activity hashes to
//! every member. Corrections never edit in place: a new record references
//! the original through `references`.
//!
//! ## Halt State
//!
//! ```text
//! [RUNNING] ──tail or chain fails verification──→ [HALTED] ──resume_chain()──→ [RUNNING]
//! ```
//!
//! Halts are per chain id and raise `OperatorAlert::RecordChainHalted`.

pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use config::RecordConfig;
pub use domain::{
    verify_record, ActivityEvent, ChainReport, ChainWalker, IntegrityFault, RecordFault,
};
pub use error::{RecordError, RecordResult};
pub use ports::RecordChainApi;
pub use service::ImmutableRecordChain;

/// Chain receiving certification and rejection events for blocks.
pub const BLOCK_FINALITY_CHAIN: &str = "block-finality";

/// Chain receiving validator reputation changes.
pub const VALIDATOR_REPUTATION_CHAIN: &str = "validator-reputation";
