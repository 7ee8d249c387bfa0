//! # pm-02-blockchain-ledger
//!
//! Builds and chains blocks for the productive mining ledger.
//!
//! ## Overview
//!
//! - **Hash linkage**: `block[i].previous_hash == block[i-1].block_hash`
//! - **Merkle root**: binary SHA-256 tree over the work items' content hashes
//! - **Bounded PoW**: at most `max_pow_iterations` nonces; on exhaustion the
//!   best candidate is sealed and a warning logged
//! - **Single writer head**: appends are a compare-and-set on the store head
//!
//! ## Architecture
//!
//! ```text
//! Mining Coordinator (3) ──WorkItem──→ Blockchain Ledger (2)
//!                                          │
//!                                          ├── compare_and_append_block ──→ Ledger Store (1)
//!                                          │
//!                                          └── BlockCreated ──→ Event Bus ──→ Orchestrator (7)
//! ```
//!
//! ## Halt State
//!
//! ```text
//! [RUNNING] ──stored chain fails verification──→ [HALTED] ──resume()──→ [RUNNING]
//! ```
//!
//! A stale prior block or a lost CAS is recoverable and never halts; only
//! corruption of already-stored blocks does.
//!
//! ## Example
//!
//! ```rust,ignore
//! use pm_02_blockchain_ledger::{BlockchainLedger, LedgerApi, LedgerConfig};
//!
//! let ledger = BlockchainLedger::new(store, bus, operator, clock, LedgerConfig::default());
//! let block = ledger.append_work_item(work_item).await?;
//! assert!(ledger.verify_stored_chain().await?.is_valid());
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use config::LedgerConfig;
pub use domain::{verify_chain, ChainFault, ChainVerification, FaultKind, PowOutcome};
pub use error::{LedgerError, LedgerResult};
pub use ports::inbound::LedgerApi;
pub use service::BlockchainLedger;
