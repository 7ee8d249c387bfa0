//! # Ledger Store (Subsystem 1)
//!
//! Append-only storage collaborator for the productive-mining ledger.
//!
//! ## Persisted State Shape
//!
//! ```text
//! blocks:   [0] ← [1] ← [2] ← ... ← [head]        keyed by monotonic index
//! records:  chain "block-finality": (1) ← (2) ← ...   keyed by chain-local sequence
//!           chain "validator-reputation": (1) ← ...
//! ```
//!
//! Both lists are append-only. The head pointer moves only through
//! [`LedgerStore::compare_and_append_block`], which is the single point of
//! linearization for concurrent block writers.
//!
//! Consumers depend on the [`LedgerStore`] trait; subsystems that need a
//! narrower view define their own repository port and adapt this one.

pub mod adapters;
pub mod error;
pub mod ports;

pub use adapters::InMemoryLedgerStore;
pub use error::{StoreError, StoreResult};
pub use ports::LedgerStore;
