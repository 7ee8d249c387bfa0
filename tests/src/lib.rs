//! # Productive-Mining Test Suite
//!
//! Cross-subsystem tests that need more than one crate wired together.
//! Per-crate behavior is covered by each crate's own `#[cfg(test)]` modules.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/
//! │   └── ledger_benchmarks.rs   # PoW search, chain walks, hashing
//! └── src/integration/
//!     ├── mod.rs                  # Shared harness and scripted policies
//!     ├── finality_flow.rs        # Mined work item → Immutable block
//!     ├── consensus_scenarios.rs  # Stake and research thresholds end to end
//!     ├── integrity.rs            # Tamper detection, halts, resume
//!     ├── mining_lifecycle.rs     # Cancellation and completion races
//!     └── node_surface.rs         # NodeApi over a full container
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p pm-tests
//!
//! # One flow
//! cargo test -p pm-tests integration::finality_flow::
//!
//! # Benchmarks
//! cargo bench -p pm-tests
//! ```

#![allow(dead_code)]

pub mod integration;
