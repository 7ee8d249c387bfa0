//! # Shared Types Crate
//!
//! Domain entities and value types shared by every productive-mining
//! subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Canonical Hashing**: Hashed entities own their canonical encoding, so
//!   every subsystem recomputes the same digest.
//! - **Append-Only Lifecycle**: Blocks, work items, validation records and
//!   immutable records have no mutating methods beyond construction.

pub mod consensus;
pub mod entities;
pub mod errors;
pub mod time;

pub use consensus::*;
pub use entities::*;
pub use errors::*;
pub use time::{ManualTimeSource, SystemTimeSource, TimeSource};
