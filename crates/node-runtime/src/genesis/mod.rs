//! # Genesis
//!
//! The validator roster the node starts with. Blocks need no genesis step:
//! the first mined work item becomes block 0.

pub mod builder;

pub use builder::{bootstrap_roster, GenesisConfig, GenesisError, GenesisStakeHolder, RosterSummary};
