//! Ports for the mining coordinator.

pub mod inbound;

pub use inbound::{CancelOutcome, CompletionOutcome, MiningApi, MiningRequest, TickOutcome};
