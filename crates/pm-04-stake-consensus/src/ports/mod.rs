//! Ports for stake consensus.

pub mod inbound;
pub mod outbound;

pub use inbound::{ReputationChange, StakeConsensusApi};
pub use outbound::StakeRepository;
