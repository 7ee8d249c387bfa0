//! Ports for research consensus.

pub mod inbound;
pub mod outbound;

pub use inbound::{ResearchConsensusApi, ResearchSubmission};
pub use outbound::ResearchRepository;
