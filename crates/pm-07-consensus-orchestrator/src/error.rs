//! Error types for the consensus orchestrator.

use pm_04_stake_consensus::StakeError;
use pm_05_research_consensus::ResearchError;
use pm_06_immutable_records::RecordError;
use shared_types::{FinalityStage, Hash};
use thiserror::Error;

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Block {0:?} is not registered")]
    UnknownBlock(Hash),

    #[error("Block {0:?} is already registered")]
    AlreadyRegistered(Hash),

    /// Finality never regresses or skips a stage.
    #[error("Invalid finality transition {from} -> {to}")]
    InvalidTransition {
        from: FinalityStage,
        to: FinalityStage,
    },

    #[error("Stake consensus error: {0}")]
    Stake(#[from] StakeError),

    #[error("Research consensus error: {0}")]
    Research(#[from] ResearchError),

    #[error("Record chain error: {0}")]
    Records(#[from] RecordError),
}

impl OrchestratorError {
    /// The block stays at its stage and a later `process` may advance it.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            OrchestratorError::Records(e) => e.is_recoverable(),
            OrchestratorError::Stake(_) | OrchestratorError::Research(_) => true,
            _ => false,
        }
    }
}
