//! # Error Types
//!
//! Cross-subsystem error and alert types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consensus::StallReport;
use crate::entities::ChainId;

/// Alerts raised to the operator channel.
///
/// Each variant corresponds to a condition that is surfaced rather than
/// recovered locally.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum OperatorAlert {
    /// Required validations were not reached within the collection window.
    #[error("Consensus timeout: {} {} has {}/{} validations past deadline {}",
        .0.layer, .0.target, .0.validations, .0.required, .0.deadline)]
    ConsensusTimeout(StallReport),

    /// The block ledger halted on a chain continuity break.
    #[error("Ledger halted: {reason}")]
    LedgerHalted { reason: String },

    /// An audit chain halted on a broken hash link.
    #[error("Record chain {chain_id} halted at sequence {sequence}: {reason}")]
    RecordChainHalted {
        chain_id: ChainId,
        sequence: u64,
        reason: String,
    },
}

/// Operational state of an append-only chain (block ledger or audit chain).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChainState {
    /// Accepting appends.
    #[default]
    Running,
    /// Halted after a continuity or integrity failure; appends refused until
    /// an operator resumes the chain.
    HaltedAwaitingIntervention { reason: String },
}

impl ChainState {
    #[must_use]
    pub fn is_halted(&self) -> bool {
        matches!(self, ChainState::HaltedAwaitingIntervention { .. })
    }
}
