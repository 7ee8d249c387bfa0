//! # Consensus Value Types
//!
//! Decisions, aggregate results and finality stages shared between the
//! consensus layers, the orchestrator and the event bus.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entities::TargetRef;

/// Which consensus layer produced a record or result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConsensusLayer {
    /// Stake-weighted agreement on a work item.
    Stake,
    /// Quality-weighted, peer-reviewed agreement on a block.
    Research,
}

impl fmt::Display for ConsensusLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsensusLayer::Stake => f.write_str("pos"),
            ConsensusLayer::Research => f.write_str("por"),
        }
    }
}

/// A single validator's decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Rejected,
    /// Research-layer negative decision.
    RequiresRevision,
}

impl Decision {
    #[must_use]
    pub fn is_approval(self) -> bool {
        matches!(self, Decision::Approved)
    }

    /// Flip between approval and the layer's negative decision.
    #[must_use]
    pub fn flipped(self, layer: ConsensusLayer) -> Self {
        match (self, layer) {
            (Decision::Approved, ConsensusLayer::Stake) => Decision::Rejected,
            (Decision::Approved, ConsensusLayer::Research) => Decision::RequiresRevision,
            (Decision::Rejected | Decision::RequiresRevision, _) => Decision::Approved,
        }
    }
}

/// Terminal decision of a consensus round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FinalDecision {
    Accepted,
    Rejected,
}

/// Stage of a consensus round. Progression is monotonic.
///
/// ```text
/// [PendingSubmission] ──first record──→ [CollectingValidations]
///                                              │
///                          completed >= required
///                                              ↓
///                              [ConsensusReached{Accepted|Rejected}]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsensusStage {
    PendingSubmission,
    CollectingValidations,
    ConsensusReached(FinalDecision),
}

impl ConsensusStage {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConsensusStage::ConsensusReached(_))
    }

    /// Position in the progression, used to reject regressions.
    #[must_use]
    pub fn rank(&self) -> u8 {
        match self {
            ConsensusStage::PendingSubmission => 0,
            ConsensusStage::CollectingValidations => 1,
            ConsensusStage::ConsensusReached(_) => 2,
        }
    }
}

/// Aggregate view of one consensus round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub layer: ConsensusLayer,
    pub target: TargetRef,
    pub stage: ConsensusStage,
    /// Completed validations counted in the aggregate.
    pub validations: usize,
    pub approvals: usize,
    /// Validations needed before a decision is taken.
    pub required: usize,
    /// Stake (PoS) or count (PoR) of approving validators.
    pub approving_weight: f64,
    pub total_weight: f64,
    /// `approving_weight / total_weight`, 0 when nothing was validated.
    pub approval_ratio: f64,
    /// Mean quality score (PoR only).
    pub average_quality: Option<f64>,
    /// Set when the collection window elapsed before `required` was reached.
    pub stalled: bool,
}

impl ConsensusResult {
    /// An empty round.
    #[must_use]
    pub fn pending(layer: ConsensusLayer, target: TargetRef, required: usize) -> Self {
        Self {
            layer,
            target,
            stage: ConsensusStage::PendingSubmission,
            validations: 0,
            approvals: 0,
            required,
            approving_weight: 0.0,
            total_weight: 0.0,
            approval_ratio: 0.0,
            average_quality: None,
            stalled: false,
        }
    }

    #[must_use]
    pub fn decision(&self) -> Option<FinalDecision> {
        match self.stage {
            ConsensusStage::ConsensusReached(decision) => Some(decision),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }
}

/// A consensus round that missed its collection window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StallReport {
    pub layer: ConsensusLayer,
    pub target: TargetRef,
    pub validations: usize,
    pub required: usize,
    pub opened_at: u64,
    pub deadline: u64,
}

/// Finality stage of a block.
///
/// ```text
/// [Provisional] ──PoS approved──→ [Staked] ──PoR accepted──→ [Certified]
///       │                            │                            │
///   PoS rejected                PoR rejected            record appended
///       ↓                            ↓                            ↓
///  [Rejected{reason}]        [Rejected{reason}]              [Immutable]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinalityStage {
    Provisional,
    Staked,
    Certified,
    Immutable,
    Rejected { reason: String },
}

impl FinalityStage {
    /// Position in the forward progression. `Rejected` sits outside it.
    #[must_use]
    pub fn rank(&self) -> Option<u8> {
        match self {
            FinalityStage::Provisional => Some(0),
            FinalityStage::Staked => Some(1),
            FinalityStage::Certified => Some(2),
            FinalityStage::Immutable => Some(3),
            FinalityStage::Rejected { .. } => None,
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, FinalityStage::Immutable | FinalityStage::Rejected { .. })
    }

    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self, FinalityStage::Rejected { .. })
    }

    /// Whether moving from `self` to `next` is a legal single step.
    ///
    /// Only one-step forward moves, or a move to `Rejected` from a
    /// non-terminal stage before `Certified`, are allowed.
    #[must_use]
    pub fn can_advance_to(&self, next: &FinalityStage) -> bool {
        match (self.rank(), next.rank()) {
            (Some(from), Some(to)) => to == from + 1,
            (Some(from), None) => from < 2,
            (None, _) => false,
        }
    }
}

impl fmt::Display for FinalityStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinalityStage::Provisional => f.write_str("provisional"),
            FinalityStage::Staked => f.write_str("staked"),
            FinalityStage::Certified => f.write_str("certified"),
            FinalityStage::Immutable => f.write_str("immutable"),
            FinalityStage::Rejected { reason } => write!(f, "rejected ({reason})"),
        }
    }
}
