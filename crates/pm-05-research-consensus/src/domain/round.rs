//! Per-target research round state.

use shared_types::{ConsensusLayer, ConsensusResult, StallReport, TargetRef, ValidatorId};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct ResearchRound {
    pub target: TargetRef,
    pub opened_at: u64,
    pub deadline: u64,
    /// Terminal result, set exactly once.
    pub result: Option<ConsensusResult>,
    pub stalled: bool,
    /// Participants whose quality score is already folded in.
    pub credited: HashSet<ValidatorId>,
    /// Closed, but a participant credit failed and must be retried.
    pub credits_outstanding: bool,
}

impl ResearchRound {
    #[must_use]
    pub fn open(target: TargetRef, now: u64, window_ms: u64) -> Self {
        Self {
            target,
            opened_at: now,
            deadline: now.saturating_add(window_ms),
            result: None,
            stalled: false,
            credited: HashSet::new(),
            credits_outstanding: false,
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.result.is_some()
    }

    pub fn check_stall(&mut self, now: u64, validations: usize, required: usize) -> Option<StallReport> {
        if self.is_closed() || self.stalled || now < self.deadline {
            return None;
        }
        self.stalled = true;
        Some(StallReport {
            layer: ConsensusLayer::Research,
            target: self.target,
            validations,
            required,
            opened_at: self.opened_at,
            deadline: self.deadline,
        })
    }
}
