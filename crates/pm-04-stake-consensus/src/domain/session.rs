//! Per-target round bookkeeping.

use shared_types::{ConsensusLayer, ConsensusResult, StallReport, TargetRef, ValidatorId};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct StakeRound {
    pub target: TargetRef,
    pub opened_at: u64,
    pub deadline: u64,
    /// Set once by `finalize`; later submissions are refused.
    pub latched: Option<ConsensusResult>,
    pub stalled: bool,
    /// Outcome fixed by the first `apply_disposition` call.
    pub disposition: Option<bool>,
    /// Validators whose reputation change is already saved.
    pub credited: HashSet<ValidatorId>,
}

impl StakeRound {
    #[must_use]
    pub fn open(target: TargetRef, now: u64, window_ms: u64) -> Self {
        Self {
            target,
            opened_at: now,
            deadline: now.saturating_add(window_ms),
            latched: None,
            stalled: false,
            disposition: None,
            credited: HashSet::new(),
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.latched.is_some()
    }

    /// Mark the round stalled if its window elapsed. Reports only the first
    /// time.
    pub fn check_stall(&mut self, now: u64, validations: usize, required: usize) -> Option<StallReport> {
        if self.is_closed() || self.stalled || now < self.deadline || validations >= required {
            return None;
        }
        self.stalled = true;
        Some(StallReport {
            layer: ConsensusLayer::Stake,
            target: self.target,
            validations,
            required,
            opened_at: self.opened_at,
            deadline: self.deadline,
        })
    }
}
