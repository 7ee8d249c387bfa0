//! Mining operation state.
//!
//! State lives in an `AtomicU8` so the completion guard is one
//! compare-and-set. Progress is an `f64` stored as bits in an `AtomicU64`.
//!
//! ```text
//!            ┌──cancel──→ [CANCELLED]
//! [ACTIVE] ──┤
//!            └──CAS──→ [COMPLETING] ──synthesized──→ [COMPLETED]
//!                           │
//!                           └──synthesis error──→ [FAILED]
//! ```

use serde::{Deserialize, Serialize};
use shared_types::{MinerId, OperationId, WorkItem, WorkItemId, WorkType};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum OperationState {
    Active = 0,
    /// The completion guard was won; synthesis is running.
    Completing = 1,
    Completed = 2,
    Failed = 3,
    Cancelled = 4,
}

impl OperationState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => OperationState::Active,
            1 => OperationState::Completing,
            2 => OperationState::Completed,
            3 => OperationState::Failed,
            _ => OperationState::Cancelled,
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OperationState::Completed | OperationState::Failed | OperationState::Cancelled
        )
    }

    #[must_use]
    pub fn is_in_flight(self) -> bool {
        matches!(self, OperationState::Active | OperationState::Completing)
    }
}

/// A single mining operation.
#[derive(Debug)]
pub struct MiningOperation {
    pub id: OperationId,
    pub work_type: WorkType,
    pub difficulty: u32,
    pub miner_id: MinerId,
    pub started_at: u64,
    pub estimated_completion: u64,
    state: AtomicU8,
    progress_bits: AtomicU64,
    result: OnceLock<WorkItem>,
    failure: OnceLock<String>,
    finished_at: AtomicU64,
}

impl MiningOperation {
    #[must_use]
    pub fn new(
        work_type: WorkType,
        difficulty: u32,
        miner_id: MinerId,
        started_at: u64,
        estimated_completion: u64,
    ) -> Self {
        Self {
            id: OperationId::new(),
            work_type,
            difficulty,
            miner_id,
            started_at,
            estimated_completion,
            state: AtomicU8::new(OperationState::Active as u8),
            progress_bits: AtomicU64::new(0f64.to_bits()),
            result: OnceLock::new(),
            failure: OnceLock::new(),
            finished_at: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn state(&self) -> OperationState {
        OperationState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[must_use]
    pub fn progress(&self) -> f64 {
        f64::from_bits(self.progress_bits.load(Ordering::Acquire))
    }

    /// Add `delta` to progress, clamped to `[0, 1]`.
    ///
    /// Returns the new progress, or `None` if the operation is no longer
    /// `Active`.
    pub fn advance(&self, delta: f64) -> Option<f64> {
        let mut current = self.progress_bits.load(Ordering::Acquire);
        loop {
            if self.state() != OperationState::Active {
                return None;
            }
            let next = (f64::from_bits(current) + delta).clamp(0.0, 1.0);
            match self.progress_bits.compare_exchange_weak(
                current,
                next.to_bits(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(next),
                Err(observed) => current = observed,
            }
        }
    }

    /// The completion guard. Exactly one caller ever sees `true`.
    pub fn try_begin_completion(&self) -> bool {
        self.transition(OperationState::Active, OperationState::Completing)
    }

    /// Cancel an `Active` operation. `false` if it already left `Active`.
    pub fn try_cancel(&self, now: u64) -> bool {
        let cancelled = self.transition(OperationState::Active, OperationState::Cancelled);
        if cancelled {
            self.finished_at.store(now, Ordering::Release);
        }
        cancelled
    }

    /// Publish the work item. Only the completion winner calls this.
    ///
    /// Returns the item back if a result was already published.
    pub fn publish_result(&self, item: WorkItem, now: u64) -> Result<(), WorkItem> {
        self.result.set(item)?;
        self.progress_bits.store(1f64.to_bits(), Ordering::Release);
        self.finished_at.store(now, Ordering::Release);
        self.state
            .store(OperationState::Completed as u8, Ordering::Release);
        Ok(())
    }

    /// Record a synthesis failure. Only valid from `Completing`.
    pub fn fail(&self, reason: String, now: u64) -> bool {
        if self.transition(OperationState::Completing, OperationState::Failed) {
            let _ = self.failure.set(reason);
            self.finished_at.store(now, Ordering::Release);
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn result(&self) -> Option<&WorkItem> {
        self.result.get()
    }

    #[must_use]
    pub fn failure(&self) -> Option<&str> {
        self.failure.get().map(String::as_str)
    }

    /// Millis timestamp of reaching a terminal state, `None` while in flight.
    #[must_use]
    pub fn finished_at(&self) -> Option<u64> {
        match self.finished_at.load(Ordering::Acquire) {
            0 if !self.state().is_terminal() => None,
            t => Some(t),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> OperationSnapshot {
        OperationSnapshot {
            id: self.id,
            work_type: self.work_type,
            difficulty: self.difficulty,
            miner_id: self.miner_id.clone(),
            progress: self.progress(),
            state: self.state(),
            started_at: self.started_at,
            estimated_completion: self.estimated_completion,
            work_item_id: self.result().map(|w| w.id),
            failure: self.failure().map(str::to_string),
        }
    }

    fn transition(&self, from: OperationState, to: OperationState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Read-only view of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationSnapshot {
    pub id: OperationId,
    pub work_type: WorkType,
    pub difficulty: u32,
    pub miner_id: MinerId,
    pub progress: f64,
    pub state: OperationState,
    pub started_at: u64,
    pub estimated_completion: u64,
    pub work_item_id: Option<WorkItemId>,
    pub failure: Option<String>,
}
