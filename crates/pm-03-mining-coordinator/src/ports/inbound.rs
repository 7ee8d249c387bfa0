//! Driving Port (API - Inbound)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_types::{MinerId, OperationId, WorkItem, WorkType};

use crate::domain::OperationSnapshot;
use crate::error::MiningResult;

/// Request to start a mining operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiningRequest {
    pub work_type: WorkType,
    pub difficulty: u32,
    pub miner_id: MinerId,
}

/// Result of a completion attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    /// This call won the completion guard and produced the work item.
    Emitted(WorkItem),
    /// An earlier call already produced it; this one is a no-op.
    AlreadyEmitted(WorkItem),
    /// Another caller holds the guard and is still synthesizing.
    InProgress,
}

impl CompletionOutcome {
    #[must_use]
    pub fn work_item(&self) -> Option<&WorkItem> {
        match self {
            CompletionOutcome::Emitted(item) | CompletionOutcome::AlreadyEmitted(item) => {
                Some(item)
            }
            CompletionOutcome::InProgress => None,
        }
    }

    /// True only for the call that produced the item.
    #[must_use]
    pub fn is_first(&self) -> bool {
        matches!(self, CompletionOutcome::Emitted(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Progressed(f64),
    Completion(CompletionOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelOutcome {
    Cancelled,
    /// The operation already completed, failed, or was cancelled.
    NoOpCancellation,
}

/// Primary mining API.
///
/// Purely reactive: timing belongs to whoever calls `tick`.
#[async_trait]
pub trait MiningApi: Send + Sync {
    async fn start_operation(&self, request: MiningRequest) -> MiningResult<OperationSnapshot>;

    /// Advance progress by `delta`. Reaching 1.0 runs the completion guard.
    async fn tick(&self, id: OperationId, delta: f64) -> MiningResult<TickOutcome>;

    /// Complete now, regardless of progress. Idempotent.
    async fn complete(&self, id: OperationId) -> MiningResult<CompletionOutcome>;

    async fn cancel(&self, id: OperationId) -> MiningResult<CancelOutcome>;

    async fn operation(&self, id: OperationId) -> Option<OperationSnapshot>;

    /// Operations in `Active` or `Completing`, oldest first.
    async fn active_operations(&self) -> Vec<OperationSnapshot>;

    /// Drop terminal operations that finished before `before`. Returns the
    /// number removed.
    async fn prune_finished(&self, before: u64) -> usize;
}
