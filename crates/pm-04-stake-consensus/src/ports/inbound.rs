//! Driving Port (API - Inbound)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_types::{ConsensusResult, Decision, StallReport, Validator, ValidatorId, WorkItem, WorkItemId};

use crate::error::StakeResult;

/// One validator's reputation move after a disposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationChange {
    pub validator_id: ValidatorId,
    pub before: f64,
    pub after: f64,
}

#[async_trait]
pub trait StakeConsensusApi: Send + Sync {
    /// Add or replace a stake holder.
    async fn register_validator(&self, id: ValidatorId, stake: u64) -> StakeResult<Validator>;

    async fn validators(&self) -> StakeResult<Vec<Validator>>;

    /// Record `validator_id`'s decision on `work_item`.
    async fn submit_validation(
        &self,
        work_item: &WorkItem,
        validator_id: &ValidatorId,
    ) -> StakeResult<Decision>;

    /// Current aggregate. Latched once finalized.
    async fn aggregate(&self, work_item_id: WorkItemId) -> StakeResult<ConsensusResult>;

    /// Latch a decided aggregate and close the round. Returns the aggregate
    /// unchanged while it is still pending.
    ///
    /// The aggregate is decided as soon as `min_validators` records exist,
    /// so a call made mid-collection latches on a partial roster and
    /// refuses everyone after it. Submit the full roster first.
    async fn finalize(&self, work_item_id: WorkItemId) -> StakeResult<ConsensusResult>;

    /// Move participating validators' reputation once the work item's final
    /// disposition is known. Each validator is adjusted at most once per
    /// target. If a save fails, calling again adjusts only the validators
    /// still outstanding, using the `confirmed` of the first call.
    async fn apply_disposition(
        &self,
        work_item_id: WorkItemId,
        confirmed: bool,
    ) -> StakeResult<Vec<ReputationChange>>;

    /// Mark open rounds past their window as stalled.
    async fn sweep_stalled(&self, now: u64) -> StakeResult<Vec<StallReport>>;
}
