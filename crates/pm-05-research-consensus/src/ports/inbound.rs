//! Driving Port (API - Inbound)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_types::{Block, ConsensusResult, Decision, Hash, StallReport, Validator, ValidatorId};

use crate::error::ResearchResult;

/// What one accepted submission produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchSubmission {
    /// Decision after peer review.
    pub decision: Decision,
    pub score: f64,
    pub reviewer_id: Option<ValidatorId>,
    pub reviewer_agreed: Option<bool>,
    /// Round state after this submission.
    pub result: ConsensusResult,
}

#[async_trait]
pub trait ResearchConsensusApi: Send + Sync {
    async fn register_researcher(&self, id: ValidatorId) -> ResearchResult<Validator>;

    async fn researchers(&self) -> ResearchResult<Vec<Validator>>;

    /// Score, peer-review and record `validator_id`'s validation of `block`.
    async fn submit_validation(
        &self,
        block: &Block,
        validator_id: &ValidatorId,
    ) -> ResearchResult<ResearchSubmission>;

    async fn status(&self, block_hash: Hash) -> ResearchResult<ConsensusResult>;

    /// Mark open rounds past their window as stalled. Also finishes the
    /// participant credit of any closed round whose credit failed.
    async fn sweep_stalled(&self, now: u64) -> ResearchResult<Vec<StallReport>>;
}
