//! Stake-weighted aggregation.
//!
//! Pure over the record set. Records are sorted by validator before
//! summing, so the result does not depend on arrival order.

use shared_types::{
    ConsensusLayer, ConsensusResult, ConsensusStage, FinalDecision, TargetRef, ValidationRecord,
};

/// Aggregate the stake records for one target.
///
/// `PendingSubmission` with no records, `CollectingValidations` below
/// `min_validators`, then `Accepted` iff
/// `approving_stake / validated_stake >= threshold`, else `Rejected`.
#[must_use]
pub fn aggregate(
    target: TargetRef,
    records: &[ValidationRecord],
    min_validators: usize,
    threshold: f64,
) -> ConsensusResult {
    let mut sorted: Vec<&ValidationRecord> = records
        .iter()
        .filter(|r| r.layer == ConsensusLayer::Stake && r.target == target)
        .collect();
    sorted.sort_by(|a, b| a.validator_id.cmp(&b.validator_id));
    sorted.dedup_by(|a, b| a.validator_id == b.validator_id);

    let mut result = ConsensusResult::pending(ConsensusLayer::Stake, target, min_validators);
    if sorted.is_empty() {
        return result;
    }

    let total: f64 = sorted.iter().map(|r| r.weight).sum();
    let approving: f64 = sorted
        .iter()
        .filter(|r| r.decision.is_approval())
        .map(|r| r.weight)
        .sum();

    result.validations = sorted.len();
    result.approvals = sorted.iter().filter(|r| r.decision.is_approval()).count();
    result.total_weight = total;
    result.approving_weight = approving;
    result.approval_ratio = if total > 0.0 { approving / total } else { 0.0 };
    result.stage = if result.validations < min_validators {
        ConsensusStage::CollectingValidations
    } else if result.approval_ratio >= threshold {
        ConsensusStage::ConsensusReached(FinalDecision::Accepted)
    } else {
        ConsensusStage::ConsensusReached(FinalDecision::Rejected)
    };
    result
}
