//! Research round tally.
//!
//! Pure over the record set; records are sorted by validator before
//! averaging so arrival order does not change the result.

use shared_types::{
    ConsensusLayer, ConsensusResult, ConsensusStage, FinalDecision, TargetRef, ValidationRecord,
};

/// Thresholds for a tally.
#[derive(Debug, Clone, Copy)]
pub struct TallyRule {
    pub required: usize,
    pub consensus_threshold: f64,
    pub quality_threshold: f64,
}

/// Round to three decimals, the precision approval rates are compared at.
#[must_use]
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[must_use]
pub fn tally(target: TargetRef, records: &[ValidationRecord], rule: TallyRule) -> ConsensusResult {
    let mut sorted: Vec<&ValidationRecord> = records
        .iter()
        .filter(|r| r.layer == ConsensusLayer::Research && r.target == target)
        .collect();
    sorted.sort_by(|a, b| a.validator_id.cmp(&b.validator_id));
    sorted.dedup_by(|a, b| a.validator_id == b.validator_id);

    let mut result = ConsensusResult::pending(ConsensusLayer::Research, target, rule.required);
    if sorted.is_empty() {
        return result;
    }

    let n = sorted.len();
    let approvals = sorted.iter().filter(|r| r.decision.is_approval()).count();
    let quality_sum: f64 = sorted.iter().filter_map(|r| r.quality_score).sum();
    let average_quality = quality_sum / n as f64;
    let rate = round3(approvals as f64 / n as f64);

    result.validations = n;
    result.approvals = approvals;
    result.approving_weight = approvals as f64;
    result.total_weight = n as f64;
    result.approval_ratio = rate;
    result.average_quality = Some(average_quality);
    result.stage = if n < rule.required {
        ConsensusStage::CollectingValidations
    } else if rate >= round3(rule.consensus_threshold) && average_quality >= rule.quality_threshold
    {
        ConsensusStage::ConsensusReached(FinalDecision::Accepted)
    } else {
        ConsensusStage::ConsensusReached(FinalDecision::Rejected)
    };
    result
}
