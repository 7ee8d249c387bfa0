//! Stake consensus service.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_bus::{EventPublisher, MiningEvent};
use shared_types::{
    ConsensusLayer, ConsensusResult, Decision, StallReport, TargetRef, TimeSource,
    ValidationRecord, Validator, ValidatorId, ValidatorRole, WorkItem, WorkItemId,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::StakeConfig;
use crate::domain::{aggregate, Malformed, StakeDecisionPolicy, StakeRound};
use crate::error::{StakeError, StakeResult};
use crate::ports::inbound::{ReputationChange, StakeConsensusApi};
use crate::ports::outbound::StakeRepository;

/// Stake-weighted consensus over work items.
///
/// The round lock serializes a submission against `finalize`, so nothing
/// lands in a round after its decision is latched. Storage enforces one
/// record per validator and target.
pub struct StakeConsensus {
    repo: Arc<dyn StakeRepository>,
    policy: Arc<dyn StakeDecisionPolicy>,
    events: Arc<dyn EventPublisher>,
    clock: Arc<dyn TimeSource>,
    config: StakeConfig,
    rounds: Mutex<HashMap<TargetRef, StakeRound>>,
}

impl StakeConsensus {
    pub fn new(
        repo: Arc<dyn StakeRepository>,
        policy: Arc<dyn StakeDecisionPolicy>,
        events: Arc<dyn EventPublisher>,
        clock: Arc<dyn TimeSource>,
        config: StakeConfig,
    ) -> Self {
        Self {
            repo,
            policy,
            events,
            clock,
            config,
            rounds: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &StakeConfig {
        &self.config
    }

    fn eligible_validator(&self, id: &ValidatorId) -> StakeResult<Validator> {
        let validator = self
            .repo
            .validator(id)?
            .ok_or_else(|| StakeError::ValidatorNotFound(id.clone()))?;
        if validator.role != ValidatorRole::StakeHolder || !validator.active {
            return Err(StakeError::NotEligible(id.clone()));
        }
        if validator.stake < self.config.min_stake {
            return Err(StakeError::InsufficientStake {
                validator: id.clone(),
                stake: validator.stake,
                minimum: self.config.min_stake,
            });
        }
        Ok(validator)
    }

    fn compute(&self, target: TargetRef) -> StakeResult<ConsensusResult> {
        let records = self.repo.records(&target)?;
        Ok(aggregate(
            target,
            &records,
            self.config.min_validators,
            self.config.approval_threshold,
        ))
    }

    /// Whether a validator's call agreed with the final disposition.
    fn reputation_delta(&self, decision: Decision, confirmed: bool) -> f64 {
        if decision.is_approval() == confirmed {
            self.config.reputation_delta
        } else {
            -self.config.reputation_delta
        }
    }
}

#[async_trait]
impl StakeConsensusApi for StakeConsensus {
    async fn register_validator(&self, id: ValidatorId, stake: u64) -> StakeResult<Validator> {
        let validator = match self.repo.validator(&id)? {
            Some(mut existing) => {
                existing.stake = stake;
                existing.active = true;
                existing
            }
            None => {
                let mut fresh = Validator::new(id.as_str(), ValidatorRole::StakeHolder, stake);
                fresh.registered_at = self.clock.now_millis();
                fresh
            }
        };
        self.repo.save_validator(validator.clone())?;
        info!(validator = %id, stake, "[pm-04] Stake holder registered");
        Ok(validator)
    }

    async fn validators(&self) -> StakeResult<Vec<Validator>> {
        self.repo.stake_holders()
    }

    async fn submit_validation(
        &self,
        work_item: &WorkItem,
        validator_id: &ValidatorId,
    ) -> StakeResult<Decision> {
        let target = TargetRef::WorkItem(work_item.id);
        let now = self.clock.now_millis();

        let decision = {
            let mut rounds = self.rounds.lock();
            let round = rounds
                .entry(target)
                .or_insert_with(|| StakeRound::open(target, now, self.config.collection_window_ms));
            if round.is_closed() {
                return Err(StakeError::ConsensusClosed(target));
            }

            let validator = self.eligible_validator(validator_id)?;
            let decision = match self.policy.decide(work_item, &validator) {
                Ok(decision) => decision,
                Err(Malformed(reason)) => {
                    warn!(
                        validator = %validator_id,
                        target = %target,
                        reason = %reason,
                        "[pm-04] Malformed submission excluded"
                    );
                    return Err(StakeError::MalformedSubmission {
                        validator: validator_id.clone(),
                        reason,
                    });
                }
            };

            self.repo.insert_record(ValidationRecord {
                id: Uuid::new_v4(),
                layer: ConsensusLayer::Stake,
                target,
                validator_id: validator_id.clone(),
                decision,
                weight: validator.stake as f64,
                quality_score: None,
                reviewer_id: None,
                reviewer_agreed: None,
                created_at: now,
            })?;
            decision
        };

        debug!(validator = %validator_id, target = %target, ?decision, "[pm-04] Validation recorded");
        self.events
            .publish(MiningEvent::ValidationSubmitted {
                layer: ConsensusLayer::Stake,
                target,
                validator_id: validator_id.clone(),
                decision,
            })
            .await;
        Ok(decision)
    }

    async fn aggregate(&self, work_item_id: WorkItemId) -> StakeResult<ConsensusResult> {
        let target = TargetRef::WorkItem(work_item_id);
        let stalled = {
            let rounds = self.rounds.lock();
            match rounds.get(&target) {
                Some(StakeRound {
                    latched: Some(result),
                    ..
                }) => return Ok(result.clone()),
                Some(round) => round.stalled,
                None => false,
            }
        };
        let mut result = self.compute(target)?;
        result.stalled = stalled;
        Ok(result)
    }

    async fn finalize(&self, work_item_id: WorkItemId) -> StakeResult<ConsensusResult> {
        let target = TargetRef::WorkItem(work_item_id);
        let now = self.clock.now_millis();
        let result = {
            let mut rounds = self.rounds.lock();
            let round = rounds
                .entry(target)
                .or_insert_with(|| StakeRound::open(target, now, self.config.collection_window_ms));
            if let Some(latched) = &round.latched {
                return Ok(latched.clone());
            }
            let mut result = self.compute(target)?;
            result.stalled = round.stalled;
            if !result.is_terminal() {
                return Ok(result);
            }
            round.latched = Some(result.clone());
            result
        };

        info!(
            target = %target,
            decision = ?result.decision(),
            ratio = result.approval_ratio,
            validations = result.validations,
            "[pm-04] Stake consensus reached"
        );
        self.events
            .publish(MiningEvent::ConsensusReached(result.clone()))
            .await;
        Ok(result)
    }

    async fn apply_disposition(
        &self,
        work_item_id: WorkItemId,
        confirmed: bool,
    ) -> StakeResult<Vec<ReputationChange>> {
        let target = TargetRef::WorkItem(work_item_id);
        let mut rounds = self.rounds.lock();
        let round = rounds
            .get_mut(&target)
            .filter(|r| r.is_closed())
            .ok_or(StakeError::NotFinalized(target))?;
        // A retry after a failed save finishes the first call's outcome.
        let confirmed = *round.disposition.get_or_insert(confirmed);

        let mut changes = Vec::new();
        for record in self.repo.records(&target)? {
            if round.credited.contains(&record.validator_id) {
                continue;
            }
            let Some(mut validator) = self.repo.validator(&record.validator_id)? else {
                continue;
            };
            let before = validator.reputation;
            let after = validator.adjust_reputation(self.reputation_delta(record.decision, confirmed));
            validator.validations_performed += 1;
            self.repo.save_validator(validator)?;
            round.credited.insert(record.validator_id.clone());
            changes.push(ReputationChange {
                validator_id: record.validator_id,
                before,
                after,
            });
        }
        if !changes.is_empty() {
            info!(target = %target, confirmed, validators = changes.len(), "[pm-04] Reputation disposition applied");
        }
        Ok(changes)
    }

    async fn sweep_stalled(&self, now: u64) -> StakeResult<Vec<StallReport>> {
        let reports = {
            let mut rounds = self.rounds.lock();
            let mut reports = Vec::new();
            for round in rounds.values_mut() {
                if round.is_closed() || round.stalled || now < round.deadline {
                    continue;
                }
                let validations = self.repo.records(&round.target)?.len();
                if let Some(report) = round.check_stall(now, validations, self.config.min_validators) {
                    reports.push(report);
                }
            }
            reports
        };
        for report in &reports {
            warn!(
                target = %report.target,
                validations = report.validations,
                required = report.required,
                "[pm-04] Stake round stalled"
            );
            self.events
                .publish(MiningEvent::ConsensusStalled(report.clone()))
                .await;
        }
        Ok(reports)
    }
}
