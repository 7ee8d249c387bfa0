//! Research consensus service.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_bus::{EventPublisher, MiningEvent};
use shared_types::{
    Block, ConsensusLayer, ConsensusResult, Decision, Hash, StallReport, TargetRef, TimeSource,
    ValidationRecord, Validator, ValidatorId, ValidatorRole,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ResearchConfig;
use crate::domain::{select_reviewer, tally, PeerReviewer, QualityScorer, ResearchRound, TallyRule};
use crate::error::{ResearchError, ResearchResult};
use crate::ports::inbound::{ResearchConsensusApi, ResearchSubmission};
use crate::ports::outbound::ResearchRepository;

/// Peer-reviewed quality consensus over blocks.
///
/// Each target has its own lock, so submissions to one block are
/// serialized while different blocks proceed in parallel.
pub struct ResearchConsensus {
    repo: Arc<dyn ResearchRepository>,
    scorer: Arc<dyn QualityScorer>,
    reviewer: Arc<dyn PeerReviewer>,
    events: Arc<dyn EventPublisher>,
    clock: Arc<dyn TimeSource>,
    config: ResearchConfig,
    rounds: Mutex<HashMap<TargetRef, Arc<Mutex<ResearchRound>>>>,
}

impl ResearchConsensus {
    pub fn new(
        repo: Arc<dyn ResearchRepository>,
        scorer: Arc<dyn QualityScorer>,
        reviewer: Arc<dyn PeerReviewer>,
        events: Arc<dyn EventPublisher>,
        clock: Arc<dyn TimeSource>,
        config: ResearchConfig,
    ) -> Self {
        Self {
            repo,
            scorer,
            reviewer,
            events,
            clock,
            config,
            rounds: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    fn rule(&self) -> TallyRule {
        TallyRule {
            required: self.config.required_validations,
            consensus_threshold: self.config.consensus_threshold,
            quality_threshold: self.config.quality_threshold,
        }
    }

    fn round(&self, target: TargetRef) -> Arc<Mutex<ResearchRound>> {
        let now = self.clock.now_millis();
        self.rounds
            .lock()
            .entry(target)
            .or_insert_with(|| {
                Arc::new(Mutex::new(ResearchRound::open(
                    target,
                    now,
                    self.config.collection_window_ms,
                )))
            })
            .clone()
    }

    fn eligible_researcher(&self, id: &ValidatorId) -> ResearchResult<Validator> {
        let validator = self
            .repo
            .validator(id)?
            .ok_or_else(|| ResearchError::ValidatorNotFound(id.clone()))?;
        if validator.role != ValidatorRole::Researcher || !validator.active {
            return Err(ResearchError::NotEligible(id.clone()));
        }
        Ok(validator)
    }

    /// Fold each participant's score into their running quality average.
    ///
    /// Skips anyone already credited for this round, so a call after a
    /// failed save finishes the rest.
    fn credit_participants(&self, round: &mut ResearchRound) -> ResearchResult<()> {
        round.credits_outstanding = true;
        for record in self.repo.records(&round.target)? {
            if round.credited.contains(&record.validator_id) {
                continue;
            }
            let (Some(score), Some(mut validator)) =
                (record.quality_score, self.repo.validator(&record.validator_id)?)
            else {
                continue;
            };
            validator.record_quality(score);
            self.repo.save_validator(validator)?;
            round.credited.insert(record.validator_id);
        }
        round.credits_outstanding = false;
        Ok(())
    }
}

#[async_trait]
impl ResearchConsensusApi for ResearchConsensus {
    async fn register_researcher(&self, id: ValidatorId) -> ResearchResult<Validator> {
        let validator = match self.repo.validator(&id)? {
            Some(mut existing) => {
                existing.active = true;
                existing
            }
            None => {
                let mut fresh = Validator::new(id.as_str(), ValidatorRole::Researcher, 0);
                fresh.registered_at = self.clock.now_millis();
                fresh
            }
        };
        self.repo.save_validator(validator.clone())?;
        info!(validator = %id, "[pm-05] Researcher registered");
        Ok(validator)
    }

    async fn researchers(&self) -> ResearchResult<Vec<Validator>> {
        self.repo.researchers()
    }

    async fn submit_validation(
        &self,
        block: &Block,
        validator_id: &ValidatorId,
    ) -> ResearchResult<ResearchSubmission> {
        let target = TargetRef::Block(block.block_hash);
        let round = self.round(target);

        let submission = {
            let mut round = round.lock();
            if round.is_closed() {
                return Err(ResearchError::ConsensusClosed(target));
            }
            let submitter = self.eligible_researcher(validator_id)?;

            let score = self.scorer.score(block, &submitter);
            if !score.is_finite() || !(0.0..=100.0).contains(&score) {
                warn!(validator = %validator_id, score, "[pm-05] Malformed score excluded");
                return Err(ResearchError::MalformedSubmission {
                    validator: validator_id.clone(),
                    reason: format!("score {score} outside [0, 100]"),
                });
            }
            let initial = if score >= self.config.approval_score {
                Decision::Approved
            } else {
                Decision::RequiresRevision
            };

            let pool = self.repo.researchers()?;
            let (decision, reviewer_id, reviewer_agreed) =
                match select_reviewer(&pool, &submitter, block) {
                    Some(reviewer) => {
                        let verdict = self.reviewer.review(block, score, reviewer);
                        let decision = if verdict.agreed {
                            initial
                        } else {
                            initial.flipped(ConsensusLayer::Research)
                        };
                        debug!(
                            submitter = %validator_id,
                            reviewer = %reviewer.id,
                            score,
                            reviewer_score = verdict.reviewer_score,
                            agreed = verdict.agreed,
                            "[pm-05] Peer review"
                        );
                        (decision, Some(reviewer.id.clone()), Some(verdict.agreed))
                    }
                    None => {
                        debug!(submitter = %validator_id, "[pm-05] No reviewer available");
                        (initial, None, None)
                    }
                };

            self.repo.insert_record(ValidationRecord {
                id: Uuid::new_v4(),
                layer: ConsensusLayer::Research,
                target,
                validator_id: validator_id.clone(),
                decision,
                weight: 1.0,
                quality_score: Some(score),
                reviewer_id: reviewer_id.clone(),
                reviewer_agreed,
                created_at: self.clock.now_millis(),
            })?;

            let records = self.repo.records(&target)?;
            let mut result = tally(target, &records, self.rule());
            result.stalled = round.stalled;
            if result.is_terminal() {
                round.result = Some(result.clone());
                // The decision stands either way; the stall sweep retries.
                if let Err(e) = self.credit_participants(&mut round) {
                    warn!(target = %target, error = %e, "[pm-05] Participant credit incomplete");
                }
            }

            ResearchSubmission {
                decision,
                score,
                reviewer_id,
                reviewer_agreed,
                result,
            }
        };

        self.events
            .publish(MiningEvent::ValidationSubmitted {
                layer: ConsensusLayer::Research,
                target,
                validator_id: validator_id.clone(),
                decision: submission.decision,
            })
            .await;
        if submission.result.is_terminal() {
            info!(
                target = %target,
                decision = ?submission.result.decision(),
                rate = submission.result.approval_ratio,
                average_quality = ?submission.result.average_quality,
                "[pm-05] Research consensus reached"
            );
            self.events
                .publish(MiningEvent::ConsensusReached(submission.result.clone()))
                .await;
        }
        Ok(submission)
    }

    async fn status(&self, block_hash: Hash) -> ResearchResult<ConsensusResult> {
        let target = TargetRef::Block(block_hash);
        let existing = self.rounds.lock().get(&target).cloned();
        let stalled = match existing {
            Some(round) => {
                let round = round.lock();
                if let Some(result) = &round.result {
                    return Ok(result.clone());
                }
                round.stalled
            }
            None => false,
        };
        let mut result = tally(target, &self.repo.records(&target)?, self.rule());
        result.stalled = stalled;
        Ok(result)
    }

    async fn sweep_stalled(&self, now: u64) -> ResearchResult<Vec<StallReport>> {
        let rounds: Vec<_> = self.rounds.lock().values().cloned().collect();
        let mut reports = Vec::new();
        for round in rounds {
            let report = {
                let mut round = round.lock();
                if round.credits_outstanding {
                    self.credit_participants(&mut round)?;
                }
                if round.is_closed() || round.stalled || now < round.deadline {
                    continue;
                }
                let validations = self.repo.records(&round.target)?.len();
                round.check_stall(now, validations, self.config.required_validations)
            };
            if let Some(report) = report {
                warn!(
                    target = %report.target,
                    validations = report.validations,
                    required = report.required,
                    "[pm-05] Research round stalled"
                );
                self.events
                    .publish(MiningEvent::ConsensusStalled(report.clone()))
                    .await;
                reports.push(report);
            }
        }
        Ok(reports)
    }
}
