//! # Validator Rounds
//!
//! Stands in for the validator network: every run, each active stake
//! holder validates the work items of blocks still `Provisional`, and each
//! active researcher validates blocks that reached `Staked`. Rounds that
//! are already terminal are skipped, and a validator that already voted is
//! refused by the consensus layer itself.

use std::sync::Arc;

use async_trait::async_trait;
use pm_02_blockchain_ledger::LedgerApi;
use pm_04_stake_consensus::{StakeConsensusApi, StakeError};
use pm_05_research_consensus::{ResearchConsensusApi, ResearchError};
use pm_07_consensus_orchestrator::OrchestratorApi;
use shared_types::{short_hex, Block, FinalityStage};
use tracing::{debug, warn};

use crate::scheduler::PeriodicTask;

/// Submissions made by one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundStats {
    pub stake_submissions: usize,
    pub research_submissions: usize,
    pub failures: usize,
}

pub struct ValidatorRounds {
    ledger: Arc<dyn LedgerApi>,
    stake: Arc<dyn StakeConsensusApi>,
    research: Arc<dyn ResearchConsensusApi>,
    orchestrator: Arc<dyn OrchestratorApi>,
    max_blocks: usize,
}

impl ValidatorRounds {
    pub fn new(
        ledger: Arc<dyn LedgerApi>,
        stake: Arc<dyn StakeConsensusApi>,
        research: Arc<dyn ResearchConsensusApi>,
        orchestrator: Arc<dyn OrchestratorApi>,
        max_blocks: usize,
    ) -> Self {
        Self {
            ledger,
            stake,
            research,
            orchestrator,
            max_blocks,
        }
    }

    /// One pass over pending blocks, lowest index first.
    pub async fn run_round(&self) -> anyhow::Result<RoundStats> {
        let mut stats = RoundStats::default();
        let pending = self.orchestrator.pending_blocks().await;

        for finality in pending.into_iter().take(self.max_blocks) {
            let Some(block) = self.ledger.block(finality.index).await? else {
                warn!(index = finality.index, "[validators] Tracked block missing from ledger");
                continue;
            };
            if block.block_hash != finality.block_hash {
                warn!(
                    index = finality.index,
                    tracked = %short_hex(&finality.block_hash),
                    stored = %short_hex(&block.block_hash),
                    "[validators] Tracked block differs from stored block"
                );
                continue;
            }

            match finality.stage {
                FinalityStage::Provisional => self.stake_round(&block, &mut stats).await?,
                FinalityStage::Staked => self.research_round(&block, &mut stats).await?,
                _ => {}
            }
        }
        Ok(stats)
    }

    async fn stake_round(&self, block: &Block, stats: &mut RoundStats) -> anyhow::Result<()> {
        let validators = self.stake.validators().await?;
        for item in &block.work_items {
            if self.stake.aggregate(item.id).await?.is_terminal() {
                continue;
            }
            for validator in validators.iter().filter(|v| v.active) {
                match self.stake.submit_validation(item, &validator.id).await {
                    Ok(_) => stats.stake_submissions += 1,
                    Err(
                        StakeError::DuplicateValidation { .. } | StakeError::ConsensusClosed(_),
                    ) => {}
                    Err(e @ (StakeError::InsufficientStake { .. }
                    | StakeError::NotEligible(_)
                    | StakeError::MalformedSubmission { .. })) => {
                        debug!(validator = %validator.id, error = %e, "[validators] Stake vote skipped");
                    }
                    Err(e) => {
                        stats.failures += 1;
                        warn!(validator = %validator.id, error = %e, "[validators] Stake vote failed");
                    }
                }
            }
        }
        Ok(())
    }

    async fn research_round(&self, block: &Block, stats: &mut RoundStats) -> anyhow::Result<()> {
        if self.research.status(block.block_hash).await?.is_terminal() {
            return Ok(());
        }
        let researchers = self.research.researchers().await?;
        for researcher in researchers.iter().filter(|v| v.active) {
            match self.research.submit_validation(block, &researcher.id).await {
                Ok(_) => stats.research_submissions += 1,
                Err(ResearchError::DuplicateValidation { .. }) => {}
                // The round closed under us; nothing left to do on this block.
                Err(ResearchError::ConsensusClosed(_)) => break,
                Err(e @ (ResearchError::NotEligible(_)
                | ResearchError::MalformedSubmission { .. })) => {
                    debug!(researcher = %researcher.id, error = %e, "[validators] Research vote skipped");
                }
                Err(e) => {
                    stats.failures += 1;
                    warn!(researcher = %researcher.id, error = %e, "[validators] Research vote failed");
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PeriodicTask for ValidatorRounds {
    async fn run(&self) -> anyhow::Result<()> {
        let stats = self.run_round().await?;
        if stats.stake_submissions + stats.research_submissions > 0 {
            debug!(
                stake = stats.stake_submissions,
                research = stats.research_submissions,
                "[validators] Round submitted"
            );
        }
        if stats.failures > 0 {
            anyhow::bail!("{} validator submissions failed", stats.failures);
        }
        Ok(())
    }
}
