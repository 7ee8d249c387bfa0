//! Genesis roster bootstrap.

use pm_04_stake_consensus::{StakeConsensusApi, StakeError};
use pm_05_research_consensus::{ResearchConsensusApi, ResearchError};
use serde::{Deserialize, Serialize};
use shared_types::ValidatorId;
use std::collections::HashSet;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisStakeHolder {
    pub id: String,
    pub stake: u64,
}

/// Validators registered on first start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisConfig {
    pub stake_holders: Vec<GenesisStakeHolder>,
    pub researchers: Vec<String>,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        let stakes = [100, 100, 100, 50, 50];
        Self {
            stake_holders: stakes
                .iter()
                .enumerate()
                .map(|(i, stake)| GenesisStakeHolder {
                    id: format!("validator-{}", i + 1),
                    stake: *stake,
                })
                .collect(),
            researchers: (1..=4).map(|i| format!("researcher-{i}")).collect(),
        }
    }
}

#[derive(Debug, Error)]
pub enum GenesisError {
    #[error("Stake holder registration failed: {0}")]
    Stake(#[from] StakeError),

    #[error("Researcher registration failed: {0}")]
    Research(#[from] ResearchError),
}

/// Counts of what `bootstrap_roster` did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RosterSummary {
    pub stake_holders_registered: usize,
    pub researchers_registered: usize,
    pub already_present: usize,
}

/// Register every genesis validator that is not already known.
///
/// Existing validators keep their stake and reputation, so running this
/// against a store that outlived a restart is a no-op.
pub async fn bootstrap_roster(
    config: &GenesisConfig,
    stake: &dyn StakeConsensusApi,
    research: &dyn ResearchConsensusApi,
) -> Result<RosterSummary, GenesisError> {
    let mut summary = RosterSummary::default();

    let known: HashSet<ValidatorId> = stake
        .validators()
        .await?
        .into_iter()
        .map(|v| v.id)
        .chain(research.researchers().await?.into_iter().map(|v| v.id))
        .collect();

    for holder in &config.stake_holders {
        let id = ValidatorId::new(holder.id.as_str());
        if known.contains(&id) {
            summary.already_present += 1;
            continue;
        }
        stake.register_validator(id, holder.stake).await?;
        summary.stake_holders_registered += 1;
    }

    for researcher in &config.researchers {
        let id = ValidatorId::new(researcher.as_str());
        if known.contains(&id) {
            summary.already_present += 1;
            continue;
        }
        research.register_researcher(id).await?;
        summary.researchers_registered += 1;
    }

    info!(
        stake_holders = summary.stake_holders_registered,
        researchers = summary.researchers_registered,
        already_present = summary.already_present,
        "Genesis roster bootstrapped"
    );
    Ok(summary)
}
