//! # Consensus Thresholds End to End
//!
//! Stake-weighted and quality-weighted rounds driven through real
//! services, with the orchestrator reading their verdicts.

use pm_04_stake_consensus::{StakeConsensusApi, StakeError};
use pm_05_research_consensus::{ResearchConsensusApi, ResearchError};
use pm_07_consensus_orchestrator::OrchestratorApi;
use shared_types::{
    ConsensusLayer, FinalDecision, FinalityStage, OperatorAlert, TimeSource, ValidatorId,
};

use super::harness::Harness;

#[tokio::test]
async fn test_weighted_stake_scenario() {
    let h = Harness::new();
    h.register_stake(&[
        ("a", 100),
        ("b", 100),
        ("c", 100),
        ("no-d", 50),
        ("no-e", 50),
    ])
    .await;
    let block = h.mine_block().await;
    h.stake_votes(&block, &["a", "b", "c", "no-d", "no-e"]).await;

    let item = block.work_items[0].id;
    let result = h.stake.aggregate(item).await.unwrap();
    assert_eq!(result.approving_weight, 300.0);
    assert_eq!(result.total_weight, 400.0);
    assert_eq!(result.approval_ratio, 0.75);
    assert_eq!(result.decision(), Some(FinalDecision::Accepted));

    assert_eq!(
        h.orchestrator.process(block.block_hash).await.unwrap(),
        FinalityStage::Staked
    );
}

#[tokio::test]
async fn test_stake_waits_for_min_validators() {
    let h = Harness::new();
    h.register_stake(&[("a", 100), ("b", 100), ("no-c", 500)]).await;
    let block = h.mine_block().await;

    // Two unanimous approvals are still short of the minimum.
    h.stake_votes(&block, &["a", "b"]).await;
    assert_eq!(
        h.orchestrator.process(block.block_hash).await.unwrap(),
        FinalityStage::Provisional
    );

    // The heavy rejection arriving third decides the round.
    h.stake_votes(&block, &["no-c"]).await;
    assert!(h
        .orchestrator
        .process(block.block_hash)
        .await
        .unwrap()
        .is_rejected());
}

#[tokio::test]
async fn test_stake_result_independent_of_vote_order() {
    let h = Harness::new();
    h.register_stake(&[("a", 100), ("no-b", 70), ("c", 30)]).await;
    let first = h.mine_block().await;
    let second = h.mine_block().await;

    h.stake_votes(&first, &["a", "no-b", "c"]).await;
    h.stake_votes(&second, &["c", "a", "no-b"]).await;

    let x = h.stake.aggregate(first.work_items[0].id).await.unwrap();
    let y = h.stake.aggregate(second.work_items[0].id).await.unwrap();
    assert_eq!(x.approving_weight, y.approving_weight);
    assert_eq!(x.total_weight, y.total_weight);
    assert_eq!(x.approval_ratio, y.approval_ratio);
    assert_eq!(x.stage, y.stage);
}

#[tokio::test]
async fn test_insufficient_stake_refused() {
    let h = Harness::new();
    h.register_stake(&[("poor", 5)]).await;
    let block = h.mine_block().await;

    let err = h
        .stake
        .submit_validation(&block.work_items[0], &ValidatorId::new("poor"))
        .await
        .unwrap_err();
    assert!(matches!(err, StakeError::InsufficientStake { stake: 5, .. }));
}

#[tokio::test]
async fn test_research_scenario_certifies_block() {
    let h = Harness::new();
    h.register_stake(&[("a", 100), ("b", 100), ("c", 100)]).await;
    h.register_researchers(&["r82", "r75", "r55"]).await;
    let block = h.mine_block().await;
    h.stake_votes(&block, &["a", "b", "c"]).await;
    h.research_votes(&block, &["r82", "r75", "r55"]).await;

    let status = h.research.status(block.block_hash).await.unwrap();
    assert_eq!(status.layer, ConsensusLayer::Research);
    assert_eq!(status.approvals, 2);
    assert_eq!(status.approval_ratio, 0.667);
    let quality = status.average_quality.unwrap();
    assert!((quality - 70.667).abs() < 0.001, "average quality {quality}");
    assert_eq!(status.decision(), Some(FinalDecision::Accepted));

    assert_eq!(
        h.orchestrator.process(block.block_hash).await.unwrap(),
        FinalityStage::Immutable
    );
}

#[tokio::test]
async fn test_low_quality_research_rejects_block() {
    let h = Harness::new();
    h.register_stake(&[("a", 100), ("b", 100), ("c", 100)]).await;
    h.register_researchers(&["r60", "r65", "r90"]).await;
    let block = h.mine_block().await;
    h.stake_votes(&block, &["a", "b", "c"]).await;
    h.research_votes(&block, &["r60", "r65", "r90"]).await;

    let stage = h.orchestrator.process(block.block_hash).await.unwrap();
    match stage {
        FinalityStage::Rejected { reason } => {
            assert!(reason.contains("research consensus rejected"), "{reason}");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_research_round_closes_after_required_validations() {
    let h = Harness::new();
    h.register_researchers(&["r82", "r75", "r90", "r70"]).await;
    let block = h.mine_block().await;
    h.research_votes(&block, &["r82", "r75", "r90"]).await;

    assert!(matches!(
        h.research
            .submit_validation(&block, &ValidatorId::new("r70"))
            .await,
        Err(ResearchError::ConsensusClosed(_))
    ));
}

#[tokio::test]
async fn test_stalled_round_alerts_operator() {
    let mut h = Harness::new();
    h.register_stake(&[("a", 100), ("b", 100), ("c", 100)]).await;
    let block = h.mine_block().await;
    h.stake_votes(&block, &["a"]).await;

    assert!(h
        .orchestrator
        .sweep_stalled(h.clock.now_millis())
        .await
        .unwrap()
        .is_empty());

    h.clock.advance(10 * 60 * 1_000);
    let reports = h
        .orchestrator
        .sweep_stalled(h.clock.now_millis())
        .await
        .unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].layer, ConsensusLayer::Stake);
    assert_eq!(reports[0].validations, 1);

    let alerts = h.drain_alerts();
    assert!(alerts
        .iter()
        .any(|a| matches!(a, OperatorAlert::ConsensusTimeout(r) if r.validations == 1)));

    // A stalled round still accepts the validations it was missing.
    h.stake_votes(&block, &["b", "c"]).await;
    assert_eq!(
        h.orchestrator.process(block.block_hash).await.unwrap(),
        FinalityStage::Staked
    );
}
