//! # Mined Work Item → Immutable Block
//!
//! ```text
//! [Mining (3)] ──WorkItem──→ [Ledger (2)] ──Block──→ [Orchestrator (7)]
//!                                                     │        │
//!                                          [Stake (4)]┘        └[Research (5)]
//!                                                     │
//!                                                     ▼
//!                                          [Record Chain (6)]
//! ```

use pm_02_blockchain_ledger::LedgerApi;
use pm_04_stake_consensus::StakeConsensusApi;
use pm_06_immutable_records::{RecordChainApi, BLOCK_FINALITY_CHAIN, VALIDATOR_REPUTATION_CHAIN};
use pm_07_consensus_orchestrator::OrchestratorApi;
use shared_bus::{EventFilter, MiningEvent};
use shared_types::{ChainId, FinalityStage};

use super::harness::Harness;

const STAKE_HOLDERS: [(&str, u64); 3] = [("a", 100), ("b", 100), ("c", 100)];
const RESEARCHERS: [&str; 3] = ["r82", "r75", "r55"];

async fn create_staffed_harness() -> Harness {
    let h = Harness::new();
    h.register_stake(&STAKE_HOLDERS).await;
    h.register_researchers(&RESEARCHERS).await;
    h
}

#[tokio::test]
async fn test_mined_block_reaches_immutable() {
    let h = create_staffed_harness().await;
    let block = h.mine_block().await;
    assert_eq!(block.index, 0);

    // Nothing voted yet: the block waits.
    assert_eq!(
        h.orchestrator.process(block.block_hash).await.unwrap(),
        FinalityStage::Provisional
    );

    h.stake_votes(&block, &["a", "b", "c"]).await;
    assert_eq!(
        h.orchestrator.process(block.block_hash).await.unwrap(),
        FinalityStage::Staked
    );

    h.research_votes(&block, &RESEARCHERS).await;
    assert_eq!(
        h.orchestrator.process(block.block_hash).await.unwrap(),
        FinalityStage::Immutable
    );

    let finality = h
        .records
        .records(&ChainId::new(BLOCK_FINALITY_CHAIN), 1, 10)
        .await
        .unwrap();
    assert_eq!(finality.len(), 1);
    assert_eq!(finality[0].activity_type, "block_certified");
    assert_eq!(
        finality[0].payload["block_hash"],
        serde_json::json!(hex::encode(block.block_hash))
    );
    assert_eq!(h.orchestrator.canonical_height().await, 1);
}

#[tokio::test]
async fn test_confirmed_block_rewards_stake_validators() {
    let h = create_staffed_harness().await;
    let block = h.mine_block().await;
    h.stake_votes(&block, &["a", "b", "c"]).await;
    h.research_votes(&block, &RESEARCHERS).await;
    h.orchestrator.process(block.block_hash).await.unwrap();

    for validator in h.stake.validators().await.unwrap() {
        assert!(
            validator.reputation > 50.0,
            "{} should have gained reputation",
            validator.id
        );
    }
    let adjustments = h
        .records
        .records(&ChainId::new(VALIDATOR_REPUTATION_CHAIN), 1, 10)
        .await
        .unwrap();
    assert_eq!(adjustments.len(), 3);
    assert!(adjustments.iter().all(|r| r.activity_type == "reputation_adjusted"));
    let report = h
        .records
        .verify_chain(&ChainId::new(VALIDATOR_REPUTATION_CHAIN), None)
        .await
        .unwrap();
    assert!(report.is_valid());
}

#[tokio::test]
async fn test_events_follow_causal_order() {
    let h = create_staffed_harness().await;
    let mut sub = h.bus.subscribe(EventFilter::all());

    let block = h.mine_block().await;
    h.stake_votes(&block, &["a", "b", "c"]).await;
    h.research_votes(&block, &RESEARCHERS).await;
    h.orchestrator.process(block.block_hash).await.unwrap();

    let events = sub.drain();
    let position = |kind: &str| {
        events
            .iter()
            .position(|e| e.kind() == kind)
            .unwrap_or_else(|| panic!("no {kind} event"))
    };
    assert!(position("mining_started") < position("new_discovery"));
    assert!(position("new_discovery") < position("new_block"));
    assert!(position("new_block") < position("finality_advanced"));
    assert!(position("validation_submitted") < position("consensus_reached"));
    assert!(position("record_appended") > position("new_block"));

    let stages: Vec<FinalityStage> = events
        .iter()
        .filter_map(|e| match e {
            MiningEvent::FinalityAdvanced { stage, .. } => Some(stage.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        stages,
        vec![
            FinalityStage::Provisional,
            FinalityStage::Staked,
            FinalityStage::Certified,
            FinalityStage::Immutable,
        ]
    );
}

#[tokio::test]
async fn test_successive_blocks_link_and_finalize() {
    let h = create_staffed_harness().await;
    let mut blocks = Vec::new();
    for _ in 0..3 {
        blocks.push(h.mine_block().await);
    }
    for pair in blocks.windows(2) {
        assert_eq!(pair[1].index, pair[0].index + 1);
        assert_eq!(pair[1].previous_hash, pair[0].block_hash);
    }

    for block in &blocks {
        h.stake_votes(block, &["a", "b", "c"]).await;
        h.research_votes(block, &RESEARCHERS).await;
    }
    let outcomes = h.orchestrator.process_pending().await;
    assert_eq!(outcomes.len(), 3);
    assert!(outcomes
        .iter()
        .all(|(_, stage)| matches!(stage, Ok(FinalityStage::Immutable))));
    assert!(h.orchestrator.pending_blocks().await.is_empty());

    let verification = h.ledger.verify_stored_chain().await.unwrap();
    assert!(verification.is_valid());
    assert_eq!(verification.blocks_checked, 3);
}

#[tokio::test]
async fn test_rejected_block_leaves_canonical_chain() {
    let h = Harness::new();
    h.register_stake(&[("no-a", 100), ("no-b", 100), ("no-c", 100), ("a", 100)])
        .await;
    h.register_researchers(&RESEARCHERS).await;

    let rejected = h.mine_block().await;
    h.stake_votes(&rejected, &["no-a", "no-b", "no-c"]).await;
    let stage = h.orchestrator.process(rejected.block_hash).await.unwrap();
    assert!(stage.is_rejected());

    // The block stays in storage but not in the canonical count.
    assert!(h.ledger.block(rejected.index).await.unwrap().is_some());
    assert_eq!(h.orchestrator.canonical_height().await, 0);
    let rejected_blocks = h.orchestrator.rejected_blocks().await;
    assert_eq!(rejected_blocks.len(), 1);
    assert_eq!(rejected_blocks[0].block_hash, rejected.block_hash);

    let finality = h
        .records
        .records(&ChainId::new(BLOCK_FINALITY_CHAIN), 1, 10)
        .await
        .unwrap();
    assert_eq!(finality[0].activity_type, "block_rejected");

    // Later blocks still extend the ledger and finalize.
    let next = h.mine_block().await;
    assert_eq!(next.previous_hash, rejected.block_hash);
    h.stake_votes(&next, &["a", "no-a", "no-b"]).await;
    assert!(h
        .orchestrator
        .process(next.block_hash)
        .await
        .unwrap()
        .is_rejected());
    assert_eq!(h.orchestrator.canonical_height().await, 0);
}
