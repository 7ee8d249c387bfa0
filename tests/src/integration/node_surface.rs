//! # NodeApi Over a Full Container
//!
//! The query and command surface an outer layer (HTTP, dashboard) would
//! call, exercised against the production wiring.

use std::sync::Arc;
use std::time::Duration;

use node_runtime::genesis::bootstrap_roster;
use node_runtime::{NodeConfig, NodeContainer, NodeError, NodeRuntime};
use node_runtime::tasks::HealthWarning;
use pm_01_ledger_store::InMemoryLedgerStore;
use pm_03_mining_coordinator::{CancelOutcome, MiningApi, MiningRequest, OperationState};
use pm_04_stake_consensus::StakeError;
use pm_06_immutable_records::{ActivityEvent, RecordChainApi};
use shared_types::{
    Block, ChainId, ChainState, FinalityStage, ManualTimeSource, MinerId, OperatorAlert, TargetRef,
    ValidatorId, WorkItemId, WorkType,
};

use super::harness::START_MILLIS;

struct Node {
    runtime: NodeRuntime,
    store: Arc<InMemoryLedgerStore>,
    clock: Arc<ManualTimeSource>,
}

fn create_test_node(config: NodeConfig) -> Node {
    let store = Arc::new(InMemoryLedgerStore::new());
    let clock = Arc::new(ManualTimeSource::new(START_MILLIS));
    let (container, alerts) = NodeContainer::with_parts(config, store.clone(), clock.clone());
    Node {
        runtime: NodeRuntime::from_container(container, alerts),
        store,
        clock,
    }
}

fn request(difficulty: u32) -> MiningRequest {
    MiningRequest {
        work_type: WorkType::EllipticCurveCrypto,
        difficulty,
        miner_id: MinerId::new("api-miner"),
    }
}

/// Submit, force completion and commit one block through the pipeline.
async fn mine_block(node: &Node) -> Block {
    let container = node.runtime.container();
    let op = node
        .runtime
        .api()
        .submit_mining_operation(request(60))
        .await
        .unwrap();
    let item = container
        .mining
        .complete(op.id)
        .await
        .unwrap()
        .work_item()
        .cloned()
        .unwrap();
    node.clock.advance(1_000);
    node.runtime.pipeline().commit(item).await.unwrap().block
}

async fn bootstrap(node: &Node) {
    let container = node.runtime.container();
    bootstrap_roster(
        &container.config.genesis,
        container.stake.as_ref(),
        container.research.as_ref(),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_mining_commands_and_queries() {
    let node = create_test_node(NodeConfig::default());
    let api = node.runtime.api();

    let op = api.submit_mining_operation(request(55)).await.unwrap();
    assert_eq!(op.state, OperationState::Active);
    assert_eq!(api.active_operations().await.len(), 1);
    assert_eq!(api.cancel_operation(op.id).await.unwrap(), CancelOutcome::Cancelled);
    assert_eq!(
        api.operation(op.id).await.unwrap().state,
        OperationState::Cancelled
    );
    assert!(matches!(
        api.submit_mining_operation(request(5_000)).await,
        Err(NodeError::Mining(_))
    ));

    let block = mine_block(&node).await;
    let head = api.chain_head().await.unwrap().unwrap();
    assert_eq!(head.block_hash, block.block_hash);
    assert_eq!(api.block(0).await.unwrap().unwrap(), block);
    assert_eq!(api.recent_blocks(usize::MAX).await.unwrap().len(), 1);
    assert_eq!(
        api.finality(block.block_hash).await.unwrap().stage,
        FinalityStage::Provisional
    );
    assert_eq!(api.canonical_height().await, 1);
}

#[tokio::test]
async fn test_validator_commands() {
    let node = create_test_node(NodeConfig::default());
    bootstrap(&node).await;
    let api = node.runtime.api();
    let roster = api.validators().await.unwrap();
    assert_eq!(roster.stake_holders.len(), 5);
    assert_eq!(roster.researchers.len(), 4);

    let block = mine_block(&node).await;
    let item_id = block.work_items[0].id;
    let validator = ValidatorId::new("validator-1");
    api.submit_stake_validation(item_id, &validator).await.unwrap();
    assert!(matches!(
        api.submit_stake_validation(item_id, &validator).await,
        Err(NodeError::Stake(StakeError::DuplicateValidation { .. }))
    ));
    assert!(matches!(
        api.submit_stake_validation(WorkItemId::new(), &validator).await,
        Err(NodeError::WorkItemNotFound(_))
    ));
    let status = api
        .consensus_status(TargetRef::WorkItem(item_id))
        .await
        .unwrap();
    assert_eq!(status.validations, 1);

    let review = api
        .submit_research_validation(block.block_hash, &ValidatorId::new("researcher-1"))
        .await
        .unwrap();
    assert_eq!(review.result.validations, 1);
    assert!((0.0..=100.0).contains(&review.score));
    assert!(matches!(
        api.submit_research_validation([0xAB; 32], &ValidatorId::new("researcher-1"))
            .await,
        Err(NodeError::BlockNotFound(_))
    ));
}

#[tokio::test]
async fn test_verification_commands_and_resume() {
    let node = create_test_node(NodeConfig::default());
    let api = node.runtime.api();
    for _ in 0..3 {
        mine_block(&node).await;
    }
    assert!(api.verify_chain().await.unwrap().is_valid());

    node.store.tamper_block(1, |block| block.nonce += 1);
    let report = api.verify_chain().await.unwrap();
    assert_eq!(report.fault.unwrap().index, 1);

    let status = api.status().await.unwrap();
    assert!(status.ledger_state.is_halted());
    assert!(status.head_time.is_some());
    let health = api.health().await.unwrap();
    assert!(health
        .warnings
        .iter()
        .any(|w| matches!(w, HealthWarning::LedgerHalted { .. })));

    api.resume_ledger().await.unwrap();
    assert_eq!(api.status().await.unwrap().ledger_state, ChainState::Running);
}

#[tokio::test]
async fn test_record_chain_commands() {
    let node = create_test_node(NodeConfig::default());
    let api = node.runtime.api();
    let chain = ChainId::new("audit");
    let records = node.runtime.container().records.clone();
    for n in 0..3 {
        records
            .append(
                &chain,
                ActivityEvent::new("security_scan", serde_json::json!({ "scan": n })),
            )
            .await
            .unwrap();
    }
    assert!(api.record_chains().await.unwrap().contains(&chain));
    assert!(api.verify_record_chain(&chain, None).await.unwrap().is_valid());

    node.store
        .tamper_record(&chain, 2, |record| record.payload = serde_json::json!({}));
    let report = api.verify_record_chain(&chain, None).await.unwrap();
    assert_eq!(report.first_broken_sequence(), Some(2));
    api.resume_record_chain(&chain).await.unwrap();
}

#[tokio::test]
async fn test_started_runtime_surfaces_operator_alerts() {
    let mut config = NodeConfig::default();
    config.runtime.autonomous_miners = 0;
    let node = create_test_node(config);
    node.runtime.start().await.unwrap();
    let api = node.runtime.api();

    mine_block(&node).await;
    node.store.tamper_block(0, |block| block.timestamp += 7);
    api.verify_chain().await.unwrap();

    let mut surfaced = false;
    for _ in 0..50 {
        if api
            .recent_alerts()
            .iter()
            .any(|a| matches!(a, OperatorAlert::LedgerHalted { .. }))
        {
            surfaced = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(surfaced, "ledger halt never reached the operator console");
    assert!(api.metrics().unwrap().contains("pm_"));

    node.runtime.shutdown().await;
}
