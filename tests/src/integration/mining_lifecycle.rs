//! # Mining Operation Lifecycle
//!
//! Cancellation and completion races observed from the ledger and the bus.

use std::sync::Arc;

use pm_02_blockchain_ledger::LedgerApi;
use pm_03_mining_coordinator::{
    CancelOutcome, CompletionOutcome, MiningApi, MiningError, MiningRequest, OperationState,
    TickOutcome,
};
use shared_bus::{EventFilter, EventTopic, MiningEvent};
use shared_types::{MinerId, OperationId, TimeSource, WorkType};

use super::harness::Harness;

async fn start(h: &Harness, difficulty: u32) -> OperationId {
    h.mining
        .start_operation(MiningRequest {
            work_type: WorkType::BirchSwinnertonDyer,
            difficulty,
            miner_id: MinerId::new("lifecycle-miner"),
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_cancel_at_ninety_percent_emits_nothing() {
    let h = Harness::new();
    let mut sub = h.bus.subscribe(EventFilter::topics(vec![EventTopic::Mining]));
    let id = start(&h, 80).await;

    assert_eq!(
        h.mining.tick(id, 0.9).await.unwrap(),
        TickOutcome::Progressed(0.9)
    );
    assert_eq!(h.mining.cancel(id).await.unwrap(), CancelOutcome::Cancelled);

    assert!(matches!(
        h.mining.tick(id, 0.2).await,
        Err(MiningError::OperationCancelled(_))
    ));
    assert!(matches!(
        h.mining.complete(id).await,
        Err(MiningError::OperationCancelled(_))
    ));
    assert_eq!(
        h.mining.cancel(id).await.unwrap(),
        CancelOutcome::NoOpCancellation
    );

    let snapshot = h.mining.operation(id).await.unwrap();
    assert_eq!(snapshot.state, OperationState::Cancelled);
    assert!(snapshot.work_item_id.is_none());
    assert!(!sub
        .drain()
        .iter()
        .any(|e| matches!(e, MiningEvent::WorkItemCreated { .. })));
    assert!(h.ledger.head().await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_completion_emits_once() {
    let h = Harness::new();
    let mut sub = h.bus.subscribe(EventFilter::topics(vec![EventTopic::Mining]));
    let id = start(&h, 120).await;

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let mining = Arc::clone(&h.mining);
            tokio::spawn(async move { mining.complete(id).await })
        })
        .collect();
    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(outcomes.iter().filter(|o| o.is_first()).count(), 1);
    let emitted = outcomes
        .iter()
        .find_map(|o| match o {
            CompletionOutcome::Emitted(item) => Some(item.clone()),
            _ => None,
        })
        .unwrap();
    for outcome in &outcomes {
        if let Some(item) = outcome.work_item() {
            assert_eq!(item.id, emitted.id);
        }
    }

    // Late callers see the same item.
    assert_eq!(
        h.mining.complete(id).await.unwrap(),
        CompletionOutcome::AlreadyEmitted(emitted.clone())
    );
    let created = sub
        .drain()
        .into_iter()
        .filter(|e| matches!(e, MiningEvent::WorkItemCreated { .. }))
        .count();
    assert_eq!(created, 1);

    let block = h.ledger.append_work_item(emitted).await.unwrap();
    assert_eq!(block.work_items.len(), 1);
}

#[tokio::test]
async fn test_ticks_drive_completion_into_ledger() {
    let h = Harness::new();
    let id = start(&h, 45).await;

    assert!(matches!(
        h.mining.tick(id, 0.5).await.unwrap(),
        TickOutcome::Progressed(_)
    ));
    let item = match h.mining.tick(id, 0.6).await.unwrap() {
        TickOutcome::Completion(CompletionOutcome::Emitted(item)) => item,
        other => panic!("expected completion, got {other:?}"),
    };
    assert_eq!(item.operation_id, id);
    assert_eq!(item.difficulty, 45);
    assert!(item.value > 0.0);

    // Further ticks replay the settled completion.
    assert!(matches!(
        h.mining.tick(id, 0.1).await.unwrap(),
        TickOutcome::Completion(CompletionOutcome::AlreadyEmitted(_))
    ));

    let block = h.ledger.append_work_item(item.clone()).await.unwrap();
    assert_eq!(block.work_items[0].id, item.id);
    assert_eq!(block.miner_id, item.miner_id);
    assert_eq!(
        h.mining.operation(id).await.unwrap().state,
        OperationState::Completed
    );
}

#[tokio::test]
async fn test_pruned_operation_is_forgotten() {
    let h = Harness::new();
    let id = start(&h, 50).await;
    h.mining.complete(id).await.unwrap();
    assert!(h.mining.active_operations().await.is_empty());

    h.clock.advance(60_000);
    assert_eq!(h.mining.prune_finished(h.clock.now_millis()).await, 1);
    assert!(h.mining.operation(id).await.is_none());
    assert!(matches!(
        h.mining.cancel(id).await,
        Err(MiningError::OperationNotFound(_))
    ));
}
