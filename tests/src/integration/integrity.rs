//! # Tamper Detection, Halts and Resume
//!
//! Corruption is injected straight into the store, below every service,
//! then found again through the public verification APIs.

use std::sync::Arc;

use pm_02_blockchain_ledger::{FaultKind, LedgerApi, LedgerConfig, LedgerError};
use pm_06_immutable_records::{ActivityEvent, IntegrityFault, RecordChainApi, RecordError};
use serde_json::json;
use shared_types::{ChainId, ChainState, OperatorAlert, WorkType};

use super::harness::Harness;

fn audit_event(n: u64) -> ActivityEvent {
    ActivityEvent::new("model_training", json!({ "run": n, "loss": 0.25 }))
}

async fn create_chain(h: &Harness, blocks: usize) {
    for _ in 0..blocks {
        h.mine_block().await;
    }
}

// =============================================================================
// BLOCK LEDGER
// =============================================================================

#[tokio::test]
async fn test_mid_chain_tamper_detected_and_halts_ledger() {
    let mut h = Harness::new();
    create_chain(&h, 4).await;
    assert!(h.ledger.verify_stored_chain().await.unwrap().is_valid());

    assert!(h.store.tamper_block(2, |block| block.timestamp += 1));
    let verification = h.ledger.verify_stored_chain().await.unwrap();
    let fault = verification.fault.unwrap();
    assert_eq!(fault.index, 2);
    assert_eq!(fault.kind, FaultKind::HashMismatch);
    assert_eq!(verification.blocks_checked, 2);

    assert!(h.ledger.state().await.is_halted());
    let item = h.mine(WorkType::NavierStokes, 40).await;
    let err = h.ledger.append_work_item(item.clone()).await.unwrap_err();
    assert!(matches!(err, LedgerError::Halted { .. }));
    assert!(err.is_critical());
    assert!(h
        .drain_alerts()
        .iter()
        .any(|a| matches!(a, OperatorAlert::LedgerHalted { .. })));

    h.ledger.resume().await.unwrap();
    assert_eq!(h.ledger.state().await, ChainState::Running);
    let block = h.ledger.append_work_item(item).await.unwrap();
    assert_eq!(block.index, 4);
}

#[tokio::test]
async fn test_tampered_work_item_breaks_merkle_root() {
    let h = Harness::new();
    create_chain(&h, 3).await;
    h.store
        .tamper_block(1, |block| block.work_items[0].value *= 10.0);

    let fault = h.ledger.verify_stored_chain().await.unwrap().fault.unwrap();
    assert_eq!(fault.index, 1);
    assert_eq!(fault.kind, FaultKind::MerkleMismatch);
}

#[tokio::test]
async fn test_stale_prior_is_recoverable_continuity_error() {
    let h = Harness::new();
    let first = h.mine_block().await;
    h.mine_block().await;

    let item = h.mine(WorkType::YangMills, 50).await;
    let err = h
        .ledger
        .create_block(item.clone(), item.miner_id.clone(), Some(first))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::ChainContinuity { .. }));
    assert!(err.is_recoverable());
    assert_eq!(h.ledger.state().await, ChainState::Running);

    // The same item still lands on the real head.
    assert_eq!(h.ledger.append_work_item(item).await.unwrap().index, 2);
}

#[tokio::test]
async fn test_work_item_included_once() {
    let h = Harness::new();
    let item = h.mine(WorkType::LatticeCrypto, 70).await;
    h.ledger.append_work_item(item.clone()).await.unwrap();
    assert!(matches!(
        h.ledger.append_work_item(item).await,
        Err(LedgerError::WorkItemAlreadyIncluded(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_appends_keep_chain_linear() {
    let h = Harness::with_ledger_config(LedgerConfig {
        max_append_retries: 64,
        ..LedgerConfig::default()
    });
    let mut items = Vec::new();
    for _ in 0..8 {
        items.push(h.mine(WorkType::GoldbachVerification, 30).await);
    }

    let handles: Vec<_> = items
        .into_iter()
        .map(|item| {
            let ledger = Arc::clone(&h.ledger);
            tokio::spawn(async move { ledger.append_work_item(item).await })
        })
        .collect();
    let mut indices = Vec::new();
    for handle in handles {
        indices.push(handle.await.unwrap().unwrap().index);
    }
    indices.sort_unstable();
    assert_eq!(indices, (0..8).collect::<Vec<u64>>());

    let verification = h.ledger.verify_stored_chain().await.unwrap();
    assert!(verification.is_valid());
    assert_eq!(verification.blocks_checked, 8);
}

// =============================================================================
// IMMUTABLE RECORD CHAIN
// =============================================================================

#[tokio::test]
async fn test_record_tamper_halts_only_that_chain() {
    let mut h = Harness::new();
    let audit = ChainId::new("audit");
    let other = ChainId::new("security-events");
    for n in 1..=5 {
        h.records.append(&audit, audit_event(n)).await.unwrap();
    }
    h.records.append(&other, audit_event(0)).await.unwrap();

    assert!(h.store.tamper_record(&audit, 3, |record| {
        record.payload = json!({ "run": 3, "loss": 0.01 });
    }));
    let report = h.records.verify_chain(&audit, None).await.unwrap();
    let fault = report.fault.unwrap();
    assert_eq!(fault.sequence, 3);
    assert_eq!(fault.kind, IntegrityFault::ActivityHashMismatch);
    assert_eq!(report.records_checked, 2);

    assert!(h.records.chain_state(&audit).await.is_halted());
    assert!(matches!(
        h.records.append(&audit, audit_event(6)).await,
        Err(RecordError::ChainHalted { .. })
    ));
    assert!(h.records.append(&other, audit_event(1)).await.is_ok());
    assert!(h.drain_alerts().iter().any(|a| matches!(
        a,
        OperatorAlert::RecordChainHalted { sequence: 3, .. }
    )));

    h.records.resume_chain(&audit).await.unwrap();
    let record = h.records.append(&audit, audit_event(6)).await.unwrap();
    assert_eq!(record.sequence, 6);
}

#[tokio::test]
async fn test_verify_chain_prefix_ignores_later_tamper() {
    let h = Harness::new();
    let audit = ChainId::new("audit");
    for n in 1..=4 {
        h.records.append(&audit, audit_event(n)).await.unwrap();
    }
    h.store.tamper_record(&audit, 4, |record| record.timestamp += 1);

    let prefix = h.records.verify_chain(&audit, Some(3)).await.unwrap();
    assert!(prefix.is_valid());
    assert_eq!(prefix.records_checked, 3);
    assert_eq!(h.records.chain_state(&audit).await, ChainState::Running);
}

#[tokio::test]
async fn test_verify_integrity_reports_without_halting() {
    let h = Harness::new();
    let audit = ChainId::new("audit");
    h.records.append(&audit, audit_event(1)).await.unwrap();
    h.store
        .tamper_record(&audit, 1, |record| record.activity_type = "forged".into());

    let tampered = h.records.latest(&audit).await.unwrap().unwrap();
    assert!(matches!(
        h.records.verify_integrity(&tampered).await,
        Err(RecordError::IntegrityViolation { sequence: 1, .. })
    ));
    assert_eq!(h.records.chain_state(&audit).await, ChainState::Running);
}

#[tokio::test]
async fn test_batch_and_correction_stay_verifiable() {
    let h = Harness::new();
    let audit = ChainId::new("audit");
    let batch = h
        .records
        .append_batch(&audit, (1..=3).map(audit_event).collect())
        .await
        .unwrap();
    let sequences: Vec<u64> = batch.iter().map(|r| r.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3]);
    let root = batch[0].batch.as_ref().unwrap().merkle_root;
    assert!(batch
        .iter()
        .all(|r| r.batch.as_ref().is_some_and(|b| b.merkle_root == root && b.size == 3)));

    // Corrections may land on another chain than the record they amend.
    let corrections = ChainId::new("corrections");
    let correction = h
        .records
        .correct(
            &corrections,
            batch[1].record_hash,
            ActivityEvent::new("correction", json!({ "run": 2, "loss": 0.3 })),
        )
        .await
        .unwrap();
    assert_eq!(correction.references, Some(batch[1].record_hash));

    assert!(h.records.verify_chain(&audit, None).await.unwrap().is_valid());
    assert!(h
        .records
        .verify_chain(&corrections, None)
        .await
        .unwrap()
        .is_valid());
    assert!(matches!(
        h.records
            .correct(&corrections, [0xEE; 32], audit_event(9))
            .await,
        Err(RecordError::OriginalNotFound(_))
    ));
}
