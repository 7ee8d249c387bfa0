//! # Productive-Mining Ledger Benchmarks
//!
//! | Subsystem | Operation | Target |
//! |-----------|-----------|--------|
//! | pm-02 Blockchain Ledger | Bounded PoW search (default budget) | < 1s |
//! | pm-02 Blockchain Ledger | Full chain verification, 1k blocks | < 50ms |
//! | pm-06 Immutable Records | Batch merkle root, 256 records | < 1ms |
//! | shared-crypto | Ed25519 sign + verify | < 1ms |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pm_02_blockchain_ledger::domain::{assemble_block, pow, BlockTemplate};
use pm_02_blockchain_ledger::{verify_chain, LedgerConfig};
use shared_crypto::{merkle_root, sha256, Ed25519KeyPair};
use shared_types::{Block, MinerId, OperationId, WorkItem, WorkItemId, WorkType};
use std::time::Duration;

fn create_work_item(seed: u64, difficulty: u32) -> WorkItem {
    WorkItem {
        id: WorkItemId::new(),
        operation_id: OperationId::new(),
        work_type: WorkType::ALL[(seed % 9) as usize],
        difficulty,
        value: 10.0 + seed as f64,
        result_digest: sha256(&seed.to_le_bytes()),
        computational_cost: 2.0,
        energy_consumed: 0.5,
        knowledge_created: 1.5,
        miner_id: MinerId::new("bench-miner"),
        created_at: seed,
        signer: [0u8; 32],
        signature: [0u8; 64],
    }
}

fn create_chain(len: u64, config: &LedgerConfig) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::with_capacity(len as usize);
    for i in 0..len {
        let template = BlockTemplate::extending(
            blocks.last(),
            MinerId::new("bench-miner"),
            vec![create_work_item(i, 30)],
            i * 1_000,
        );
        blocks.push(assemble_block(template, config).0);
    }
    blocks
}

// ============================================================================
// PM-02: Proof of Work
// ============================================================================

fn bench_pow_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("pm-02-pow");
    group.measurement_time(Duration::from_secs(10));
    let config = LedgerConfig::default();

    for difficulty in [40u32, 200, 600] {
        let template = BlockTemplate::extending(
            None,
            MinerId::new("bench-miner"),
            vec![create_work_item(u64::from(difficulty), difficulty)],
            0,
        );
        let (block, _) = assemble_block(template, &config);
        group.bench_with_input(
            BenchmarkId::new("search", difficulty),
            &block,
            |b, block| b.iter(|| black_box(pow::search(block, config.max_pow_iterations))),
        );
    }

    group.finish();
}

// ============================================================================
// PM-02: Chain Verification
// ============================================================================

fn bench_chain_verification(c: &mut Criterion) {
    let mut group = c.benchmark_group("pm-02-verification");
    let config = LedgerConfig::default();

    for len in [100u64, 1_000] {
        let chain = create_chain(len, &config);
        group.throughput(Throughput::Elements(len));
        group.bench_with_input(BenchmarkId::new("verify_chain", len), &chain, |b, chain| {
            b.iter(|| {
                let report = verify_chain(black_box(chain));
                assert!(report.is_valid());
                report
            })
        });
    }

    group.finish();
}

// ============================================================================
// PM-06 / SHARED-CRYPTO: Record Sealing
// ============================================================================

fn bench_record_sealing(c: &mut Criterion) {
    let mut group = c.benchmark_group("pm-06-sealing");

    for size in [16usize, 256] {
        let leaves: Vec<_> = (0..size as u64).map(|i| sha256(&i.to_le_bytes())).collect();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("batch_root", size), &leaves, |b, leaves| {
            b.iter(|| black_box(merkle_root(leaves)))
        });
    }

    let keypair = Ed25519KeyPair::from_seed([7u8; 32]);
    let public_key = keypair.public_key();
    let record_hash = sha256(b"record header");
    group.bench_function("ed25519_sign_verify", |b| {
        b.iter(|| {
            let signature = keypair.sign(&record_hash);
            black_box(public_key.verify(&record_hash, &signature).is_ok())
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_pow_search,
    bench_chain_verification,
    bench_record_sealing
);
criterion_main!(benches);
