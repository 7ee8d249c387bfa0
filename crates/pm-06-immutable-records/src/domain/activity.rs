//! Activity events and record sealing.

use serde::{Deserialize, Serialize};
use shared_crypto::Ed25519KeyPair;
use shared_types::{BatchMembership, ChainId, Hash, ImmutableRecord};

/// Something that happened and must be kept on an audit chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub activity_type: String,
    pub payload: serde_json::Value,
}

impl ActivityEvent {
    pub fn new(activity_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            activity_type: activity_type.into(),
            payload,
        }
    }
}

/// Where a new record goes.
#[derive(Debug, Clone)]
pub struct RecordHeader {
    pub chain_id: ChainId,
    pub sequence: u64,
    pub previous_record_hash: Hash,
    pub batch: Option<BatchMembership>,
    pub references: Option<Hash>,
    pub timestamp: u64,
}

/// Hash, link and sign `event` into a record.
///
/// The signature covers `record_hash`, which covers everything else.
#[must_use]
pub fn seal_record(
    header: RecordHeader,
    event: ActivityEvent,
    signer: &Ed25519KeyPair,
) -> ImmutableRecord {
    let mut record = ImmutableRecord {
        chain_id: header.chain_id,
        sequence: header.sequence,
        activity_hash: ImmutableRecord::hash_payload(&event.payload),
        activity_type: event.activity_type,
        payload: event.payload,
        previous_record_hash: header.previous_record_hash,
        batch: header.batch,
        references: header.references,
        timestamp: header.timestamp,
        record_hash: [0u8; 32],
        signer: signer.public_key().to_bytes(),
        signature: [0u8; 64],
    };
    record.record_hash = record.compute_record_hash();
    record.signature = signer.sign(&record.record_hash).to_bytes();
    record
}
