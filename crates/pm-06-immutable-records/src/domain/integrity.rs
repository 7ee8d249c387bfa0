//! Record and chain verification.
//!
//! A record is self-consistent when its payload, header and signature all
//! re-verify. A chain is intact when every record is self-consistent, the
//! sequences are gap-free from 1 and each record links to the previous
//! record's hash. Batches must additionally re-derive their merkle root.

use serde::{Deserialize, Serialize};
use shared_crypto::{merkle_root, verify_signature};
use shared_types::{ChainId, Hash, ImmutableRecord, GENESIS_HASH};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrityFault {
    /// Payload no longer hashes to `activity_hash`.
    ActivityHashMismatch,
    /// Header fields no longer hash to `record_hash`.
    RecordHashMismatch,
    InvalidSignature,
    /// Sequence is not the predecessor's plus one.
    SequenceGap,
    /// `previous_record_hash` does not match the predecessor.
    BrokenLink,
    /// A batch's activity hashes do not re-derive its merkle root.
    BatchRootMismatch,
}

impl fmt::Display for IntegrityFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntegrityFault::ActivityHashMismatch => "activity hash mismatch",
            IntegrityFault::RecordHashMismatch => "record hash mismatch",
            IntegrityFault::InvalidSignature => "invalid signature",
            IntegrityFault::SequenceGap => "sequence gap",
            IntegrityFault::BrokenLink => "broken hash link",
            IntegrityFault::BatchRootMismatch => "batch merkle root mismatch",
        };
        f.write_str(s)
    }
}

/// Re-verify a single record in isolation.
pub fn verify_record(record: &ImmutableRecord) -> Result<(), IntegrityFault> {
    if ImmutableRecord::hash_payload(&record.payload) != record.activity_hash {
        return Err(IntegrityFault::ActivityHashMismatch);
    }
    if record.compute_record_hash() != record.record_hash {
        return Err(IntegrityFault::RecordHashMismatch);
    }
    verify_signature(&record.signer, &record.record_hash, &record.signature)
        .map_err(|_| IntegrityFault::InvalidSignature)
}

/// Check `record`'s position relative to its predecessor.
pub fn check_link(
    record: &ImmutableRecord,
    previous: Option<&ImmutableRecord>,
) -> Result<(), IntegrityFault> {
    let (expected_sequence, expected_link) = match previous {
        Some(prev) => (prev.sequence + 1, prev.record_hash),
        None => (1, GENESIS_HASH),
    };
    if record.sequence != expected_sequence {
        return Err(IntegrityFault::SequenceGap);
    }
    if record.previous_record_hash != expected_link {
        return Err(IntegrityFault::BrokenLink);
    }
    Ok(())
}

/// The first broken record found on a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFault {
    pub sequence: u64,
    pub kind: IntegrityFault,
}

impl fmt::Display for RecordFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at sequence {}", self.kind, self.sequence)
    }
}

/// Result of walking a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainReport {
    pub chain_id: ChainId,
    /// Records that passed before the walk stopped.
    pub records_checked: u64,
    pub fault: Option<RecordFault>,
}

impl ChainReport {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.fault.is_none()
    }

    #[must_use]
    pub fn first_broken_sequence(&self) -> Option<u64> {
        self.fault.map(|f| f.sequence)
    }
}

/// Incremental chain verifier fed records in ascending sequence.
///
/// Stops being useful after the first fault; callers stop pushing.
#[derive(Debug, Default)]
pub struct ChainWalker {
    previous: Option<ImmutableRecord>,
    batch_root: Option<Hash>,
    batch_leaves: Vec<Hash>,
    checked: u64,
}

impl ChainWalker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ImmutableRecord) -> Result<(), RecordFault> {
        let sequence = record.sequence;
        let fault = |kind| RecordFault { sequence, kind };
        verify_record(&record).map_err(fault)?;
        check_link(&record, self.previous.as_ref()).map_err(fault)?;
        self.track_batch(&record).map_err(fault)?;
        self.checked += 1;
        self.previous = Some(record);
        Ok(())
    }

    #[must_use]
    pub fn checked(&self) -> u64 {
        self.checked
    }

    fn track_batch(&mut self, record: &ImmutableRecord) -> Result<(), IntegrityFault> {
        let Some(batch) = record.batch else {
            // A batch interrupted by an unbatched record is incomplete.
            return match self.batch_root {
                Some(_) => Err(IntegrityFault::BatchRootMismatch),
                None => Ok(()),
            };
        };
        if batch.position == 0 {
            if self.batch_root.is_some() {
                return Err(IntegrityFault::BatchRootMismatch);
            }
            self.batch_root = Some(batch.merkle_root);
            self.batch_leaves.clear();
        }
        if self.batch_root != Some(batch.merkle_root)
            || batch.position as usize != self.batch_leaves.len()
        {
            return Err(IntegrityFault::BatchRootMismatch);
        }
        self.batch_leaves.push(record.activity_hash);
        if self.batch_leaves.len() == batch.size as usize {
            if merkle_root(&self.batch_leaves) != batch.merkle_root {
                return Err(IntegrityFault::BatchRootMismatch);
            }
            self.batch_root = None;
            self.batch_leaves.clear();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::activity::{seal_record, ActivityEvent, RecordHeader};
    use proptest::prelude::*;
    use serde_json::json;
    use shared_crypto::Ed25519KeyPair;
    use shared_types::BatchMembership;

    fn create_test_chain(len: u64) -> Vec<ImmutableRecord> {
        let signer = Ed25519KeyPair::from_seed([9u8; 32]);
        let mut chain: Vec<ImmutableRecord> = Vec::new();
        for sequence in 1..=len {
            let header = RecordHeader {
                chain_id: ChainId::new("audit"),
                sequence,
                previous_record_hash: chain.last().map_or(GENESIS_HASH, |r| r.record_hash),
                batch: None,
                references: None,
                timestamp: sequence,
            };
            chain.push(seal_record(
                header,
                ActivityEvent::new("entry", json!({ "n": sequence })),
                &signer,
            ));
        }
        chain
    }

    fn walk(chain: Vec<ImmutableRecord>) -> Result<u64, RecordFault> {
        let mut walker = ChainWalker::new();
        for record in chain {
            walker.push(record)?;
        }
        Ok(walker.checked())
    }

    #[test]
    fn test_intact_chain_verifies() {
        assert_eq!(walk(create_test_chain(6)), Ok(6));
    }

    #[test]
    fn test_payload_edit_detected() {
        let mut record = create_test_chain(1).remove(0);
        record.payload = json!({ "n": 99 });
        assert_eq!(verify_record(&record), Err(IntegrityFault::ActivityHashMismatch));
    }

    #[test]
    fn test_rehashed_forgery_fails_signature() {
        let mut record = create_test_chain(1).remove(0);
        record.payload = json!({ "n": 99 });
        record.activity_hash = ImmutableRecord::hash_payload(&record.payload);
        record.record_hash = record.compute_record_hash();
        assert_eq!(verify_record(&record), Err(IntegrityFault::InvalidSignature));
    }

    #[test]
    fn test_missing_record_is_gap() {
        let mut chain = create_test_chain(4);
        chain.remove(2);
        assert_eq!(
            walk(chain),
            Err(RecordFault {
                sequence: 4,
                kind: IntegrityFault::SequenceGap
            })
        );
    }

    #[test]
    fn test_batch_root_checked() {
        let signer = Ed25519KeyPair::from_seed([9u8; 32]);
        let events: Vec<_> = (0..3)
            .map(|i| ActivityEvent::new("entry", json!({ "i": i })))
            .collect();
        let leaves: Vec<Hash> = events
            .iter()
            .map(|e| ImmutableRecord::hash_payload(&e.payload))
            .collect();
        let good_root = merkle_root(&leaves);

        let build = |root: Hash| {
            let mut chain: Vec<ImmutableRecord> = Vec::new();
            for (position, event) in events.iter().cloned().enumerate() {
                let header = RecordHeader {
                    chain_id: ChainId::new("audit"),
                    sequence: position as u64 + 1,
                    previous_record_hash: chain.last().map_or(GENESIS_HASH, |r| r.record_hash),
                    batch: Some(BatchMembership {
                        merkle_root: root,
                        position: position as u32,
                        size: 3,
                    }),
                    references: None,
                    timestamp: 1,
                };
                chain.push(seal_record(header, event, &signer));
            }
            chain
        };

        assert_eq!(walk(build(good_root)), Ok(3));
        assert_eq!(
            walk(build([7u8; 32])),
            Err(RecordFault {
                sequence: 3,
                kind: IntegrityFault::BatchRootMismatch
            })
        );
    }

    proptest! {
        #[test]
        fn prop_first_fault_is_tampered_record(len in 2u64..12, pick in 0u64..12) {
            let target = pick % len;
            let mut chain = create_test_chain(len);
            chain[target as usize].payload = json!("tampered");
            let fault = walk(chain).unwrap_err();
            prop_assert_eq!(fault.sequence, target + 1);
            prop_assert_eq!(fault.kind, IntegrityFault::ActivityHashMismatch);
        }
    }
}
