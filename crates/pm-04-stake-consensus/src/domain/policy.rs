//! Stake decision policies.
//!
//! A policy must be a pure function of the work item and the validator so a
//! replay of the same submissions yields the same decisions.

use shared_crypto::{unit_interval, verify_signature};
use shared_types::{Decision, Validator, WorkItem};

const DECISION_DOMAIN: &str = "productive-mining pos decision v1";

/// Why a submission was excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Malformed(pub String);

pub trait StakeDecisionPolicy: Send + Sync {
    fn decide(&self, item: &WorkItem, validator: &Validator) -> Result<Decision, Malformed>;
}

/// Default policy.
///
/// Rejects outright anything whose signature or fields do not check out.
/// Otherwise approves when a BLAKE3-derived score for
/// `(content hash, validator id)` falls under `0.5 + reputation / 200`, so
/// higher reputation means more lenient review.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeterministicStakePolicy;

impl StakeDecisionPolicy for DeterministicStakePolicy {
    fn decide(&self, item: &WorkItem, validator: &Validator) -> Result<Decision, Malformed> {
        if !validator.reputation.is_finite() {
            return Err(Malformed(format!(
                "validator {} reputation is not a number",
                validator.id
            )));
        }
        let content = item.content_hash();
        if !item.is_well_formed() {
            return Ok(Decision::Rejected);
        }
        if verify_signature(&item.signer, &content, &item.signature).is_err() {
            return Ok(Decision::Rejected);
        }

        let score = unit_interval(DECISION_DOMAIN, &[&content, validator.id.as_str().as_bytes()]);
        let threshold = 0.5 + validator.reputation.clamp(0.0, 100.0) / 200.0;
        if score < threshold {
            Ok(Decision::Approved)
        } else {
            Ok(Decision::Rejected)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::Ed25519KeyPair;
    use shared_types::{MinerId, OperationId, ValidatorRole, WorkItemId, WorkType};

    fn create_signed_work_item(keypair: &Ed25519KeyPair) -> WorkItem {
        let mut item = WorkItem {
            id: WorkItemId::new(),
            operation_id: OperationId::new(),
            work_type: WorkType::LatticeCrypto,
            difficulty: 40,
            value: 10.0,
            result_digest: [2u8; 32],
            computational_cost: 1.0,
            energy_consumed: 0.1,
            knowledge_created: 1.0,
            miner_id: MinerId::new("m"),
            created_at: 5,
            signer: keypair.public_key().to_bytes(),
            signature: [0u8; 64],
        };
        item.signature = keypair.sign(&item.content_hash()).to_bytes();
        item
    }

    #[test]
    fn test_decision_is_replayable() {
        let keypair = Ed25519KeyPair::from_seed([1u8; 32]);
        let item = create_signed_work_item(&keypair);
        let validator = Validator::new("v1", ValidatorRole::StakeHolder, 100);
        let policy = DeterministicStakePolicy;
        assert_eq!(
            policy.decide(&item, &validator),
            policy.decide(&item, &validator)
        );
    }

    #[test]
    fn test_bad_signature_rejected() {
        let keypair = Ed25519KeyPair::from_seed([1u8; 32]);
        let mut item = create_signed_work_item(&keypair);
        item.value += 1.0;
        let validator = Validator::new("v1", ValidatorRole::StakeHolder, 100);
        assert_eq!(
            DeterministicStakePolicy.decide(&item, &validator),
            Ok(Decision::Rejected)
        );
    }

    #[test]
    fn test_full_reputation_always_approves_valid_items() {
        let keypair = Ed25519KeyPair::from_seed([3u8; 32]);
        let mut validator = Validator::new("v9", ValidatorRole::StakeHolder, 100);
        validator.reputation = 100.0;
        for _ in 0..20 {
            let item = create_signed_work_item(&keypair);
            assert_eq!(
                DeterministicStakePolicy.decide(&item, &validator),
                Ok(Decision::Approved)
            );
        }
    }

    #[test]
    fn test_nan_reputation_is_malformed() {
        let keypair = Ed25519KeyPair::from_seed([3u8; 32]);
        let mut validator = Validator::new("v9", ValidatorRole::StakeHolder, 100);
        validator.reputation = f64::NAN;
        assert!(DeterministicStakePolicy
            .decide(&create_signed_work_item(&keypair), &validator)
            .is_err());
    }
}
