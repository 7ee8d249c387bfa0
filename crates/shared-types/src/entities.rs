//! # Core Domain Entities
//!
//! Defines the ledger entities shared by every subsystem.
//!
//! ## Clusters
//!
//! - **Chain**: `Block`, `WorkItem`, `WorkType`
//! - **Consensus**: `Validator`, `ValidationRecord`, `TargetRef`
//! - **Audit**: `ImmutableRecord`, `BatchMembership`
//!
//! Every hashed entity exposes a canonical byte encoding. Fixed-width fields
//! are little-endian, strings are length-prefixed, floats are hashed through
//! their IEEE-754 bit pattern.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

use crate::consensus::{ConsensusLayer, Decision};

// =============================================================================
// PRIMITIVES
// =============================================================================

/// A 32-byte SHA-256 digest.
pub type Hash = [u8; 32];

/// A 64-byte Ed25519 signature.
pub type Signature = [u8; 64];

/// A 32-byte Ed25519 public key.
pub type PublicKey = [u8; 32];

/// Zero hash used as `previous_hash` of the genesis block and as the
/// `previous_record_hash` of the first record in every audit chain.
pub const GENESIS_HASH: Hash = [0u8; 32];

/// Count the leading zero bits of a hash.
#[must_use]
pub fn leading_zero_bits(hash: &Hash) -> u32 {
    let mut bits = 0;
    for byte in hash {
        if *byte == 0 {
            bits += 8;
        } else {
            bits += byte.leading_zeros();
            break;
        }
    }
    bits
}

/// Short hex prefix for log lines.
#[must_use]
pub fn short_hex(hash: &Hash) -> String {
    hex::encode(&hash[..6])
}

fn put_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

fn put_f64(hasher: &mut Sha256, value: f64) {
    hasher.update(value.to_bits().to_le_bytes());
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new identifier.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the identifier text.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

string_id!(
    /// Identity of a miner (autonomous or user-submitted).
    MinerId
);
string_id!(
    /// Identity of a validator.
    ValidatorId
);
string_id!(
    /// Logical audit chain identity. Appends are serialized per chain.
    ChainId
);
uuid_id!(
    /// Identity of an in-flight mining operation.
    OperationId
);
uuid_id!(
    /// Identity of a work item.
    WorkItemId
);

// =============================================================================
// CLUSTER A: THE CHAIN
// =============================================================================

/// Kind of computation a mining operation performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkType {
    RiemannZero,
    PrimePattern,
    YangMills,
    NavierStokes,
    GoldbachVerification,
    BirchSwinnertonDyer,
    EllipticCurveCrypto,
    LatticeCrypto,
    PoincareConjecture,
}

impl WorkType {
    /// Every work type, in declaration order.
    pub const ALL: [WorkType; 9] = [
        WorkType::RiemannZero,
        WorkType::PrimePattern,
        WorkType::YangMills,
        WorkType::NavierStokes,
        WorkType::GoldbachVerification,
        WorkType::BirchSwinnertonDyer,
        WorkType::EllipticCurveCrypto,
        WorkType::LatticeCrypto,
        WorkType::PoincareConjecture,
    ];

    /// Stable code used in canonical encodings.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            WorkType::RiemannZero => 1,
            WorkType::PrimePattern => 2,
            WorkType::YangMills => 3,
            WorkType::NavierStokes => 4,
            WorkType::GoldbachVerification => 5,
            WorkType::BirchSwinnertonDyer => 6,
            WorkType::EllipticCurveCrypto => 7,
            WorkType::LatticeCrypto => 8,
            WorkType::PoincareConjecture => 9,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            WorkType::RiemannZero => "riemann_zero",
            WorkType::PrimePattern => "prime_pattern",
            WorkType::YangMills => "yang_mills",
            WorkType::NavierStokes => "navier_stokes",
            WorkType::GoldbachVerification => "goldbach_verification",
            WorkType::BirchSwinnertonDyer => "birch_swinnerton_dyer",
            WorkType::EllipticCurveCrypto => "elliptic_curve_crypto",
            WorkType::LatticeCrypto => "lattice_crypto",
            WorkType::PoincareConjecture => "poincare_conjecture",
        }
    }
}

impl fmt::Display for WorkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit of mined output.
///
/// Created exactly once per completed mining operation and never mutated.
/// The signature covers [`WorkItem::content_hash`].
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: WorkItemId,
    /// Mining operation that produced this item.
    pub operation_id: OperationId,
    pub work_type: WorkType,
    /// Requested difficulty (1..=1000).
    pub difficulty: u32,
    /// Opaque numeric weight assigned by the injected value scorer.
    pub value: f64,
    /// Digest of the computation result.
    pub result_digest: Hash,
    pub computational_cost: f64,
    pub energy_consumed: f64,
    pub knowledge_created: f64,
    pub miner_id: MinerId,
    /// Creation time (unix millis).
    pub created_at: u64,
    /// Public key of the signing node.
    pub signer: PublicKey,
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

impl WorkItem {
    /// SHA-256 over every field except the signature.
    #[must_use]
    pub fn content_hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.id.0.as_bytes());
        hasher.update(self.operation_id.0.as_bytes());
        hasher.update([self.work_type.code()]);
        hasher.update(self.difficulty.to_le_bytes());
        put_f64(&mut hasher, self.value);
        hasher.update(self.result_digest);
        put_f64(&mut hasher, self.computational_cost);
        put_f64(&mut hasher, self.energy_consumed);
        put_f64(&mut hasher, self.knowledge_created);
        put_str(&mut hasher, self.miner_id.as_str());
        hasher.update(self.created_at.to_le_bytes());
        hasher.update(self.signer);
        hasher.finalize().into()
    }

    /// Basic well-formedness: finite numeric fields and an in-range difficulty.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        (1..=1000).contains(&self.difficulty)
            && self.value.is_finite()
            && self.value >= 0.0
            && self.computational_cost.is_finite()
            && self.energy_consumed.is_finite()
            && self.knowledge_created.is_finite()
    }
}

/// A block in the ledger.
///
/// ## Invariants
///
/// - `previous_hash` equals the `block_hash` of the block at `index - 1`
///   (or [`GENESIS_HASH`] at index 0).
/// - `merkle_root` equals the merkle root over `work_items` content hashes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// Unix millis.
    pub timestamp: u64,
    pub previous_hash: Hash,
    pub merkle_root: Hash,
    pub difficulty: u32,
    /// Leading zero bits the PoW search aimed for.
    pub target_bits: u8,
    pub nonce: u64,
    pub block_hash: Hash,
    pub miner_id: MinerId,
    pub total_value: f64,
    pub energy_consumed: f64,
    pub knowledge_created: f64,
    pub work_items: Vec<WorkItem>,
}

impl Block {
    /// Hasher primed with every header field except the nonce.
    ///
    /// The nonce is the last field of the canonical encoding so the PoW
    /// search can clone this prefix instead of re-encoding the header.
    #[must_use]
    pub fn pre_nonce_hasher(&self) -> Sha256 {
        let mut hasher = Sha256::new();
        hasher.update(self.index.to_le_bytes());
        hasher.update(self.timestamp.to_le_bytes());
        hasher.update(self.previous_hash);
        hasher.update(self.merkle_root);
        hasher.update(self.difficulty.to_le_bytes());
        hasher.update([self.target_bits]);
        put_str(&mut hasher, self.miner_id.as_str());
        put_f64(&mut hasher, self.total_value);
        put_f64(&mut hasher, self.energy_consumed);
        put_f64(&mut hasher, self.knowledge_created);
        hasher
    }

    /// Hash of the header with a specific nonce.
    #[must_use]
    pub fn hash_with_nonce(&self, nonce: u64) -> Hash {
        let mut hasher = self.pre_nonce_hasher();
        hasher.update(nonce.to_le_bytes());
        hasher.finalize().into()
    }

    /// Recompute the block hash from the stored fields.
    #[must_use]
    pub fn compute_hash(&self) -> Hash {
        self.hash_with_nonce(self.nonce)
    }

    /// Whether the stored hash satisfies the recorded PoW target.
    ///
    /// Blocks produced after PoW exhaustion carry the best candidate found
    /// and may return `false` here while still being valid chain members.
    #[must_use]
    pub fn meets_target(&self) -> bool {
        leading_zero_bits(&self.block_hash) >= u32::from(self.target_bits)
    }

    /// Content hashes of the embedded work items, in block order.
    #[must_use]
    pub fn work_item_hashes(&self) -> Vec<Hash> {
        self.work_items.iter().map(WorkItem::content_hash).collect()
    }

    #[must_use]
    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }
}

/// Current chain head as tracked by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainHead {
    pub index: u64,
    pub block_hash: Hash,
    pub timestamp: u64,
}

impl From<&Block> for ChainHead {
    fn from(block: &Block) -> Self {
        Self {
            index: block.index,
            block_hash: block.block_hash,
            timestamp: block.timestamp,
        }
    }
}

// =============================================================================
// CLUSTER B: CONSENSUS
// =============================================================================

/// What a validator participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidatorRole {
    /// Stake-weighted (PoS) participant.
    StakeHolder,
    /// Quality-weighted (PoR) participant.
    Researcher,
}

/// A consensus participant.
///
/// Never deleted; deactivation is a flag. Mutated only by consensus outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Validator {
    pub id: ValidatorId,
    pub role: ValidatorRole,
    pub stake: u64,
    /// Reputation in [0, 100].
    pub reputation: f64,
    /// Running mean of submitted quality scores (researchers).
    pub average_quality: f64,
    pub validations_performed: u64,
    pub active: bool,
    pub registered_at: u64,
}

impl Validator {
    /// Create an active validator with neutral reputation.
    pub fn new(id: impl Into<String>, role: ValidatorRole, stake: u64) -> Self {
        Self {
            id: ValidatorId::new(id),
            role,
            stake,
            reputation: 50.0,
            average_quality: 0.0,
            validations_performed: 0,
            active: true,
            registered_at: 0,
        }
    }

    /// Apply a signed reputation change, clamped to [0, 100].
    ///
    /// Returns the reputation after the change.
    pub fn adjust_reputation(&mut self, delta: f64) -> f64 {
        self.reputation = (self.reputation + delta).clamp(0.0, 100.0);
        self.reputation
    }

    /// Fold a new quality score into the running average.
    pub fn record_quality(&mut self, score: f64) {
        let n = self.validations_performed as f64;
        self.average_quality = (self.average_quality * n + score) / (n + 1.0);
        self.validations_performed += 1;
    }
}

/// The object a validation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TargetRef {
    WorkItem(WorkItemId),
    Block(Hash),
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetRef::WorkItem(id) => write!(f, "work_item:{id}"),
            TargetRef::Block(hash) => write!(f, "block:{}", short_hex(hash)),
        }
    }
}

/// One validator's decision on one target in one consensus layer.
///
/// Immutable once written; at most one per `(layer, target, validator)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub id: Uuid,
    pub layer: ConsensusLayer,
    pub target: TargetRef,
    pub validator_id: ValidatorId,
    pub decision: Decision,
    /// Stake (PoS) or quality score (PoR) used for weighting.
    pub weight: f64,
    pub quality_score: Option<f64>,
    pub reviewer_id: Option<ValidatorId>,
    pub reviewer_agreed: Option<bool>,
    pub created_at: u64,
}

// =============================================================================
// CLUSTER C: AUDIT
// =============================================================================

/// Position of a record inside a batched append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchMembership {
    /// Merkle root over the activity hashes of the whole batch.
    pub merkle_root: Hash,
    pub position: u32,
    pub size: u32,
}

/// Append-only, hash-linked audit entry.
///
/// `record_hash` covers every field except the signature; the signature
/// covers `record_hash`.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImmutableRecord {
    pub chain_id: ChainId,
    /// Chain-local sequence, starting at 1.
    pub sequence: u64,
    pub activity_type: String,
    pub payload: serde_json::Value,
    pub activity_hash: Hash,
    pub previous_record_hash: Hash,
    pub batch: Option<BatchMembership>,
    /// Record this one corrects, if any.
    pub references: Option<Hash>,
    pub timestamp: u64,
    pub record_hash: Hash,
    pub signer: PublicKey,
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

impl ImmutableRecord {
    /// Canonical payload hash.
    ///
    /// `serde_json::Value` objects are key-sorted, so the compact rendering
    /// is canonical.
    #[must_use]
    pub fn hash_payload(payload: &serde_json::Value) -> Hash {
        Sha256::digest(payload.to_string().as_bytes()).into()
    }

    /// Recompute the record hash from the stored fields.
    #[must_use]
    pub fn compute_record_hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        put_str(&mut hasher, self.chain_id.as_str());
        hasher.update(self.sequence.to_le_bytes());
        put_str(&mut hasher, &self.activity_type);
        hasher.update(self.activity_hash);
        hasher.update(self.previous_record_hash);
        match &self.batch {
            Some(batch) => {
                hasher.update([1u8]);
                hasher.update(batch.merkle_root);
                hasher.update(batch.position.to_le_bytes());
                hasher.update(batch.size.to_le_bytes());
            }
            None => hasher.update([0u8]),
        }
        match &self.references {
            Some(original) => {
                hasher.update([1u8]);
                hasher.update(original);
            }
            None => hasher.update([0u8]),
        }
        hasher.update(self.timestamp.to_le_bytes());
        hasher.update(self.signer);
        hasher.finalize().into()
    }

    #[must_use]
    pub fn is_first_in_chain(&self) -> bool {
        self.sequence == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_work_item() -> WorkItem {
        WorkItem {
            id: WorkItemId::new(),
            operation_id: OperationId::new(),
            work_type: WorkType::PrimePattern,
            difficulty: 50,
            value: 1500.0,
            result_digest: [7u8; 32],
            computational_cost: 100.0,
            energy_consumed: 2.5,
            knowledge_created: 0.5,
            miner_id: MinerId::new("miner-1"),
            created_at: 1_000,
            signer: [1u8; 32],
            signature: [0u8; 64],
        }
    }

    fn create_test_block() -> Block {
        Block {
            index: 3,
            timestamp: 5_000,
            previous_hash: [9u8; 32],
            merkle_root: [8u8; 32],
            difficulty: 50,
            target_bits: 4,
            nonce: 42,
            block_hash: GENESIS_HASH,
            miner_id: MinerId::new("miner-1"),
            total_value: 1500.0,
            energy_consumed: 2.5,
            knowledge_created: 0.5,
            work_items: vec![create_test_work_item()],
        }
    }

    #[test]
    fn test_leading_zero_bits() {
        assert_eq!(leading_zero_bits(&[0u8; 32]), 256);
        let mut hash = [0xFFu8; 32];
        assert_eq!(leading_zero_bits(&hash), 0);
        hash[0] = 0;
        hash[1] = 0b0001_0000;
        assert_eq!(leading_zero_bits(&hash), 11);
    }

    #[test]
    fn test_content_hash_ignores_signature() {
        let item = create_test_work_item();
        let mut signed = item.clone();
        signed.signature = [5u8; 64];
        assert_eq!(item.content_hash(), signed.content_hash());
    }

    #[test]
    fn test_content_hash_covers_value() {
        let item = create_test_work_item();
        let mut changed = item.clone();
        changed.value = 1501.0;
        assert_ne!(item.content_hash(), changed.content_hash());
    }

    #[test]
    fn test_block_hash_depends_on_nonce() {
        let block = create_test_block();
        assert_ne!(block.hash_with_nonce(1), block.hash_with_nonce(2));
        assert_eq!(block.compute_hash(), block.hash_with_nonce(42));
    }

    #[test]
    fn test_meets_target() {
        let mut block = create_test_block();
        block.block_hash = [0u8; 32];
        assert!(block.meets_target());
        block.block_hash = [0xFFu8; 32];
        assert!(!block.meets_target());
    }

    #[test]
    fn test_work_item_well_formed() {
        let mut item = create_test_work_item();
        assert!(item.is_well_formed());
        item.value = f64::NAN;
        assert!(!item.is_well_formed());
        item.value = 1.0;
        item.difficulty = 0;
        assert!(!item.is_well_formed());
    }

    #[test]
    fn test_reputation_clamped() {
        let mut validator = Validator::new("v1", ValidatorRole::StakeHolder, 100);
        assert_eq!(validator.adjust_reputation(80.0), 100.0);
        assert_eq!(validator.adjust_reputation(-250.0), 0.0);
    }

    #[test]
    fn test_record_quality_running_mean() {
        let mut validator = Validator::new("r1", ValidatorRole::Researcher, 0);
        validator.record_quality(80.0);
        validator.record_quality(60.0);
        assert_eq!(validator.validations_performed, 2);
        assert!((validator.average_quality - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_payload_hash_key_order_independent() {
        let a: serde_json::Value = serde_json::json!({"b": 1, "a": 2});
        let b: serde_json::Value = serde_json::json!({"a": 2, "b": 1});
        assert_eq!(ImmutableRecord::hash_payload(&a), ImmutableRecord::hash_payload(&b));
    }

    #[test]
    fn test_work_type_codes_unique() {
        let mut codes: Vec<u8> = WorkType::ALL.iter().map(|t| t.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), WorkType::ALL.len());
    }
}
