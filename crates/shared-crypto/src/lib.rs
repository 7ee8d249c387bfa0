//! # Shared Crypto - Hashing, Merkle Trees and Signatures
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | SHA-256, BLAKE3 | Persisted digests, deterministic derivations |
//! | `merkle` | SHA-256 binary tree | Block and batch roots |
//! | `signatures` | Ed25519 | Work item and audit record signing |
//!
//! ## Security Properties
//!
//! - **Ed25519**: Deterministic nonces, no RNG dependency when signing
//! - **Merkle**: Power-of-two padding with a zero sentinel, order-sensitive

#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod merkle;
pub mod signatures;

pub use errors::CryptoError;
pub use hashing::{
    blake3_derive_key, blake3_domain_hash, select_index, sha256, sha256_many, unit_interval, Hash,
};
pub use merkle::{merkle_root, verify_proof, MerkleTree, SENTINEL_HASH};
pub use signatures::{verify_signature, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
