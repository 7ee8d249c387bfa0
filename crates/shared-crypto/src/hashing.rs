//! # Hashing
//!
//! SHA-256 for every persisted digest (blocks, work items, records) and
//! BLAKE3 for deterministic derivations that never leave the process
//! (policy scores, reviewer selection, key derivation).

use sha2::{Digest, Sha256};

/// 256-bit digest.
pub type Hash = [u8; 32];

/// SHA-256 of a single input.
pub fn sha256(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}

/// SHA-256 over the concatenation of several inputs.
pub fn sha256_many(inputs: &[&[u8]]) -> Hash {
    let mut hasher = Sha256::new();
    for input in inputs {
        hasher.update(input);
    }
    hasher.finalize().into()
}

/// Domain-separated BLAKE3 hash of several inputs.
///
/// Each input is length-prefixed so `["ab", "c"]` and `["a", "bc"]` differ.
pub fn blake3_domain_hash(domain: &str, inputs: &[&[u8]]) -> Hash {
    let mut hasher = blake3::Hasher::new_derive_key(domain);
    for input in inputs {
        hasher.update(&(input.len() as u64).to_le_bytes());
        hasher.update(input);
    }
    *hasher.finalize().as_bytes()
}

/// Deterministic value in `[0, 1)` derived from the inputs.
pub fn unit_interval(domain: &str, inputs: &[&[u8]]) -> f64 {
    let hash = blake3_domain_hash(domain, inputs);
    let mut word = [0u8; 8];
    word.copy_from_slice(&hash[..8]);
    // 53 significant bits fit an f64 mantissa exactly.
    (u64::from_le_bytes(word) >> 11) as f64 / (1u64 << 53) as f64
}

/// Deterministic index in `0..len` derived from the inputs.
///
/// Returns `None` for an empty range.
pub fn select_index(domain: &str, inputs: &[&[u8]], len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let hash = blake3_domain_hash(domain, inputs);
    let mut word = [0u8; 8];
    word.copy_from_slice(&hash[..8]);
    Some((u64::from_le_bytes(word) % len as u64) as usize)
}

/// Derive a 32-byte key from context and input key material.
pub fn blake3_derive_key(context: &str, key_material: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(key_material);
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_sha256_many_matches_concat() {
        assert_eq!(sha256_many(&[b"hello ", b"world"]), sha256(b"hello world"));
    }

    #[test]
    fn test_domain_hash_length_prefixed() {
        let a = blake3_domain_hash("pm test", &[b"ab", b"c"]);
        let b = blake3_domain_hash("pm test", &[b"a", b"bc"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_domain_separation() {
        let a = blake3_domain_hash("pm domain a", &[b"x"]);
        let b = blake3_domain_hash("pm domain b", &[b"x"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_unit_interval_range_and_determinism() {
        for i in 0u32..200 {
            let bytes = i.to_le_bytes();
            let v = unit_interval("pm test", &[&bytes]);
            assert!((0.0..1.0).contains(&v));
            assert_eq!(v, unit_interval("pm test", &[&bytes]));
        }
    }

    #[test]
    fn test_select_index() {
        assert_eq!(select_index("pm test", &[b"x"], 0), None);
        let idx = select_index("pm test", &[b"x"], 5);
        assert!(matches!(idx, Some(i) if i < 5));
    }

    #[test]
    fn test_derive_key() {
        let k1 = blake3_derive_key("pm node key", b"seed");
        let k2 = blake3_derive_key("pm node key", b"seed");
        let k3 = blake3_derive_key("pm node key", b"other");
        assert_eq!(k1, k2);
        assert_ne!(k1, k3);
    }
}
