//! Key hashing.
//!
//! Everything in this crate agrees on a single 32-bit hash space. A key's
//! location in that space is the first four bytes of the SHA-256 of its
//! UTF-8 encoding, little-endian. A cryptographic hash is overkill for
//! distribution alone, but it guarantees uniformity without tuning and
//! the cost is irrelevant next to a network round trip.

use sha2::{Digest, Sha256};

/// Map an arbitrary key to its location in the 32-bit hash space.
///
/// Deterministic, uniformly distributed, no error cases.
pub fn hash(input: &str) -> u32 {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// The virtual-node key owned by replica `index` of `node_id`.
///
/// Recomputed deterministically wherever it is needed, never stored
/// independently of the owning node's lifecycle.
pub fn virtual_key(node_id: &str, index: u32) -> u32 {
    hash(&format!("{node_id}-{index}"))
}
