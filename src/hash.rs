//! Content addressing for lease records.
//!
//! Lease keys are named after a digest of the item bytes so that records stay
//! short no matter how large the payload is.

use sha2::{Digest, Sha224};

/// Deterministic identity key for an item: lowercase hex SHA-224 (56 chars).
pub fn item_key(item: &[u8]) -> String {
    hex::encode(Sha224::digest(item))
}
