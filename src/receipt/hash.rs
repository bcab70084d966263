//! Canonical encoding and SHA3-256 hashing.
//!
//! The canonical form is compact JSON with object keys sorted
//! lexicographically at every depth. Floats use the shortest representation
//! that round-trips, so one logical value always encodes to one byte string.

use crate::core::{Hash256, Result};
use serde::Serialize;
use sha3::{Digest, Sha3_256};

/// Compute SHA3-256 hash of data.
pub fn sha3_256(data: &[u8]) -> Hash256 {
    let mut hasher = Sha3_256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&result);
    Hash256::new(bytes)
}

/// Canonical bytes of a value, dropping the named top-level fields.
///
/// Goes through `serde_json::Value`, whose object map is ordered, so key
/// order never depends on the source struct or map.
pub fn canonical_bytes<T: Serialize>(value: &T, exclude: &[&str]) -> Result<Vec<u8>> {
    let mut value = serde_json::to_value(value)?;
    if let Some(object) = value.as_object_mut() {
        for key in exclude {
            object.remove(*key);
        }
    }
    Ok(serde_json::to_vec(&value)?)
}

/// Canonical hash of a value, dropping the named top-level fields.
pub fn canonical_hash<T: Serialize>(value: &T, exclude: &[&str]) -> Result<Hash256> {
    Ok(sha3_256(&canonical_bytes(value, exclude)?))
}
