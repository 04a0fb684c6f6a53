//! Deterministic checksums of provisioning inputs
//!
//! A checksum covers the *input* used to generate an artifact (the rendered
//! configuration, the certificate request, the Secret data), never the
//! timestamp of generation. Equal inputs always hash to equal checksums, so
//! regeneration is content-triggered.
//!
//! All digests are SHA-256, lowercase hex.

use std::collections::BTreeMap;

use k8s_openapi::ByteString;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Checksum of any serializable configuration value.
///
/// The value is encoded as canonical JSON first: object keys are emitted in
/// sorted order, so two maps holding the same entries hash identically no
/// matter how they were built.
///
/// # Examples
///
/// ```rust
/// use std::collections::HashMap;
/// use tenant_control_plane::checksum::checksum_of;
///
/// let mut a = HashMap::new();
/// a.insert("replicas", 3);
/// a.insert("port", 6443);
/// let mut b = HashMap::new();
/// b.insert("port", 6443);
/// b.insert("replicas", 3);
///
/// assert_eq!(checksum_of(&a).unwrap(), checksum_of(&b).unwrap());
/// ```
pub fn checksum_of<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    // serde_json::Value keeps object keys in a BTreeMap
    let canonical = serde_json::to_value(value)?;
    let bytes = serde_json::to_vec(&canonical)?;
    Ok(checksum_of_bytes(&bytes))
}

/// Checksum of raw bytes.
pub fn checksum_of_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Checksum of Secret or ConfigMap data.
///
/// Entries are framed as `key=len:value;` in key order, so moving bytes
/// between a key and its value always changes the digest.
pub fn checksum_of_data(data: &BTreeMap<String, ByteString>) -> String {
    let mut hasher = Sha256::new();
    for (key, value) in data {
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.0.len().to_string().as_bytes());
        hasher.update(b":");
        hasher.update(&value.0);
        hasher.update(b";");
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_is_hex_sha256() {
        let sum = checksum_of_bytes(b"");
        assert_eq!(
            sum,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_checksum_of_is_stable_across_field_order() {
        let a = serde_json::json!({"certSANs": ["10.0.0.1"], "port": 6443});
        let b = serde_json::json!({"port": 6443, "certSANs": ["10.0.0.1"]});
        assert_eq!(checksum_of(&a).unwrap(), checksum_of(&b).unwrap());
    }

    #[test]
    fn test_checksum_of_changes_with_input() {
        let a = serde_json::json!({"port": 6443});
        let b = serde_json::json!({"port": 6444});
        assert_ne!(checksum_of(&a).unwrap(), checksum_of(&b).unwrap());
    }

    #[test]
    fn test_checksum_of_data_frames_entries() {
        let mut shifted_key = BTreeMap::new();
        shifted_key.insert("ab".to_string(), ByteString(b"c".to_vec()));
        let mut shifted_value = BTreeMap::new();
        shifted_value.insert("a".to_string(), ByteString(b"bc".to_vec()));

        assert_ne!(
            checksum_of_data(&shifted_key),
            checksum_of_data(&shifted_value)
        );
    }

    #[test]
    fn test_checksum_of_empty_data() {
        assert_eq!(
            checksum_of_data(&BTreeMap::new()),
            checksum_of_bytes(b"")
        );
    }
}
