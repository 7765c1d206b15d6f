//! Hashing utilities for Aura.
//!
//! All commitments (identity hashes, proof hashes, nullifiers) are SHA-256
//! digests rendered as lowercase hex. Structured inputs are serialized with
//! RFC 8785 canonical JSON first so that field order never changes a hash.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{CoreError, Result};

/// Compute the SHA-256 digest of `data`.
///
/// # Example
///
/// ```
/// use aura_core::hashing::sha256;
///
/// let digest = sha256(b"hello");
/// assert_eq!(digest.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Compute the SHA-256 digest of `data` as lowercase hex (64 chars, no prefix).
///
/// # Example
///
/// ```
/// use aura_core::hashing::sha256_hex;
///
/// assert_eq!(
///     sha256_hex(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Compute the SHA-256 digest of `data` as `0x`-prefixed lowercase hex.
pub fn sha256_prefixed(data: &[u8]) -> String {
    format!("0x{}", sha256_hex(data))
}

/// Serialize `value` as RFC 8785 canonical JSON.
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_jcs::to_string(value).map_err(|e| CoreError::Canonicalization(e.to_string()))
}

/// Hash the canonical JSON form of `value`.
///
/// # Example
///
/// ```
/// use aura_core::hashing::hash_canonical;
/// use serde_json::json;
///
/// let a = hash_canonical(&json!({"b": 1, "a": 2})).unwrap();
/// let b = hash_canonical(&json!({"a": 2, "b": 1})).unwrap();
/// assert_eq!(a, b);
/// ```
pub fn hash_canonical<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(sha256_hex(canonical_json(value)?.as_bytes()))
}

/// Returns true when `s` is a 64-character hex digest, with or without `0x`.
pub fn is_hex_digest(s: &str) -> bool {
    let body = s.strip_prefix("0x").unwrap_or(s);
    body.len() == 64 && body.bytes().all(|b| b.is_ascii_hexdigit())
}
