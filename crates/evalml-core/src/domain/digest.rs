//! Canonical JSON normalization and content fingerprints.
//!
//! Canonical form (RFC 8785-class):
//! - object keys ordered by UTF-16 code units (§3.2.3)
//! - integer-valued floats rendered as integers
//! - compact serialization, no whitespace
//!
//! Fingerprints are SHA-256 over the canonical form, truncated to
//! [`FINGERPRINT_LEN`] hex characters for use inside run identifiers.
//!
//! The workspace enables `serde_json/preserve_order`, so `Map` keeps
//! insertion order and the UTF-16 sort below determines the output.

use std::collections::BTreeSet;

use sha2::{Digest, Sha256};

use crate::domain::error::{EvalError, Result};

/// Hex characters kept from the SHA-256 digest by [`fingerprint`].
pub const FINGERPRINT_LEN: usize = 8;

/// Recursively sort JSON object keys using UTF-16 code unit ordering (RFC 8785 §3.2.3).
fn sort_keys_utf16(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().collect();
            keys.sort_by(|a, b| a.encode_utf16().cmp(b.encode_utf16()));

            let mut sorted = serde_json::Map::new();
            for key in keys {
                if let Some(v) = map.get(key) {
                    sorted.insert(key.to_string(), sort_keys_utf16(v));
                }
            }
            serde_json::Value::Object(sorted)
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(sort_keys_utf16).collect())
        }
        other => other.clone(),
    }
}

/// Normalize numbers: integer-valued floats → integer repr; reject NaN/Infinity.
fn normalize_value(value: &serde_json::Value) -> Result<serde_json::Value> {
    match value {
        serde_json::Value::Object(map) => {
            let mut normalized = serde_json::Map::new();
            for (k, v) in map.iter() {
                normalized.insert(k.clone(), normalize_value(v)?);
            }
            Ok(serde_json::Value::Object(normalized))
        }
        serde_json::Value::Array(arr) => {
            let normalized = arr
                .iter()
                .map(normalize_value)
                .collect::<Result<Vec<_>>>()?;
            Ok(serde_json::Value::Array(normalized))
        }
        serde_json::Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                return Ok(serde_json::Value::Number(n.clone()));
            }
            match n.as_f64() {
                Some(f) if !f.is_finite() => Err(EvalError::Configuration(
                    "NaN/Infinity not permitted in canonical JSON".to_string(),
                )),
                Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
                    Ok(serde_json::Value::Number(serde_json::Number::from(f as i64)))
                }
                _ => Ok(serde_json::Value::Number(n.clone())),
            }
        }
        other => Ok(other.clone()),
    }
}

/// Remove every object key named in `exclude`, at any nesting depth.
pub fn strip_keys(value: &serde_json::Value, exclude: &BTreeSet<&str>) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .filter(|(k, _)| !exclude.contains(k.as_str()))
                .map(|(k, v)| (k.clone(), strip_keys(v, exclude)))
                .collect(),
        ),
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(|v| strip_keys(v, exclude)).collect())
        }
        other => other.clone(),
    }
}

/// Convert JSON value to canonical form: normalize numbers → sort keys → compact JSON.
pub fn canonical_json(value: &serde_json::Value) -> Result<String> {
    let normalized = normalize_value(value)?;
    let sorted = sort_keys_utf16(&normalized);
    Ok(serde_json::to_string(&sorted)?)
}

/// Full SHA-256 hex digest of arbitrary bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Compute SHA256 hex digest of canonical JSON.
pub fn compute_digest(value: &serde_json::Value) -> Result<String> {
    let canonical = canonical_json(value)?;
    Ok(sha256_hex(canonical.as_bytes()))
}

/// Canonical form of `value` with `exclude_keys` removed at every level,
/// together with its truncated digest.
///
/// Callers that need to detect truncation collisions keep the canonical
/// string next to the short hash.
pub fn fingerprint_with_canonical(
    value: &serde_json::Value,
    exclude_keys: &[&str],
) -> Result<(String, String)> {
    let exclude: BTreeSet<&str> = exclude_keys.iter().copied().collect();
    let canonical = canonical_json(&strip_keys(value, &exclude))?;
    let digest = sha256_hex(canonical.as_bytes());
    Ok((canonical, digest[..FINGERPRINT_LEN].to_string()))
}

/// Short, deterministic fingerprint of `value` with `exclude_keys` removed
/// at every level.
pub fn fingerprint(value: &serde_json::Value, exclude_keys: &[&str]) -> Result<String> {
    fingerprint_with_canonical(value, exclude_keys).map(|(_, short)| short)
}
