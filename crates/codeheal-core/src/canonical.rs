//! Canonical JSON serialization shared by the classifier's error ids (C1) and
//! the envelope/packet hash computations (C2, C8).
//!
//! Canonical form: object keys sorted, no insignificant whitespace, UTF-8.
//! `serde_json::Value`'s own `Ord` on `Map` is insertion-ordered, so we walk
//! the value tree and rebuild maps as `BTreeMap` before serializing.

use std::collections::BTreeMap;

use serde_json::Value;

/// Render `value` as canonical JSON: sorted keys, no whitespace.
pub fn canonical_json(value: &Value) -> String {
    serde_json::to_string(&sort_keys(value)).expect("canonical json values are always valid")
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), sort_keys(v)))
                .collect();
            let mut out = serde_json::Map::new();
            for (k, v) in sorted {
                out.insert(k, v);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// `sha1(canonical_json(value))[:12]`, matching the original re-banker's
/// `_make_error_id`.
pub fn short_sha1_id(value: &Value, prefix: &str) -> String {
    use sha1::{Digest, Sha1};
    let canon = canonical_json(value);
    let mut hasher = Sha1::new();
    hasher.update(canon.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{prefix}{}", &digest[..12.min(digest.len())])
}

/// SHA-256 hex digest of canonical JSON, used for packet/envelope hashes.
pub fn sha256_hex(value: &Value) -> String {
    use sha2::{Digest, Sha256};
    let canon = canonical_json(value);
    let mut hasher = Sha256::new();
    hasher.update(canon.as_bytes());
    hex::encode(hasher.finalize())
}
