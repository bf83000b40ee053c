//! Hashing System - SHA-256 for cache keys
//!
//! Cache keys fold the fingerprint of every dependency, so mutating any file
//! an asset touched yields a different key.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Sha256, Digest};
use serde::Serialize;
use serde_json::{json, Value, to_string};

use crate::ENGINE_VERSION;

const MISSING_FINGERPRINT: &str = "missing";

/// Lowercase hex SHA-256 of `data`
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Convert to canonical JSON (sorted keys, no whitespace)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v: Value = serde_json::to_value(value)?;
    let sorted = sort_value(&v);
    to_string(&sorted)
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            let sorted_map: serde_json::Map<String, Value> = sorted
                .into_iter()
                .map(|(k, v)| (k.clone(), sort_value(v)))
                .collect();
            Value::Object(sorted_map)
        }
        Value::Array(arr) => {
            Value::Array(arr.iter().map(sort_value).collect())
        }
        _ => v.clone()
    }
}

/// Content fingerprint of a file, `None` when it cannot be read
pub fn file_digest(path: &Path) -> Option<String> {
    fs::read(path).ok().map(|data| sha256_hex(&data))
}

/// Compute the cache key for a request path
/// key = sha256(canonical {path, engine_version, dependency -> digest})
pub fn cache_key(path: &str, dependencies: &BTreeSet<PathBuf>) -> Result<String, serde_json::Error> {
    let fingerprints: BTreeMap<String, String> = dependencies
        .iter()
        .map(|dep| {
            let digest = file_digest(dep).unwrap_or_else(|| MISSING_FINGERPRINT.to_string());
            (dep.display().to_string(), digest)
        })
        .collect();

    let payload = json!({
        "path": path,
        "engine_version": ENGINE_VERSION,
        "dependencies": fingerprints,
    });
    let canonical = canonical_json(&payload)?;
    Ok(sha256_hex(canonical.as_bytes()))
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}
