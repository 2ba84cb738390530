//! # Structural Hashing
//!
//! Replaces every leaf of a JSON tree with a digest of its text, keeping map
//! keys and container shapes, so a hashed tree is safe to persist as a
//! change-detection record.
//!
//! Hashed trees classify like the originals for map values, where a leaf's
//! type is part of its digest. Array elements differ: every non-null hashed
//! leaf is a string, so `[1]` against `["1"]` is a value change once hashed,
//! while the unhashed arrays differ in structure.
//!
//! Leaves hash with BLAKE3; the hex digest is truncated to
//! [`LEAF_HASH_LEN`](crate::primitives::LEAF_HASH_LEN) characters.

use crate::primitives::LEAF_HASH_LEN;
use serde_json::{Map, Value};

/// Hash every leaf of `value`, dropping the root keys listed in `exclude`.
///
/// `null` leaves stay `null`, so an absent value and an empty string still
/// hash differently.
#[must_use]
pub fn hash_tree(value: &Value, exclude: &[&str]) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| !exclude.contains(&key.as_str()))
                .map(|(key, child)| (key.clone(), hash_value(child)))
                .collect::<Map<String, Value>>(),
        ),
        other => hash_value(other),
    }
}

fn hash_value(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::Bool(flag) => hash_leaf(b'b', if *flag { "true" } else { "false" }),
        Value::Number(number) => hash_leaf(b'n', &number.to_string()),
        Value::String(text) => hash_leaf(b's', text),
        Value::Array(items) => Value::Array(items.iter().map(hash_value).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, child)| (key.clone(), hash_value(child)))
                .collect(),
        ),
    }
}

/// Digest of a leaf's kind tag and text, so `true` and `"true"` differ.
fn hash_leaf(kind: u8, text: &str) -> Value {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[kind]);
    hasher.update(text.as_bytes());
    let digest = hasher.finalize().to_hex();
    Value::String(digest.as_str()[..LEAF_HASH_LEN].to_string())
}
