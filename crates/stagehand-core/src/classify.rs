//! # Change Classifier
//!
//! Compares an entry's current data with the data last recorded for a stage
//! and returns a [`ChangeLevel`].
//!
//! ## Ladder
//!
//! 1. `recorded` is empty (null, `{}` or `[]`): `NoPriorMetadata`
//! 2. a key or sequence element was added or removed anywhere: `StructureChanged`
//! 3. a leaf value or leaf type differs: `ValueChanged`
//! 4. otherwise: `None`
//!
//! Sequences are compared as multisets: element order never counts as a
//! change. Root keys listed in the exclusion set (by default the bookkeeping
//! fields) are dropped from both sides before comparing.

use crate::ChangeLevel;
use crate::primitives::BOOKKEEPING_KEYS;
use serde_json::Value;
use std::collections::BTreeSet;

/// Structural comparison of two JSON trees.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChangeClassifier {
    exclude: BTreeSet<String>,
}

impl ChangeClassifier {
    /// Classifier that ignores the given root keys.
    #[must_use]
    pub fn new<I, S>(exclude: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exclude: exclude.into_iter().map(Into::into).collect(),
        }
    }

    /// Classifier that ignores the `updated_at` and `version` fields.
    #[must_use]
    pub fn bookkeeping() -> Self {
        Self::new(BOOKKEEPING_KEYS)
    }

    /// Root keys dropped before comparing.
    #[must_use]
    pub fn excluded(&self) -> &BTreeSet<String> {
        &self.exclude
    }

    /// Classify `current` against `recorded`.
    #[must_use]
    pub fn classify(&self, current: &Value, recorded: &Value) -> ChangeLevel {
        if is_empty(recorded) {
            return ChangeLevel::NoPriorMetadata;
        }
        match (current, recorded) {
            (Value::Object(cur), Value::Object(rec)) => {
                let keep = |key: &&String| !self.exclude.contains(key.as_str());
                let cur_keys: BTreeSet<&String> = cur.keys().filter(keep).collect();
                let rec_keys: BTreeSet<&String> = rec.keys().filter(keep).collect();
                if cur_keys != rec_keys {
                    return ChangeLevel::StructureChanged;
                }
                cur_keys
                    .into_iter()
                    .map(|key| compare(&cur[key], &rec[key]))
                    .max()
                    .unwrap_or(ChangeLevel::None)
            }
            _ => compare(current, recorded),
        }
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Coarse JSON type, used to pair unmatched sequence elements.
fn shape(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare(current: &Value, recorded: &Value) -> ChangeLevel {
    match (current, recorded) {
        (Value::Object(cur), Value::Object(rec)) => {
            if cur.len() != rec.len() || cur.keys().any(|key| !rec.contains_key(key)) {
                return ChangeLevel::StructureChanged;
            }
            cur.iter()
                .map(|(key, value)| compare(value, &rec[key]))
                .max()
                .unwrap_or(ChangeLevel::None)
        }
        (Value::Array(cur), Value::Array(rec)) => compare_unordered(cur, rec),
        (a, b) if a == b => ChangeLevel::None,
        _ => ChangeLevel::ValueChanged,
    }
}

fn compare_unordered(current: &[Value], recorded: &[Value]) -> ChangeLevel {
    if current.len() != recorded.len() {
        return ChangeLevel::StructureChanged;
    }

    // Drop every exact (order-insensitive) match first.
    let mut left: Vec<&Value> = Vec::new();
    let mut right: Vec<&Value> = recorded.iter().collect();
    for item in current {
        match right.iter().position(|other| equivalent(item, other)) {
            Some(index) => {
                right.swap_remove(index);
            }
            None => left.push(item),
        }
    }

    // Whatever is left differs: pair by shape, recurse into the pairs.
    let mut level = ChangeLevel::None;
    for item in left {
        match right.iter().position(|other| shape(item) == shape(other)) {
            Some(index) => {
                let other = right.swap_remove(index);
                level = level.max(compare(item, other));
            }
            None => return ChangeLevel::StructureChanged,
        }
    }
    level
}

fn equivalent(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(key, value)| y.get(key).is_some_and(|other| equivalent(value, other)))
        }
        (Value::Array(x), Value::Array(y)) => {
            if x.len() != y.len() {
                return false;
            }
            let mut pool: Vec<&Value> = y.iter().collect();
            x.iter().all(|item| {
                match pool.iter().position(|other| equivalent(item, other)) {
                    Some(index) => {
                        pool.swap_remove(index);
                        true
                    }
                    None => false,
                }
            })
        }
        _ => a == b,
    }
}

// =============================================================================
// TESTS
// =============================================================================
