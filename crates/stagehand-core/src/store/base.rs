//! # Base Tier
//!
//! The read-only origin of entry data: a tree of YAML files under
//! `<conf>/<domain>`, each mapping entry names to entry data.
//!
//! ```yaml
//! conn_local:
//!   type: connection.LocalSystem
//!   endpoint: file:///${ROOT_PATH:-data}/examples
//! ```
//!
//! JSON and TOML files in the tree are ignored. When more than one file
//! defines the same entry, candidates are ordered by their `version` field
//! and then by size; `order = 1` picks the greatest.

use super::paths::list_files;
use crate::formats::{Codec, YamlCodec};
use crate::primitives::{ALIAS_KEY, BASE_EXCLUDED_PATTERNS, VERSION_KEY};
use crate::{StagehandError, Version};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// Reader over one domain of the base tier.
#[derive(Debug, Clone)]
pub struct BaseStore {
    root: PathBuf,
    codec: YamlCodec,
}

impl BaseStore {
    /// Base store over `root`, expanding environment variables on read.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_codec(root, YamlCodec::with_env())
    }

    /// Base store over `root` reading with `codec`.
    pub fn with_codec(root: impl Into<PathBuf>, codec: YamlCodec) -> Self {
        Self {
            root: root.into(),
            codec,
        }
    }

    /// Get the domain root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every definition of `name`, as `{"alias": name, ..data}`, in file order.
    pub fn candidates(&self, name: &str) -> Result<Vec<Map<String, Value>>, StagehandError> {
        let mut found = Vec::new();
        for path in list_files(&self.root, "*", &BASE_EXCLUDED_PATTERNS)? {
            let document = self.codec.read(&path)?;
            let Some(Value::Object(data)) = document.get(name) else {
                continue;
            };
            if data.is_empty() {
                continue;
            }
            let mut entry = Map::new();
            entry.insert(ALIAS_KEY.to_string(), Value::String(name.to_string()));
            for (key, value) in data {
                entry.insert(key.clone(), value.clone());
            }
            found.push(entry);
        }
        Ok(found)
    }

    /// The `order`-th greatest definition of `name` (1 is the greatest).
    ///
    /// Returns `None` when the entry is not defined or `order` is out of range.
    pub fn get(&self, name: &str, order: usize) -> Result<Option<Value>, StagehandError> {
        let mut found = self.candidates(name)?;
        if found.is_empty() {
            return Ok(None);
        }
        if order == 0 || order > found.len() {
            tracing::warn!(
                name,
                order,
                available = found.len(),
                "order is out of range for base definitions"
            );
            return Ok(None);
        }
        found.sort_by(compare_definitions);
        Ok(found.into_iter().nth_back(order - 1).map(Value::Object))
    }
}

/// Semantic versions compare numerically and rank above free-form strings
/// (such as ISO dates), which compare lexicographically.
fn compare_definitions(a: &Map<String, Value>, b: &Map<String, Value>) -> Ordering {
    fn key(map: &Map<String, Value>) -> (Option<Version>, String) {
        let raw = map
            .get(VERSION_KEY)
            .and_then(Value::as_str)
            .unwrap_or_default();
        (raw.parse().ok(), raw.to_string())
    }
    key(a).cmp(&key(b)).then_with(|| a.len().cmp(&b.len()))
}
