//! YAML codec for base tier files, with environment substitution.
//!
//! Substitution is textual and runs before parsing:
//! - `${NAME}` becomes the variable's value, or `null` when it is unset
//! - `${NAME:-fallback}` becomes the value, or `fallback` when it is unset
//!
//! An empty document reads as `{}`.

use super::{Codec, read_bytes, write_bytes};
use crate::StagehandError;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::LazyLock;

/// Replacement for a variable that is unset and has no fallback.
const UNSET: &str = "null";

static ENV_PATTERN: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(r"\$\{(?P<name>[A-Za-z_][A-Za-z0-9_]*)(?::-(?P<fallback>[^}]*))?\}")
});

/// Expand `${NAME}` and `${NAME:-fallback}` in `text` using `lookup`.
pub fn substitute_env<F>(text: &str, lookup: F) -> Result<String, StagehandError>
where
    F: Fn(&str) -> Option<String>,
{
    let pattern = ENV_PATTERN
        .as_ref()
        .map_err(|e| StagehandError::Config(format!("Invalid substitution pattern: {e}")))?;
    let expanded = pattern.replace_all(text, |caps: &Captures<'_>| {
        let name = caps.name("name").map_or("", |m| m.as_str());
        lookup(name)
            .or_else(|| caps.name("fallback").map(|m| m.as_str().to_string()))
            .unwrap_or_else(|| UNSET.to_string())
    });
    Ok(expanded.into_owned())
}

/// YAML reader for base tier files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YamlCodec {
    substitute: bool,
}

impl YamlCodec {
    /// Codec that expands environment variables on read.
    #[must_use]
    pub const fn with_env() -> Self {
        Self { substitute: true }
    }

    /// Codec that reads text verbatim.
    #[must_use]
    pub const fn plain() -> Self {
        Self { substitute: false }
    }

    /// Parse YAML `text`, expanding variables through `lookup` first.
    pub fn parse_with<F>(&self, path: &Path, text: &str, lookup: F) -> Result<Value, StagehandError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if text.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }
        let text = if self.substitute {
            substitute_env(text, lookup)?
        } else {
            text.to_string()
        };
        let value: Value = serde_yaml::from_str(&text).map_err(|e| StagehandError::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(match value {
            Value::Null => Value::Object(Map::new()),
            other => other,
        })
    }
}

impl Default for YamlCodec {
    fn default() -> Self {
        Self::with_env()
    }
}

impl Codec for YamlCodec {
    fn read(&self, path: &Path) -> Result<Value, StagehandError> {
        let raw = read_bytes(path)?;
        let text = String::from_utf8(raw).map_err(|e| StagehandError::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        self.parse_with(path, &text, |name| std::env::var(name).ok())
    }

    fn write(&self, path: &Path, value: &Value) -> Result<(), StagehandError> {
        if self.substitute {
            return Err(StagehandError::Encode {
                path: path.to_path_buf(),
                reason: "writing is not supported with environment substitution".to_string(),
            });
        }
        let text = serde_yaml::to_string(value).map_err(|e| StagehandError::Encode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        write_bytes(path, text.as_bytes())
    }
}
