//! TOML codec.

use super::{Codec, read_bytes, write_bytes};
use crate::StagehandError;
use serde_json::Value;
use std::path::Path;

/// TOML documents mapped onto JSON trees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TomlCodec;

impl Codec for TomlCodec {
    fn read(&self, path: &Path) -> Result<Value, StagehandError> {
        let decode = |reason: String| StagehandError::Decode {
            path: path.to_path_buf(),
            reason,
        };
        let raw = read_bytes(path)?;
        let text = String::from_utf8(raw).map_err(|e| decode(e.to_string()))?;
        toml::from_str(&text).map_err(|e| decode(e.to_string()))
    }

    fn write(&self, path: &Path, value: &Value) -> Result<(), StagehandError> {
        let text = toml::to_string(value).map_err(|e| StagehandError::Encode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        write_bytes(path, text.as_bytes())
    }
}
