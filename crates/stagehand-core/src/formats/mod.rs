//! # Formats
//!
//! File codecs behind a two-method [`Codec`] contract.
//!
//! | Codec        | Used for                         | Notes                              |
//! |--------------|----------------------------------|------------------------------------|
//! | `JsonCodec`  | stage snapshots, metadata        | optional gzip/gz compression       |
//! | `YamlCodec`  | base tier entry files            | optional `${VAR}` substitution     |
//! | `TomlCodec`  | auxiliary documents              | read and write                     |
//!
//! The engine only ever sees `serde_json::Value` trees; key order is preserved.

mod compress;
mod json;
mod toml_codec;
mod yaml;

pub use json::JsonCodec;
pub use toml_codec::TomlCodec;
pub use yaml::{YamlCodec, substitute_env};

use crate::StagehandError;
use serde_json::Value;
use std::path::Path;

/// Reads and writes one file format.
pub trait Codec: Send + Sync + std::fmt::Debug {
    /// Read the file at `path` into a tree.
    ///
    /// A missing file is `StagehandError::NotFound`; unparseable content is
    /// `StagehandError::Decode`.
    fn read(&self, path: &Path) -> Result<Value, StagehandError>;

    /// Write `value` to `path`, creating parent directories as needed.
    fn write(&self, path: &Path, value: &Value) -> Result<(), StagehandError>;
}

/// Read the raw bytes of `path`, mapping a missing file to `NotFound`.
pub(crate) fn read_bytes(path: &Path) -> Result<Vec<u8>, StagehandError> {
    std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => StagehandError::NotFound(path.to_path_buf()),
        _ => StagehandError::IoError(format!("Failed to read {}: {e}", path.display())),
    })
}

/// Write `bytes` to `path`, creating parent directories first.
pub(crate) fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), StagehandError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            StagehandError::IoError(format!("Failed to create {}: {e}", parent.display()))
        })?;
    }
    std::fs::write(path, bytes)
        .map_err(|e| StagehandError::IoError(format!("Failed to write {}: {e}", path.display())))
}
