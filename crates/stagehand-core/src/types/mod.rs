//! # Core Type Definitions
//!
//! This module contains the small value types shared by every engine module:
//! - Change classification (`ChangeLevel`)
//! - Snapshot filename constants (`Compression`, `Extension`)
//! - Error types (`StagehandError`)
//!
//! ## Ordering Guarantees
//!
//! `ChangeLevel` derives `Ord` in ladder order, so `NoPriorMetadata` compares
//! above every real change and `None` below all of them.

use crate::template::TemplateError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// CHANGE LEVEL
// =============================================================================

/// How much an entry's current data differs from its last recorded snapshot.
///
/// The discriminants are stable and appear in logs and JSON output.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ChangeLevel {
    /// Both trees are equivalent.
    #[default]
    None = 0,
    /// Only leaf values (or leaf types) differ.
    ValueChanged = 1,
    /// Keys or sequence elements were added or removed.
    StructureChanged = 2,
    /// There is nothing to compare against. Always promotes.
    NoPriorMetadata = 99,
}

impl ChangeLevel {
    /// Numeric code of the level.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// True for every level above `None`.
    #[must_use]
    pub const fn is_changed(self) -> bool {
        !matches!(self, ChangeLevel::None)
    }

    /// Get the level name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ChangeLevel::None => "none",
            ChangeLevel::ValueChanged => "value_changed",
            ChangeLevel::StructureChanged => "structure_changed",
            ChangeLevel::NoPriorMetadata => "no_prior_metadata",
        }
    }
}

impl std::fmt::Display for ChangeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

// =============================================================================
// FILENAME CONSTANTS
// =============================================================================

/// Compression suffix recognised in snapshot filenames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    Gzip,
    Gz,
    Bz2,
    Xz,
    Zip,
    Rar,
}

impl Compression {
    /// Every compression kind, longest names first so prefix matching is safe.
    pub const ALL: [Compression; 6] = [
        Compression::Gzip,
        Compression::Bz2,
        Compression::Gz,
        Compression::Xz,
        Compression::Zip,
        Compression::Rar,
    ];

    /// Get the suffix text.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Compression::Gzip => "gzip",
            Compression::Gz => "gz",
            Compression::Bz2 => "bz2",
            Compression::Xz => "xz",
            Compression::Zip => "zip",
            Compression::Rar => "rar",
        }
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Compression {
    type Err = StagehandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Compression::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| StagehandError::Config(format!("Unknown compression: {s}")))
    }
}

/// File extension recognised in snapshot filenames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Extension {
    Json,
    Yaml,
    Env,
    Toml,
}

impl Extension {
    /// Every extension kind.
    pub const ALL: [Extension; 4] = [
        Extension::Json,
        Extension::Yaml,
        Extension::Env,
        Extension::Toml,
    ];

    /// Get the extension text (without a leading dot).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Extension::Json => "json",
            Extension::Yaml => "yaml",
            Extension::Env => "env",
            Extension::Toml => "toml",
        }
    }
}

impl std::fmt::Display for Extension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Extension {
    type Err = StagehandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Extension::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| StagehandError::Config(format!("Unknown extension: {s}")))
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the staging engine.
///
/// - No silent failures
/// - Use `Result<T, StagehandError>` for fallible operations
/// - The engine never panics; nothing is retried automatically
#[derive(Debug, Error)]
pub enum StagehandError {
    /// No data exists for the entry in the requested stage.
    #[error("Entry {name:?} not found in stage {stage:?}")]
    EntryNotFound { name: String, stage: String },

    /// The stage name is not configured, or the operation is not allowed on it.
    #[error("Invalid stage: {0}")]
    InvalidStage(String),

    /// The entry name or domain is malformed.
    #[error("Invalid entry name: {0}")]
    InvalidName(String),

    /// A codec could not read a file.
    #[error("Decode error in {path:?}: {reason}")]
    Decode { path: PathBuf, reason: String },

    /// A codec could not write a file.
    #[error("Encode error in {path:?}: {reason}")]
    Encode { path: PathBuf, reason: String },

    /// A merge-save found incompatible payload shapes.
    #[error("Cannot merge {incoming} payload into {existing} payload at {path:?}")]
    TypeMismatch {
        path: PathBuf,
        existing: &'static str,
        incoming: &'static str,
    },

    /// A filename or format template could not be parsed.
    #[error("Parse error: {0}")]
    Parse(#[from] TemplateError),

    /// A version string is malformed.
    #[error("Invalid version: {0:?}")]
    InvalidVersion(String),

    /// A file expected by the store does not exist.
    #[error("Path not found: {0:?}")]
    NotFound(PathBuf),

    /// A promotion would overwrite an existing snapshot and the collision policy forbids it.
    #[error("Snapshot {file:?} already exists in stage {stage:?}")]
    SnapshotCollision { stage: String, file: String },

    /// The stage configuration is inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

/// Result alias used across the engine.
pub type Result<T, E = StagehandError> = std::result::Result<T, E>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_level_ladder_ordering() {
        assert!(ChangeLevel::None < ChangeLevel::ValueChanged);
        assert!(ChangeLevel::ValueChanged < ChangeLevel::StructureChanged);
        assert!(ChangeLevel::StructureChanged < ChangeLevel::NoPriorMetadata);
    }

    #[test]
    fn change_level_codes() {
        assert_eq!(ChangeLevel::None.code(), 0);
        assert_eq!(ChangeLevel::ValueChanged.code(), 1);
        assert_eq!(ChangeLevel::StructureChanged.code(), 2);
        assert_eq!(ChangeLevel::NoPriorMetadata.code(), 99);
        assert!(!ChangeLevel::None.is_changed());
        assert!(ChangeLevel::NoPriorMetadata.is_changed());
    }

    #[test]
    fn compression_parses_every_name() {
        for kind in Compression::ALL {
            let parsed: Compression = kind.as_str().parse().expect("parse");
            assert_eq!(parsed, kind);
        }
        assert!("lz4".parse::<Compression>().is_err());
    }

    #[test]
    fn extension_parses_every_name() {
        for kind in Extension::ALL {
            let parsed: Extension = kind.as_str().parse().expect("parse");
            assert_eq!(parsed, kind);
        }
        assert!("ini".parse::<Extension>().is_err());
    }

    #[test]
    fn change_level_deserializes_snake_case() {
        let level: ChangeLevel =
            serde_json::from_str("\"structure_changed\"").expect("deserialize");
        assert_eq!(level, ChangeLevel::StructureChanged);
    }
}
