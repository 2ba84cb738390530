//! # Stage Configuration
//!
//! `Params` describes where the tiers live and which stages exist, in order.
//! It is loaded once by the caller and is read-only to the engine.
//!
//! ```toml
//! final_stage = "persisted"
//!
//! [paths]
//! conf = "conf"
//! data = "data"
//!
//! [flags]
//! archive = true
//! on_collision = "fail"
//!
//! [[stages]]
//! name = "raw"
//! format = "{naming:%s}.{timestamp:%Y%m%d_%H%M%S}"
//! retention = { days = 30 }
//!
//! [[stages]]
//! name = "persisted"
//! format = "{naming:%s}.{version:v%m.%n.%c}"
//! ```
//!
//! Snapshot files are always JSON: every stage template gets a `.json`
//! suffix appended.

use crate::primitives::{ARCHIVE_DIR, BASE_STAGE, METADATA_DIR, STAGE_FILE_SUFFIX};
use crate::retention::RetentionRule;
use crate::store::{BaseStore, MetadataStore, SnapshotStore};
use crate::template::{FormatTemplate, TokenKind};
use crate::{ChangeLevel, Compression, StagehandError, VersionPolicy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

// =============================================================================
// PATHS & FLAGS
// =============================================================================

/// Roots of the base tier, the stage tiers and the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathConfig {
    /// Base tier root; entry files live in `<conf>/<domain>`.
    pub conf: PathBuf,
    /// Stage tier root; stage `s` lives in `<data>/<s>`.
    pub data: PathBuf,
    /// Archive root, `<data>/.archive` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive: Option<PathBuf>,
}

/// What `move` does when the target snapshot name is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Log a warning and overwrite the existing snapshot.
    #[default]
    Overwrite,
    /// Refuse with `SnapshotCollision`.
    Fail,
}

/// Engine switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineFlags {
    /// Copy purged and removed snapshots to the archive before deleting them.
    pub archive: bool,
    pub on_collision: CollisionPolicy,
    /// Change level at or above which promotions bump the major version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breaking_level: Option<ChangeLevel>,
}

// =============================================================================
// STAGES
// =============================================================================

/// One configured stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageDefinition {
    pub name: String,
    /// Snapshot filename template, without the `.json` suffix.
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention: Option<RetentionRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compress: Option<Compression>,
}

impl StageDefinition {
    /// Stage without retention or compression.
    pub fn new(name: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format: format.into(),
            retention: None,
            compress: None,
        }
    }

    /// Set the retention window.
    #[must_use]
    pub fn with_retention(mut self, rule: RetentionRule) -> Self {
        self.retention = Some(rule);
        self
    }

    /// Set the compression kind.
    #[must_use]
    pub fn with_compress(mut self, compress: Compression) -> Self {
        self.compress = Some(compress);
        self
    }

    /// Compile the snapshot filename template (format plus `.json`).
    pub fn file_template(&self) -> Result<FormatTemplate, StagehandError> {
        Ok(FormatTemplate::parse(&format!(
            "{}{STAGE_FILE_SUFFIX}",
            self.format
        ))?)
    }
}

// =============================================================================
// PARAMS
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Params {
    /// Last stage `deploy` walks to; the last configured stage when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_stage: Option<String>,
    pub paths: PathConfig,
    #[serde(default)]
    pub flags: EngineFlags,
    #[serde(default)]
    pub stages: Vec<StageDefinition>,
}

impl Params {
    /// Params over `conf` and `data` with no stages.
    pub fn new(conf: impl Into<PathBuf>, data: impl Into<PathBuf>) -> Self {
        Self {
            final_stage: None,
            paths: PathConfig {
                conf: conf.into(),
                data: data.into(),
                archive: None,
            },
            flags: EngineFlags::default(),
            stages: Vec::new(),
        }
    }

    /// Append a stage.
    #[must_use]
    pub fn with_stage(mut self, stage: StageDefinition) -> Self {
        self.stages.push(stage);
        self
    }

    /// Replace the engine flags.
    #[must_use]
    pub fn with_flags(mut self, flags: EngineFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Check the configuration is usable.
    ///
    /// - at least one stage, no duplicate names, no stage named `base`
    /// - every format compiles and mentions the `naming` token
    /// - no retention unit is negative
    /// - `final_stage`, when set, names a configured stage
    pub fn validate(&self) -> Result<(), StagehandError> {
        if self.stages.is_empty() {
            return Err(StagehandError::Config("no stages configured".to_string()));
        }
        let mut seen = BTreeSet::new();
        for stage in &self.stages {
            if stage.name.is_empty() || stage.name == BASE_STAGE {
                return Err(StagehandError::Config(format!(
                    "stage name {:?} is reserved or empty",
                    stage.name
                )));
            }
            if !seen.insert(stage.name.as_str()) {
                return Err(StagehandError::Config(format!(
                    "stage {:?} is configured twice",
                    stage.name
                )));
            }
            let template = stage.file_template().map_err(|e| {
                StagehandError::Config(format!("stage {:?} has a bad format: {e}", stage.name))
            })?;
            if !template.fields().contains(&TokenKind::Naming) {
                return Err(StagehandError::Config(format!(
                    "stage {:?} format must contain the naming token",
                    stage.name
                )));
            }
            if stage.retention.is_some_and(|rule| rule.has_negative_unit()) {
                return Err(StagehandError::Config(format!(
                    "stage {:?} retention must not be negative",
                    stage.name
                )));
            }
        }
        if let Some(stop) = &self.final_stage {
            if !self.has_stage(stop) {
                return Err(StagehandError::Config(format!(
                    "final stage {stop:?} is not configured"
                )));
            }
        }
        Ok(())
    }

    /// Resolve relative paths against `root`.
    pub fn rebase(&mut self, root: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = root.join(&*path);
            }
        };
        resolve(&mut self.paths.conf);
        resolve(&mut self.paths.data);
        if let Some(archive) = self.paths.archive.as_mut() {
            resolve(archive);
        }
    }

    /// Stage names in promotion order.
    pub fn stage_names(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(|stage| stage.name.as_str())
    }

    /// True when `name` is a configured stage (never true for `base`).
    #[must_use]
    pub fn has_stage(&self, name: &str) -> bool {
        self.stage_names().any(|stage| stage == name)
    }

    /// Look up a configured stage.
    pub fn stage(&self, name: &str) -> Result<&StageDefinition, StagehandError> {
        self.stages
            .iter()
            .find(|stage| stage.name == name)
            .ok_or_else(|| StagehandError::InvalidStage(name.to_string()))
    }

    /// The stage `deploy` stops at by default.
    #[must_use]
    pub fn final_stage(&self) -> Option<&str> {
        self.final_stage
            .as_deref()
            .or_else(|| self.stages.last().map(|stage| stage.name.as_str()))
    }

    /// Snapshot store of a configured stage.
    pub fn stage_store(&self, name: &str) -> Result<SnapshotStore, StagehandError> {
        let stage = self.stage(name)?;
        Ok(SnapshotStore::json(self.paths.data.join(name), stage.compress))
    }

    /// Base tier reader for `domain`.
    #[must_use]
    pub fn base_store(&self, domain: &str) -> BaseStore {
        BaseStore::new(self.paths.conf.join(domain))
    }

    /// Change-detection record store.
    #[must_use]
    pub fn metadata_store(&self) -> MetadataStore {
        MetadataStore::new(self.paths.data.join(METADATA_DIR))
    }

    /// Directory archived snapshots are copied to.
    #[must_use]
    pub fn archive_dir(&self) -> PathBuf {
        self.paths
            .archive
            .clone()
            .unwrap_or_else(|| self.paths.data.join(ARCHIVE_DIR))
    }

    /// Version bump rule derived from the flags.
    #[must_use]
    pub fn version_policy(&self) -> VersionPolicy {
        match self.flags.breaking_level {
            Some(level) => VersionPolicy::with_breaking(level),
            None => VersionPolicy::new(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
