//! Change-detection records, one JSON file per `(entry, stage)`.
//!
//! Records hold hashed data only; they are never read back as payload.

use crate::formats::{Codec, JsonCodec};
use crate::{Entry, StagehandError};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Last-known hashed data of an entry in one stage.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetadataRecord {
    data: Value,
}

impl MetadataRecord {
    /// Wrap hashed data.
    #[must_use]
    pub fn new(data: Value) -> Self {
        Self { data }
    }

    /// Get the recorded tree.
    #[must_use]
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// True when nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match &self.data {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }
}

/// Directory of metadata records.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    dir: PathBuf,
    codec: JsonCodec,
}

impl MetadataStore {
    /// Store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            codec: JsonCodec::new(),
        }
    }

    /// Get the record directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for `entry` in `stage`.
    #[must_use]
    pub fn record_path(&self, entry: &Entry, stage: &str) -> PathBuf {
        self.dir.join(entry.metadata_key(stage))
    }

    /// Load a record; a missing file is an empty record.
    pub fn load(&self, entry: &Entry, stage: &str) -> Result<MetadataRecord, StagehandError> {
        match self.codec.read(&self.record_path(entry, stage)) {
            Ok(data) => Ok(MetadataRecord::new(data)),
            Err(StagehandError::NotFound(_)) => Ok(MetadataRecord::new(Value::Object(Map::new()))),
            Err(e) => Err(e),
        }
    }

    /// Replace the record for `entry` in `stage`.
    pub fn save(
        &self,
        entry: &Entry,
        stage: &str,
        record: &MetadataRecord,
    ) -> Result<(), StagehandError> {
        let path = self.record_path(entry, stage);
        self.codec.write(&path, record.data())?;
        tracing::debug!(entry = %entry, stage, path = %path.display(), "metadata refreshed");
        Ok(())
    }
}
