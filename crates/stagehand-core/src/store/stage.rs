//! # Snapshot Store
//!
//! One stage directory and the codec its snapshots are written with.
//!
//! ## Save semantics
//!
//! | Mode        | Existing | Incoming | Result                          |
//! |-------------|----------|----------|---------------------------------|
//! | `Overwrite` | any      | any      | incoming                        |
//! | `Merge`     | absent   | any      | incoming                        |
//! | `Merge`     | list     | list     | existing ++ incoming            |
//! | `Merge`     | map      | map      | existing ∪ incoming (incoming wins) |
//! | `Merge`     | other    | other    | `TypeMismatch`                  |
//!
//! A failed save leaves the file byte-for-byte as it was before the call.

use crate::formats::{Codec, JsonCodec, write_bytes};
use crate::template::{TemplateMatcher, Tokens};
use crate::{Compression, StagehandError};
use serde_json::Value;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// How `save` combines the incoming payload with the file's current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveMode {
    #[default]
    Overwrite,
    Merge,
}

/// A stage file whose name decoded against the stage template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFile {
    pub tokens: Tokens,
    pub filename: String,
}

impl StageFile {
    /// Latest-first comparison key: `(timestamp, version)`, then filename.
    #[must_use]
    pub fn cmp_latest(&self, other: &Self) -> Ordering {
        self.tokens
            .sort_key()
            .cmp(&other.tokens.sort_key())
            .then_with(|| self.filename.cmp(&other.filename))
    }
}

/// Snapshot files of one stage directory.
#[derive(Debug)]
pub struct SnapshotStore {
    dir: PathBuf,
    codec: Box<dyn Codec>,
}

impl SnapshotStore {
    /// Store over `dir` using `codec`.
    pub fn new(dir: impl Into<PathBuf>, codec: impl Codec + 'static) -> Self {
        Self {
            dir: dir.into(),
            codec: Box::new(codec),
        }
    }

    /// Store over `dir` writing JSON snapshots, optionally compressed.
    pub fn json(dir: impl Into<PathBuf>, compress: Option<Compression>) -> Self {
        Self::new(dir, JsonCodec::compressed(compress))
    }

    /// Get the stage directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of `filename` inside the stage.
    #[must_use]
    pub fn path(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// True when `filename` exists in the stage.
    #[must_use]
    pub fn exists(&self, filename: &str) -> bool {
        self.path(filename).is_file()
    }

    /// File names in the stage directory.
    ///
    /// The listing is read lazily; call again to re-read the directory. A
    /// missing directory lists nothing.
    pub fn list(&self) -> Result<impl Iterator<Item = String> + use<>, StagehandError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => Some(entries),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(StagehandError::IoError(format!(
                    "Failed to list {}: {e}",
                    self.dir.display()
                )));
            }
        };
        let dir = self.dir.clone();
        Ok(entries
            .into_iter()
            .flatten()
            .filter_map(move |entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(
                        dir = %dir.display(),
                        error = %e,
                        "skipping unreadable stage entry"
                    );
                    None
                }
            })
            .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_file()))
            .filter_map(|entry| entry.file_name().into_string().ok()))
    }

    /// Decode every listed file with `matcher`, latest last.
    ///
    /// Files that do not match the template are skipped.
    pub fn scan(&self, matcher: &TemplateMatcher) -> Result<Vec<StageFile>, StagehandError> {
        let mut files: Vec<StageFile> = self
            .list()?
            .filter_map(|filename| match matcher.decode(&filename) {
                Ok(tokens) => Some(StageFile { tokens, filename }),
                Err(e) => {
                    tracing::trace!(%filename, error = %e, "skipping stage file");
                    None
                }
            })
            .collect();
        files.sort_by(StageFile::cmp_latest);
        Ok(files)
    }

    /// Load the payload of `filename`.
    pub fn load(&self, filename: &str) -> Result<Value, StagehandError> {
        self.codec.read(&self.path(filename))
    }

    /// Save `value` into `filename`.
    ///
    /// On any failure the previous content is restored (or the file removed
    /// when there was none) before the error is returned.
    pub fn save(&self, filename: &str, value: &Value, mode: SaveMode) -> Result<(), StagehandError> {
        let path = self.path(filename);
        let backup = match std::fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(StagehandError::IoError(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        let result = match mode {
            SaveMode::Overwrite => self.codec.write(&path, value),
            SaveMode::Merge => self.merge_into(&path, value, backup.is_some()),
        };
        if let Err(e) = result {
            self.rollback(&path, backup.as_deref());
            return Err(e);
        }
        tracing::debug!(path = %path.display(), ?mode, "saved snapshot");
        Ok(())
    }

    fn merge_into(&self, path: &Path, incoming: &Value, exists: bool) -> Result<(), StagehandError> {
        let merged = if exists {
            let existing = self.codec.read(path)?;
            merge(path, existing, incoming)?
        } else {
            incoming.clone()
        };
        self.codec.write(path, &merged)
    }

    fn rollback(&self, path: &Path, backup: Option<&[u8]>) {
        if path.exists() {
            if let Err(e) = std::fs::remove_file(path) {
                tracing::warn!(path = %path.display(), error = %e, "rollback could not remove file");
            }
        }
        if let Some(bytes) = backup {
            if let Err(e) = write_bytes(path, bytes) {
                tracing::error!(path = %path.display(), error = %e, "rollback could not restore file");
            }
        }
    }

    /// Copy `filename` to `dest`, creating parent directories.
    ///
    /// The source is left in place; the copy is verified before returning.
    pub fn move_to(&self, filename: &str, dest: &Path) -> Result<(), StagehandError> {
        let source = self.path(filename);
        if !source.is_file() {
            return Err(StagehandError::NotFound(source));
        }
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StagehandError::IoError(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }
        std::fs::copy(&source, dest).map_err(|e| {
            StagehandError::IoError(format!(
                "Failed to copy {} to {}: {e}",
                source.display(),
                dest.display()
            ))
        })?;
        if !dest.is_file() {
            return Err(StagehandError::IoError(format!(
                "Copy of {} missing at {}",
                source.display(),
                dest.display()
            )));
        }
        Ok(())
    }

    /// Delete `filename` from the stage.
    pub fn delete(&self, filename: &str) -> Result<(), StagehandError> {
        let path = self.path(filename);
        std::fs::remove_file(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StagehandError::NotFound(path.clone()),
            _ => StagehandError::IoError(format!("Failed to delete {}: {e}", path.display())),
        })
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

fn merge(path: &Path, existing: Value, incoming: &Value) -> Result<Value, StagehandError> {
    match (existing, incoming) {
        (Value::Array(mut items), Value::Array(more)) => {
            items.extend(more.iter().cloned());
            Ok(Value::Array(items))
        }
        (Value::Object(mut map), Value::Object(more)) => {
            for (key, value) in more {
                map.insert(key.clone(), value.clone());
            }
            Ok(Value::Object(map))
        }
        (existing, incoming) => Err(StagehandError::TypeMismatch {
            path: path.to_path_buf(),
            existing: kind(&existing),
            incoming: kind(incoming),
        }),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::FormatTemplate;
    use serde_json::json;

    fn store(dir: &Path) -> SnapshotStore {
        SnapshotStore::json(dir.join("raw"), None)
    }

    #[test]
    fn missing_directory_lists_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(store(dir.path()).list().expect("list").count(), 0);
    }

    #[test]
    fn list_is_restartable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let s = store(dir.path());
        s.save("a.json", &json!({}), SaveMode::Overwrite).expect("save");
        assert_eq!(s.list().expect("list").count(), 1);
        s.save("b.json", &json!({}), SaveMode::Overwrite).expect("save");
        assert_eq!(s.list().expect("list").count(), 2);
    }

    #[test]
    fn merge_maps_is_right_biased() {
        let dir = tempfile::tempdir().expect("tempdir");
        let s = store(dir.path());
        s.save("m.json", &json!({"a": 1, "b": 1}), SaveMode::Overwrite).expect("save");
        s.save("m.json", &json!({"b": 2, "c": 3}), SaveMode::Merge).expect("merge");
        assert_eq!(s.load("m.json").expect("load"), json!({"a": 1, "b": 2, "c": 3}));
    }

    #[test]
    fn merge_lists_concatenates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let s = store(dir.path());
        s.save("l.json", &json!([1, 2]), SaveMode::Merge).expect("save");
        s.save("l.json", &json!([3]), SaveMode::Merge).expect("merge");
        assert_eq!(s.load("l.json").expect("load"), json!([1, 2, 3]));
    }

    #[test]
    fn merge_mismatch_rolls_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let s = store(dir.path());
        s.save("l.json", &json!([1, 2]), SaveMode::Overwrite).expect("save");
        let before = std::fs::read(s.path("l.json")).expect("read");

        let result = s.save("l.json", &json!({"a": 1}), SaveMode::Merge);
        assert!(matches!(
            result,
            Err(StagehandError::TypeMismatch {
                existing: "list",
                incoming: "map",
                ..
            })
        ));
        assert_eq!(std::fs::read(s.path("l.json")).expect("read"), before);
    }

    #[test]
    fn failed_first_write_leaves_no_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let s = SnapshotStore::json(dir.path().join("raw"), Some(Compression::Zip));
        assert!(s.save("x.json", &json!({}), SaveMode::Overwrite).is_err());
        assert!(!s.exists("x.json"));
    }

    #[test]
    fn move_copies_and_keeps_source() {
        let dir = tempfile::tempdir().expect("tempdir");
        let s = store(dir.path());
        s.save("a.json", &json!({"a": 1}), SaveMode::Overwrite).expect("save");

        let dest = dir.path().join(".archive/deep/raw_a.json");
        s.move_to("a.json", &dest).expect("move");
        assert!(dest.is_file());
        assert!(s.exists("a.json"));

        s.delete("a.json").expect("delete");
        assert!(!s.exists("a.json"));
        assert!(matches!(s.delete("a.json"), Err(StagehandError::NotFound(_))));
    }

    #[test]
    fn scan_skips_foreign_files_and_sorts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let s = store(dir.path());
        for name in [
            "conn.20240301_000000.json",
            "conn.20240101_000000.json",
            "notes.txt",
            "other.20240201_000000.json",
        ] {
            s.save(name, &json!({}), SaveMode::Overwrite).expect("save");
        }

        let template =
            FormatTemplate::parse("{naming:%s}.{timestamp:%Y%m%d_%H%M%S}.json").expect("template");
        let pinned = Tokens {
            naming: Some("conn".to_string()),
            ..Tokens::default()
        };
        let files = s.scan(&template.matcher(&pinned).expect("matcher")).expect("scan");
        let names: Vec<_> = files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(
            names,
            vec!["conn.20240101_000000.json", "conn.20240301_000000.json"]
        );
    }
}
