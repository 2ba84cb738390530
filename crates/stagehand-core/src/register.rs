//! # Register
//!
//! The promotion state machine for one configuration entry.
//!
//! A register is bound to `(entry, stage)`. Opening one loads the entry's data
//! from that stage (the base tier, or the latest snapshot of a configured
//! stage) and classifies it against the stage's metadata record.
//!
//! ```text
//! open(base) ──move(raw)──▶ bound(raw) ──move(persisted)──▶ bound(persisted)
//!      │                        │
//!      └── no change, no force: stays bound(base)
//! ```
//!
//! ## Promotion
//!
//! `move` classifies the hashed current data against the target stage's
//! latest snapshot, then:
//!
//! 1. `None` without `force`: warn, return the register unchanged
//! 2. bump the greater of the current and the target's latest version
//! 3. encode the snapshot name from the stage template
//! 4. write the data plus `updated_at` and `version`
//! 5. apply the stage's retention (failures only warn)
//! 6. return a register bound to the target stage
//!
//! The base tier is never written: moving, purging or removing in `base` is
//! `InvalidStage`.

use crate::classify::ChangeClassifier;
use crate::config::{CollisionPolicy, Params};
use crate::hashing::hash_tree;
use crate::primitives::{
    ARCHIVE_DATE_FMT, BASE_STAGE, BOOKKEEPING_KEYS, DATE_FMT, UPDATE_KEY, VERSION_KEY,
};
use crate::retention::RetentionPolicy;
use crate::store::{MetadataRecord, SaveMode, SnapshotStore, StageFile};
use crate::template::{TemplateMatcher, Tokens};
use crate::{ChangeLevel, Entry, Extension, StagehandError, Version};
use chrono::{NaiveDateTime, SubsecRound};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;

// =============================================================================
// OPTIONS & REPORTS
// =============================================================================

/// Switches for [`Register::move_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOptions {
    /// Promote even when nothing changed.
    pub force: bool,
    /// Apply the target stage's retention after writing.
    pub retain: bool,
}

impl Default for MoveOptions {
    fn default() -> Self {
        Self {
            force: false,
            retain: true,
        }
    }
}

/// Files evicted from one stage by `purge` or `remove`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PurgeReport {
    pub stage: String,
    /// Retention cutoff; `None` for `remove` and for no-op purges.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boundary: Option<NaiveDateTime>,
    /// File names deleted from the stage.
    pub removed: Vec<String>,
    /// Archive copies written before deleting.
    pub archived: Vec<PathBuf>,
}

// =============================================================================
// REGISTER
// =============================================================================

/// One entry bound to one stage.
#[derive(Debug, Clone)]
pub struct Register {
    entry: Entry,
    stage: String,
    params: Arc<Params>,
    data: Map<String, Value>,
    meta: MetadataRecord,
    changed: ChangeLevel,
    opened_at: NaiveDateTime,
}

impl Register {
    /// Open `name` bound to the base tier.
    pub fn base(name: &str, params: Arc<Params>) -> Result<Self, StagehandError> {
        Self::open(name, BASE_STAGE, params)
    }

    /// Open `name` bound to `stage`, stamped with the current local time.
    pub fn open(name: &str, stage: &str, params: Arc<Params>) -> Result<Self, StagehandError> {
        let now = chrono::Local::now().naive_local().trunc_subsecs(0);
        Self::open_at(name, stage, params, now)
    }

    /// Open `name` bound to `stage`, stamped with `now`.
    ///
    /// Fails with `InvalidStage` for an unconfigured stage and with
    /// `EntryNotFound` when the stage holds no data for the entry. When the
    /// data differs from the stage's metadata record, the record is
    /// refreshed.
    pub fn open_at(
        name: &str,
        stage: &str,
        params: Arc<Params>,
        now: NaiveDateTime,
    ) -> Result<Self, StagehandError> {
        let entry = Entry::parse(name)?;
        if stage != BASE_STAGE {
            params.stage(stage)?;
        }

        let data = match fetch(&entry, &params, stage, 1, false)? {
            Value::Object(map) if !map.is_empty() => map,
            _ => {
                return Err(StagehandError::EntryNotFound {
                    name: entry.fullname(),
                    stage: stage.to_string(),
                });
            }
        };

        let store = params.metadata_store();
        let mut meta = store.load(&entry, stage)?;
        let hashed = hash_tree(&Value::Object(data.clone()), &BOOKKEEPING_KEYS);
        let changed = ChangeClassifier::bookkeeping().classify(&hashed, meta.data());
        if changed.is_changed() {
            tracing::debug!(entry = %entry, stage, level = %changed, "refreshing metadata");
            meta = MetadataRecord::new(hashed);
            store.save(&entry, stage, &meta)?;
        }

        Ok(Self {
            entry,
            stage: stage.to_string(),
            params,
            data,
            meta,
            changed,
            opened_at: now,
        })
    }

    /// Remove the entry from every configured stage, then open it on base.
    ///
    /// Stages that hold nothing for the entry are skipped.
    pub fn reset(name: &str, params: Arc<Params>) -> Result<Self, StagehandError> {
        for stage in params.stage_names() {
            let outcome = Self::open(name, stage, Arc::clone(&params))
                .and_then(|register| register.remove(Some(stage)));
            match outcome {
                Ok(report) => {
                    tracing::info!(name, stage, removed = report.removed.len(), "stage reset");
                }
                Err(StagehandError::EntryNotFound { .. } | StagehandError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Self::base(name, params)
    }

    // -------------------------------------------------------------------------
    // ACCESSORS
    // -------------------------------------------------------------------------

    /// Get the entry identity.
    #[must_use]
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// Get the bound stage.
    #[must_use]
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Get the configuration.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Get the metadata record this register was classified against.
    #[must_use]
    pub fn metadata(&self) -> &MetadataRecord {
        &self.meta
    }

    /// The entry's data, or a leaf-hashed copy without bookkeeping fields.
    #[must_use]
    pub fn data(&self, hashing: bool) -> Value {
        let data = Value::Object(self.data.clone());
        if hashing {
            hash_tree(&data, &BOOKKEEPING_KEYS)
        } else {
            data
        }
    }

    /// Change level of the data against the stage's metadata record.
    #[must_use]
    pub fn change_level(&self) -> ChangeLevel {
        self.changed
    }

    /// The data's `version` field (default `v0.0.1`), bumped by the change
    /// level when `force_next` is set.
    pub fn version(&self, force_next: bool) -> Result<Version, StagehandError> {
        let current = match self.data.get(VERSION_KEY) {
            Some(Value::String(tag)) => tag.parse()?,
            Some(other) => return Err(StagehandError::InvalidVersion(other.to_string())),
            None => Version::default(),
        };
        if force_next {
            Ok(self.params.version_policy().bump(current, self.changed))
        } else {
            Ok(current)
        }
    }

    /// Time the data took effect.
    ///
    /// The open time when the data changed against metadata, otherwise the
    /// `updated_at` field, otherwise the open time.
    #[must_use]
    pub fn timestamp(&self) -> NaiveDateTime {
        if self.changed.is_changed() {
            return self.opened_at;
        }
        self.data
            .get(UPDATE_KEY)
            .and_then(Value::as_str)
            .and_then(|text| NaiveDateTime::parse_from_str(text, DATE_FMT).ok())
            .unwrap_or(self.opened_at)
    }

    // -------------------------------------------------------------------------
    // STAGE READS
    // -------------------------------------------------------------------------

    /// Data of the `order`-th latest snapshot in `stage` (`1` is the latest;
    /// `reverse` counts from the oldest). Empty when there is none.
    pub fn get(&self, stage: &str, order: usize, reverse: bool) -> Result<Value, StagehandError> {
        fetch(&self.entry, &self.params, stage, order, reverse)
    }

    /// This entry's decodable files in `stage`, oldest first.
    pub fn stage_files(&self, stage: &str) -> Result<Vec<StageFile>, StagehandError> {
        let (store, matcher) = stage_access(&self.entry, &self.params, stage)?;
        store.scan(&matcher)
    }

    /// A fresh register for the same entry bound to `stage`.
    pub fn switch(&self, stage: &str) -> Result<Self, StagehandError> {
        Self::open_at(
            &self.entry.fullname(),
            stage,
            Arc::clone(&self.params),
            self.opened_at,
        )
    }

    // -------------------------------------------------------------------------
    // TRANSITIONS
    // -------------------------------------------------------------------------

    /// Promote into `stage` with default options.
    pub fn move_to(&self, stage: &str) -> Result<Self, StagehandError> {
        self.move_with(stage, MoveOptions::default())
    }

    /// Promote into `stage`.
    pub fn move_with(&self, stage: &str, options: MoveOptions) -> Result<Self, StagehandError> {
        if stage == BASE_STAGE {
            return Err(StagehandError::InvalidStage(format!(
                "{BASE_STAGE} is read-only"
            )));
        }
        let definition = self.params.stage(stage)?;
        let target = self.get(stage, 1, false)?;
        let level = ChangeClassifier::bookkeeping()
            .classify(&self.data(true), &hash_tree(&target, &BOOKKEEPING_KEYS));

        if !level.is_changed() && !options.force {
            tracing::warn!(
                entry = %self.entry,
                from = %self.stage,
                to = stage,
                "no change to promote, staying put"
            );
            return Ok(self.clone());
        }

        let current = self.version(false)?;
        let latest = match target.get(VERSION_KEY).and_then(Value::as_str) {
            Some(tag) => tag.parse()?,
            None => current,
        };
        let version = self.params.version_policy().bump(current.max(latest), level);
        let timestamp = self.timestamp();

        let tokens = Tokens {
            naming: Some(self.entry.name().to_string()),
            domain: Some(self.entry.domain().to_string()),
            compress: definition.compress,
            extension: Some(Extension::Json),
            version: Some(version),
            timestamp: Some(timestamp),
        };
        let filename = definition.file_template()?.encode(&tokens)?;

        let store = self.params.stage_store(stage)?;
        if store.exists(&filename) {
            match self.params.flags.on_collision {
                CollisionPolicy::Overwrite => {
                    tracing::warn!(file = %filename, stage, "snapshot already exists, overwriting");
                }
                CollisionPolicy::Fail => {
                    return Err(StagehandError::SnapshotCollision {
                        stage: stage.to_string(),
                        file: filename,
                    });
                }
            }
        }

        let mut payload = self.data.clone();
        payload.insert(
            UPDATE_KEY.to_string(),
            Value::String(timestamp.format(DATE_FMT).to_string()),
        );
        payload.insert(VERSION_KEY.to_string(), Value::String(version.tag()));
        store.save(&filename, &Value::Object(payload), SaveMode::Overwrite)?;
        tracing::info!(
            entry = %self.entry,
            from = %self.stage,
            to = stage,
            %version,
            level = %level,
            file = %filename,
            "promoted"
        );

        if options.retain {
            if let Err(e) = self.purge(Some(stage)) {
                tracing::warn!(stage, error = %e, "retention sweep aborted");
            }
        }
        self.switch(stage)
    }

    /// Promote through every stage in order, stopping after `stop` (or the
    /// final stage).
    pub fn deploy(&self, stop: Option<&str>) -> Result<Self, StagehandError> {
        let stop = match stop {
            Some(stop) => stop,
            None => self
                .params
                .final_stage()
                .ok_or_else(|| StagehandError::Config("no stages configured".to_string()))?,
        };
        if !self.params.has_stage(stop) {
            return Err(StagehandError::InvalidStage(stop.to_string()));
        }

        let mut current = self.clone();
        for stage in self.params.stage_names() {
            current = current.move_to(stage)?;
            if stage == stop {
                break;
            }
        }
        Ok(current)
    }

    /// Evict snapshots outside the retention window of `stage` (default: the
    /// bound stage).
    ///
    /// The first failing delete or archive copy aborts the sweep.
    pub fn purge(&self, stage: Option<&str>) -> Result<PurgeReport, StagehandError> {
        let stage = self.writable_stage(stage)?;
        let definition = self.params.stage(stage)?;
        let (store, matcher) = stage_access(&self.entry, &self.params, stage)?;
        let files = store.scan(&matcher)?;
        let plan = RetentionPolicy::plan(definition.retention.as_ref(), &files);

        let mut report = PurgeReport {
            stage: stage.to_string(),
            boundary: plan.boundary,
            ..PurgeReport::default()
        };
        for file in &plan.evict {
            self.evict(&store, stage, &file.filename, &mut report)?;
        }
        if !report.removed.is_empty() {
            tracing::info!(entry = %self.entry, stage, removed = report.removed.len(), "purged");
        }
        Ok(report)
    }

    /// Evict every snapshot of the entry from `stage` (default: the bound
    /// stage).
    pub fn remove(&self, stage: Option<&str>) -> Result<PurgeReport, StagehandError> {
        let stage = self.writable_stage(stage)?;
        let (store, matcher) = stage_access(&self.entry, &self.params, stage)?;

        let mut report = PurgeReport {
            stage: stage.to_string(),
            ..PurgeReport::default()
        };
        for file in store.scan(&matcher)? {
            self.evict(&store, stage, &file.filename, &mut report)?;
        }
        tracing::info!(entry = %self.entry, stage, removed = report.removed.len(), "removed");
        Ok(report)
    }

    fn writable_stage<'a>(&'a self, stage: Option<&'a str>) -> Result<&'a str, StagehandError> {
        let stage = stage.unwrap_or(&self.stage);
        if stage == BASE_STAGE {
            return Err(StagehandError::InvalidStage(format!(
                "{BASE_STAGE} is read-only"
            )));
        }
        Ok(stage)
    }

    /// Delete one file, archiving it first when the flag is set.
    fn evict(
        &self,
        store: &SnapshotStore,
        stage: &str,
        filename: &str,
        report: &mut PurgeReport,
    ) -> Result<(), StagehandError> {
        if self.params.flags.archive {
            let name = format!(
                "{}_{}_{filename}",
                stage.to_lowercase(),
                self.opened_at.format(ARCHIVE_DATE_FMT)
            );
            let dest = self.params.archive_dir().join(name);
            store.move_to(filename, &dest)?;
            report.archived.push(dest);
        }
        store.delete(filename)?;
        report.removed.push(filename.to_string());
        Ok(())
    }
}

impl PartialEq for Register {
    fn eq(&self, other: &Self) -> bool {
        self.entry == other.entry
            && self.stage == other.stage
            && self.timestamp() == other.timestamp()
    }
}

impl std::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.entry.fullname(), self.stage)
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn stage_access(
    entry: &Entry,
    params: &Params,
    stage: &str,
) -> Result<(SnapshotStore, TemplateMatcher), StagehandError> {
    let definition = params.stage(stage)?;
    let store = params.stage_store(stage)?;
    let matcher = definition.file_template()?.matcher(&entry.pinned_tokens())?;
    Ok((store, matcher))
}

fn fetch(
    entry: &Entry,
    params: &Params,
    stage: &str,
    order: usize,
    reverse: bool,
) -> Result<Value, StagehandError> {
    let empty = || Value::Object(Map::new());
    if stage == BASE_STAGE {
        let found = params
            .base_store(entry.domain())
            .get(entry.name(), order)?;
        return Ok(found.unwrap_or_else(empty));
    }

    let (store, matcher) = stage_access(entry, params, stage)?;
    let mut files = store.scan(&matcher)?;
    if files.is_empty() {
        return Ok(empty());
    }
    if order == 0 || order > files.len() {
        tracing::warn!(entry = %entry, stage, order, available = files.len(), "order is out of range");
        return Ok(empty());
    }
    if reverse {
        files.reverse();
    }
    let picked = &files[files.len() - order];
    store.load(&picked.filename)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StageDefinition;
    use chrono::NaiveDate;
    use std::path::Path;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|d| d.and_hms_opt(h, 0, 0))
            .expect("valid")
    }

    fn setup(root: &Path) -> Arc<Params> {
        std::fs::create_dir_all(root.join("conf/demo")).expect("mkdir");
        std::fs::write(
            root.join("conf/demo/conn.yaml"),
            "conn:\n  type: X\n  endpoint: E\n",
        )
        .expect("write");
        Arc::new(
            Params::new(root.join("conf"), root.join("data"))
                .with_stage(StageDefinition::new(
                    "raw",
                    "{naming:%s}.{timestamp:%Y%m%d_%H%M%S}",
                ))
                .with_stage(StageDefinition::new(
                    "persisted",
                    "{naming:%s}.{version:v%m.%n.%c}",
                )),
        )
    }

    #[test]
    fn open_reports_no_prior_metadata_then_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let params = setup(dir.path());

        let first = Register::open_at("demo:conn", BASE_STAGE, Arc::clone(&params), at(1))
            .expect("open");
        assert_eq!(first.change_level(), ChangeLevel::NoPriorMetadata);
        assert_eq!(first.data(false)["alias"], "conn");

        let second = Register::open_at("demo:conn", BASE_STAGE, params, at(2)).expect("open");
        assert_eq!(second.change_level(), ChangeLevel::None);
        assert_eq!(second.to_string(), "(demo:conn, base)");
    }

    #[test]
    fn unknown_entry_and_stage_fail() {
        let dir = tempfile::tempdir().expect("tempdir");
        let params = setup(dir.path());

        assert!(matches!(
            Register::base("demo:missing", Arc::clone(&params)),
            Err(StagehandError::EntryNotFound { .. })
        ));
        assert!(matches!(
            Register::open("demo:conn", "gold", Arc::clone(&params)),
            Err(StagehandError::InvalidStage(_))
        ));
        assert!(matches!(
            Register::open("demo:conn", "raw", params),
            Err(StagehandError::EntryNotFound { .. })
        ));
    }

    #[test]
    fn hashed_data_drops_bookkeeping() {
        let dir = tempfile::tempdir().expect("tempdir");
        let params = setup(dir.path());
        let reg = Register::open_at("demo:conn", BASE_STAGE, params, at(1)).expect("open");
        let moved = reg.move_to("raw").expect("move");

        assert!(moved.data(false).get(VERSION_KEY).is_some());
        assert!(moved.data(true).get(VERSION_KEY).is_none());
        assert!(moved.data(true).get(UPDATE_KEY).is_none());
    }

    #[test]
    fn base_is_read_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        let params = setup(dir.path());
        let reg = Register::open_at("demo:conn", BASE_STAGE, params, at(1)).expect("open");

        assert!(matches!(reg.move_to(BASE_STAGE), Err(StagehandError::InvalidStage(_))));
        assert!(matches!(reg.remove(None), Err(StagehandError::InvalidStage(_))));
        assert!(matches!(reg.purge(None), Err(StagehandError::InvalidStage(_))));
    }

    #[test]
    fn version_carries_into_versioned_stage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let params = setup(dir.path());
        let reg = Register::open_at("demo:conn", BASE_STAGE, params, at(1)).expect("open");

        let persisted = reg.move_to("raw").and_then(|r| r.move_to("persisted")).expect("move");
        assert_eq!(persisted.stage(), "persisted");
        assert_eq!(persisted.version(false).expect("version"), Version::new(0, 0, 1));
        let files = persisted.stage_files("persisted").expect("files");
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].filename, "conn.v0.0.1.json");
    }

    #[test]
    fn version_force_next_bumps_by_change_level() {
        let dir = tempfile::tempdir().expect("tempdir");
        let params = setup(dir.path());
        Register::open_at("demo:conn", BASE_STAGE, Arc::clone(&params), at(1)).expect("open");

        std::fs::write(
            dir.path().join("conf/demo/conn.yaml"),
            "conn:\n  type: X\n  endpoint: E2\n",
        )
        .expect("write");
        let changed = Register::open_at("demo:conn", BASE_STAGE, Arc::clone(&params), at(2))
            .expect("open");
        assert_eq!(changed.change_level(), ChangeLevel::ValueChanged);
        assert_eq!(changed.version(false).expect("version"), Version::new(0, 0, 1));
        assert_eq!(changed.version(true).expect("version"), Version::new(0, 0, 2));

        let unchanged = Register::open_at("demo:conn", BASE_STAGE, params, at(3)).expect("open");
        assert_eq!(unchanged.change_level(), ChangeLevel::None);
        assert_eq!(unchanged.version(true).expect("version"), Version::new(0, 0, 1));
    }

    #[test]
    fn timestamp_prefers_open_time_when_changed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let params = setup(dir.path());
        let reg = Register::open_at("demo:conn", BASE_STAGE, Arc::clone(&params), at(3))
            .expect("open");
        assert_eq!(reg.timestamp(), at(3));

        let raw = reg.move_to("raw").expect("move");
        let reopened = Register::open_at("demo:conn", "raw", params, at(9)).expect("open");
        assert_eq!(reopened.change_level(), ChangeLevel::None);
        assert_eq!(reopened.timestamp(), at(3));
        assert_eq!(reopened, raw.switch("raw").expect("switch"));
    }

    #[test]
    fn get_out_of_range_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let params = setup(dir.path());
        let reg = Register::open_at("demo:conn", BASE_STAGE, params, at(1)).expect("open");
        reg.move_to("raw").expect("move");

        assert!(reg.get("raw", 1, false).expect("get").get("type").is_some());
        assert_eq!(reg.get("raw", 2, false).expect("get"), Value::Object(Map::new()));
        assert_eq!(reg.get(BASE_STAGE, 2, false).expect("get"), Value::Object(Map::new()));
    }
}
