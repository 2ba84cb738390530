//! # Store Module
//!
//! Everything the engine reads from or writes to disk:
//! - `SnapshotStore`: one stage directory of snapshot files
//! - `BaseStore`: the read-only origin tier
//! - `MetadataStore`: change-detection records
//! - `list_files`: recursive, glob-filtered listing

mod base;
mod metadata;
mod paths;
mod stage;

pub use base::BaseStore;
pub use metadata::{MetadataRecord, MetadataStore};
pub use paths::list_files;
pub use stage::{SaveMode, SnapshotStore, StageFile};
