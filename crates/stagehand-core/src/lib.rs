//! # stagehand-core
//!
//! The staging engine for Stagehand.
//!
//! A named configuration entry is promoted through an ordered list of stages.
//! Each stage holds timestamped, versioned snapshots of the entry's data. The
//! engine:
//! - detects whether the data changed against the last recorded state
//! - derives the next version and a canonical snapshot filename
//! - prunes or archives snapshots outside a stage's retention window
//! - performs stage-to-stage promotion as an explicit state transition
//!
//! ## Architectural Constraints
//!
//! - Synchronous, blocking filesystem I/O; no async, no network
//! - One writer per entry and stage; no cross-process locking
//! - The base tier is read-only to the engine
//! - Codecs and listing sit behind narrow interfaces (`Codec`, `list_files`)

// =============================================================================
// MODULES
// =============================================================================

pub mod classify;
pub mod config;
pub mod entry;
pub mod formats;
pub mod hashing;
pub mod primitives;
pub mod register;
pub mod retention;
pub mod store;
pub mod template;
pub mod types;
pub mod version;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{ChangeLevel, Compression, Extension, Result, StagehandError};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use classify::ChangeClassifier;
pub use config::{CollisionPolicy, EngineFlags, Params, PathConfig, StageDefinition};
pub use entry::Entry;
pub use hashing::hash_tree;
pub use register::{MoveOptions, PurgeReport, Register};
pub use retention::{RetentionPlan, RetentionPolicy, RetentionRule};
pub use template::{FormatTemplate, TemplateError, TemplateMatcher, TokenKind, Tokens};
pub use version::{Version, VersionPolicy};

// =============================================================================
// RE-EXPORTS: Storage (from store and formats modules)
// =============================================================================

pub use formats::{Codec, JsonCodec, TomlCodec, YamlCodec};
pub use store::{
    BaseStore, MetadataRecord, MetadataStore, SaveMode, SnapshotStore, StageFile, list_files,
};
