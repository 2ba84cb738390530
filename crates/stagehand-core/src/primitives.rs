//! # Engine Primitives
//!
//! Fixed names and formats shared by every stage tier.
//!
//! These values are part of the on-disk layout: changing any of them makes
//! existing snapshot trees unreadable by the engine.

/// Name of the read-only origin tier.
///
/// The base tier holds the authoritative entry data. The engine reads from it
/// but never writes a snapshot into it.
pub const BASE_STAGE: &str = "base";

/// Bookkeeping field holding the promotion timestamp of a snapshot.
pub const UPDATE_KEY: &str = "updated_at";

/// Bookkeeping field holding the version tag of a snapshot.
pub const VERSION_KEY: &str = "version";

/// Both bookkeeping fields. Change detection ignores them on both sides.
pub const BOOKKEEPING_KEYS: [&str; 2] = [UPDATE_KEY, VERSION_KEY];

/// Key injected in front of base-tier data, holding the entry name.
pub const ALIAS_KEY: &str = "alias";

/// Directory under the data root that keeps change-detection records.
pub const METADATA_DIR: &str = "__METADATA";

/// Default archive directory name under the data root.
pub const ARCHIVE_DIR: &str = ".archive";

/// Suffix appended to every stage format template.
///
/// Stage snapshots are always written with the JSON codec.
pub const STAGE_FILE_SUFFIX: &str = ".json";

/// `strftime` format of the `updated_at` bookkeeping field.
pub const DATE_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// `strftime` format of the promotion timestamp in archive file names.
pub const ARCHIVE_DATE_FMT: &str = "%Y%m%d%H%M%S";

/// Hex characters kept from each leaf digest in a hashed tree.
pub const LEAF_HASH_LEN: usize = 32;

/// File patterns skipped when scanning the base tier.
pub const BASE_EXCLUDED_PATTERNS: [&str; 2] = ["*.json", "*.toml"];
