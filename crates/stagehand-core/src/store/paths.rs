//! Recursive file listing with glob filters.

use crate::StagehandError;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

fn glob_set(patterns: &[&str]) -> Result<GlobSet, StagehandError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| StagehandError::Config(format!("Invalid glob {pattern:?}: {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| StagehandError::Config(format!("Invalid glob set: {e}")))
}

/// List regular files under `root` whose file name matches `name_glob` and
/// none of `exclude`, sorted by path.
///
/// A missing `root` lists nothing.
pub fn list_files(
    root: &Path,
    name_glob: &str,
    exclude: &[&str],
) -> Result<Vec<PathBuf>, StagehandError> {
    if !root.exists() {
        return Ok(Vec::new());
    }
    let include = glob_set(&[name_glob])?;
    let exclude = glob_set(exclude)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            StagehandError::IoError(format!("Failed to walk {}: {e}", root.display()))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name();
        if include.is_match(name) && !exclude.is_match(name) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}
