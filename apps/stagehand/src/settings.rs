//! # Settings
//!
//! Loads `stagehand.toml` into [`Params`]. Relative `paths` entries are
//! resolved against the directory holding the file, so the same file works
//! from any working directory.

use stagehand_core::{Params, StagehandError};
use std::path::Path;

/// Read, rebase and validate the configuration at `path`.
pub fn load_params(path: &Path) -> Result<Params, StagehandError> {
    let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => StagehandError::NotFound(path.to_path_buf()),
        _ => StagehandError::IoError(format!("cannot read {}: {e}", path.display())),
    })?;
    let mut params: Params = toml::from_str(&text)
        .map_err(|e| StagehandError::Config(format!("{}: {e}", path.display())))?;

    let root = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    params.rebase(root);
    params.validate()?;

    tracing::debug!(
        config = %path.display(),
        stages = params.stages.len(),
        "settings loaded"
    );
    Ok(params)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[paths]
conf = "conf"
data = "data"

[[stages]]
name = "raw"
format = "{naming:%s}.{timestamp:%Y%m%d_%H%M%S}"
"#;

    #[test]
    fn relative_paths_follow_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stagehand.toml");
        std::fs::write(&path, SAMPLE).expect("write");

        let params = load_params(&path).expect("load");
        assert_eq!(params.paths.conf, dir.path().join("conf"));
        assert_eq!(params.paths.data, dir.path().join("data"));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = load_params(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(StagehandError::NotFound(_))));
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stagehand.toml");

        std::fs::write(&path, "[paths]\nconf = \"c\"\ndata = \"d\"\n").expect("write");
        assert!(matches!(load_params(&path), Err(StagehandError::Config(_))));

        std::fs::write(&path, "unknown = 1\n").expect("write");
        assert!(matches!(load_params(&path), Err(StagehandError::Config(_))));
    }
}
