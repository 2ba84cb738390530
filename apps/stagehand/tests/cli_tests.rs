//! Command tests against a settings file in a temporary directory.

use clap::Parser;
use stagehand::cli::{
    Cli, cmd_deploy, cmd_files, cmd_move, cmd_purge, cmd_remove, cmd_reset, cmd_show, cmd_stages,
    execute,
};
use stagehand::settings::load_params;
use stagehand_core::{Params, StagehandError};
use std::ffi::OsString;
use std::path::Path;

const SETTINGS: &str = r#"
[paths]
conf = "conf"
data = "data"

[[stages]]
name = "raw"
format = "{naming:%s}.{timestamp:%Y%m%d_%H%M%S}"
retention = { days = 30 }

[[stages]]
name = "persisted"
format = "{naming:%s}.{version:v%m.%n.%c}"
"#;

fn setup(root: &Path) -> Params {
    std::fs::create_dir_all(root.join("conf/demo")).expect("mkdir");
    std::fs::write(
        root.join("conf/demo/conn.yaml"),
        "conn:\n  type: X\n  endpoint: E\n",
    )
    .expect("write base");
    std::fs::write(root.join("stagehand.toml"), SETTINGS).expect("write settings");
    load_params(&root.join("stagehand.toml")).expect("settings")
}

// =============================================================================
// READ COMMANDS
// =============================================================================

#[test]
fn stages_lists_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let params = setup(dir.path());

    let out = cmd_stages(&params);
    assert_eq!(out.json["final_stage"], "persisted");
    assert_eq!(out.json["stages"][0]["name"], "raw");
    assert_eq!(out.json["stages"][1]["name"], "persisted");
    assert!(out.text.contains("persisted (final)"));
}

#[test]
fn show_base_data() {
    let dir = tempfile::tempdir().expect("tempdir");
    let params = setup(dir.path());

    let out = cmd_show(params, "demo:conn", "base", 1, false).expect("show");
    assert_eq!(out.json["data"]["endpoint"], "E");
    assert_eq!(out.json["stage"], "base");
    assert!(out.render(false).contains("\"endpoint\": \"E\""));
}

#[test]
fn show_hashed_hides_values() {
    let dir = tempfile::tempdir().expect("tempdir");
    let params = setup(dir.path());

    let out = cmd_show(params, "demo:conn", "base", 1, true).expect("show");
    let hashed = out.json["data"]["endpoint"].as_str().expect("string");
    assert_eq!(hashed.len(), 32);
    assert_ne!(hashed, "E");
}

#[test]
fn show_unknown_entry_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let params = setup(dir.path());

    let result = cmd_show(params, "demo:missing", "base", 1, false);
    assert!(matches!(result, Err(StagehandError::EntryNotFound { .. })));
}

// =============================================================================
// TRANSITION COMMANDS
// =============================================================================

#[test]
fn move_then_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let params = setup(dir.path());

    let out = cmd_move(params.clone(), "demo:conn", "base", "raw", false, true).expect("move");
    assert_eq!(out.json["promoted"], true);
    assert_eq!(out.json["stage"], "raw");

    let again = cmd_move(params.clone(), "demo:conn", "base", "raw", false, true).expect("move");
    assert_eq!(again.json["promoted"], false);

    let files = cmd_files(params, "demo:conn", "raw").expect("files");
    assert_eq!(files.json["files"].as_array().map(Vec::len), Some(1));
}

#[test]
fn deploy_reaches_final_stage() {
    let dir = tempfile::tempdir().expect("tempdir");
    let params = setup(dir.path());

    let out = cmd_deploy(params, "demo:conn", None).expect("deploy");
    assert_eq!(out.json["stage"], "persisted");
    assert!(dir.path().join("data/persisted/conn.v0.0.1.json").is_file());
}

#[test]
fn purge_remove_and_reset() {
    let dir = tempfile::tempdir().expect("tempdir");
    let params = setup(dir.path());
    cmd_deploy(params.clone(), "demo:conn", None).expect("deploy");

    let purged = cmd_purge(params.clone(), "demo:conn", "raw").expect("purge");
    assert_eq!(purged.json["removed"].as_array().map(Vec::len), Some(0));

    let removed = cmd_remove(params.clone(), "demo:conn", "raw").expect("remove");
    assert_eq!(removed.json["removed"].as_array().map(Vec::len), Some(1));

    let reset = cmd_reset(params.clone(), "demo:conn").expect("reset");
    assert_eq!(reset.json["stage"], "base");
    let files = cmd_files(params, "demo:conn", "persisted").expect("files");
    assert_eq!(files.json["files"].as_array().map(Vec::len), Some(0));
}

#[test]
fn execute_runs_against_settings_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    setup(dir.path());
    let config = dir.path().join("stagehand.toml");

    let args: Vec<OsString> = vec![
        "stagehand".into(),
        "--config".into(),
        config.into_os_string(),
        "deploy".into(),
        "demo:conn".into(),
        "--stop".into(),
        "raw".into(),
    ];
    let cli = Cli::try_parse_from(args).expect("parse");
    execute(cli).expect("execute");

    assert!(dir.path().join("data/raw").is_dir());
    assert!(!dir.path().join("data/persisted").exists());
}
