//! # CLI Command Implementations
//!
//! Every command opens one register, runs one engine operation and returns
//! an [`Output`] that renders either as text or as pretty JSON.

use serde_json::{Value, json};
use stagehand_core::{MoveOptions, Params, PurgeReport, Register, StagehandError};
use std::fmt::Write as _;
use std::sync::Arc;

// =============================================================================
// OUTPUT
// =============================================================================

/// Result of one command, in both renderings.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub text: String,
    pub json: Value,
}

impl Output {
    fn new(text: String, json: Value) -> Self {
        Self { text, json }
    }

    /// Render for the terminal.
    #[must_use]
    pub fn render(&self, json_mode: bool) -> String {
        if json_mode {
            serde_json::to_string_pretty(&self.json).unwrap_or_default()
        } else {
            self.text.clone()
        }
    }
}

fn summary(register: &Register) -> Value {
    json!({
        "entry": register.entry().fullname(),
        "stage": register.stage(),
        "change_level": register.change_level().name(),
        "timestamp": register.timestamp().to_string(),
    })
}

fn report_output(report: &PurgeReport) -> Output {
    let mut text = format!("{}: {} file(s) removed", report.stage, report.removed.len());
    if let Some(boundary) = report.boundary {
        let _ = write!(text, " (older than {boundary})");
    }
    for file in &report.removed {
        let _ = write!(text, "\n  - {file}");
    }
    for path in &report.archived {
        let _ = write!(text, "\n  archived {}", path.display());
    }
    Output::new(text, serde_json::to_value(report).unwrap_or(Value::Null))
}

// =============================================================================
// STAGES COMMAND
// =============================================================================

/// List configured stages in promotion order.
pub fn cmd_stages(params: &Params) -> Output {
    let mut text = String::from("Stages\n======");
    for stage in &params.stages {
        let marker = if params.final_stage() == Some(stage.name.as_str()) {
            " (final)"
        } else {
            ""
        };
        let _ = write!(text, "\n{}{marker}  {}", stage.name, stage.format);
    }
    let stages: Vec<Value> = params
        .stages
        .iter()
        .map(|stage| serde_json::to_value(stage).unwrap_or(Value::Null))
        .collect();
    Output::new(
        text,
        json!({ "final_stage": params.final_stage(), "stages": stages }),
    )
}

// =============================================================================
// READ COMMANDS
// =============================================================================

/// Print an entry's data in `stage`.
pub fn cmd_show(
    params: Params,
    entry: &str,
    stage: &str,
    order: usize,
    hashed: bool,
) -> Result<Output, StagehandError> {
    let register = Register::open(entry, stage, Arc::new(params))?;
    let data = if order == 1 {
        register.data(hashed)
    } else {
        let data = register.get(stage, order, false)?;
        if hashed {
            stagehand_core::hash_tree(&data, &stagehand_core::primitives::BOOKKEEPING_KEYS)
        } else {
            data
        }
    };
    let text = serde_json::to_string_pretty(&data).unwrap_or_default();
    let mut out = summary(&register);
    out["data"] = data;
    Ok(Output::new(text, out))
}

/// List an entry's snapshots in `stage`, oldest first.
pub fn cmd_files(params: Params, entry: &str, stage: &str) -> Result<Output, StagehandError> {
    let register = Register::base(entry, Arc::new(params))?;
    let files = register.stage_files(stage)?;

    let mut text = format!("{} in {stage}: {} snapshot(s)", register.entry(), files.len());
    for file in &files {
        let _ = write!(text, "\n  {}", file.filename);
    }
    let names: Vec<&str> = files.iter().map(|file| file.filename.as_str()).collect();
    Ok(Output::new(
        text,
        json!({ "entry": register.entry().fullname(), "stage": stage, "files": names }),
    ))
}

// =============================================================================
// TRANSITION COMMANDS
// =============================================================================

/// Promote an entry from `from` into `stage`.
pub fn cmd_move(
    params: Params,
    entry: &str,
    from: &str,
    stage: &str,
    force: bool,
    retain: bool,
) -> Result<Output, StagehandError> {
    let register = Register::open(entry, from, Arc::new(params))?;
    let moved = register.move_with(stage, MoveOptions { force, retain })?;

    let promoted = moved.stage() == stage;
    let text = if promoted {
        format!(
            "{} promoted {from} -> {stage} ({})",
            moved.entry(),
            moved.version(false)?.tag()
        )
    } else {
        format!("{} unchanged, still in {from}", moved.entry())
    };
    let mut out = summary(&moved);
    out["promoted"] = json!(promoted);
    Ok(Output::new(text, out))
}

/// Promote an entry from base through every stage up to `stop`.
pub fn cmd_deploy(
    params: Params,
    entry: &str,
    stop: Option<&str>,
) -> Result<Output, StagehandError> {
    let register = Register::base(entry, Arc::new(params))?;
    let deployed = register.deploy(stop)?;

    let text = format!("{} deployed to {}", deployed.entry(), deployed.stage());
    Ok(Output::new(text, summary(&deployed)))
}

/// Apply the retention window of `stage`.
pub fn cmd_purge(params: Params, entry: &str, stage: &str) -> Result<Output, StagehandError> {
    let register = Register::open(entry, stage, Arc::new(params))?;
    let report = register.purge(None)?;
    Ok(report_output(&report))
}

/// Delete every snapshot of the entry in `stage`.
pub fn cmd_remove(params: Params, entry: &str, stage: &str) -> Result<Output, StagehandError> {
    let register = Register::open(entry, stage, Arc::new(params))?;
    let report = register.remove(None)?;
    Ok(report_output(&report))
}

/// Remove the entry from every stage.
pub fn cmd_reset(params: Params, entry: &str) -> Result<Output, StagehandError> {
    let register = Register::reset(entry, Arc::new(params))?;
    let text = format!("{} reset, bound to {}", register.entry(), register.stage());
    Ok(Output::new(text, summary(&register)))
}
