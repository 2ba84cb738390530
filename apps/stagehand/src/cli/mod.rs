//! # Stagehand CLI Module
//!
//! This module implements the CLI interface for Stagehand.
//!
//! ## Available Commands
//!
//! - `stages` - List configured stages in promotion order
//! - `show` - Print an entry's data in a stage
//! - `files` - List an entry's snapshots in a stage
//! - `move` - Promote an entry into a stage
//! - `deploy` - Promote an entry through every stage
//! - `purge` - Apply a stage's retention window
//! - `remove` - Delete every snapshot of an entry in a stage
//! - `reset` - Remove an entry from all stages

mod commands;

use clap::{Parser, Subcommand};
use stagehand_core::StagehandError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Stagehand - configuration staging
///
/// Promotes named configuration entries from a read-only base tier through
/// ordered stages of timestamped, versioned snapshots.
#[derive(Parser, Debug)]
#[command(name = "stagehand")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the settings file
    #[arg(short, long, global = true, default_value = "stagehand.toml")]
    pub config: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List configured stages
    Stages,

    /// Print an entry's data
    Show {
        /// Entry name, `domain:name`
        entry: String,

        /// Stage to read from
        #[arg(short, long, default_value = "base")]
        stage: String,

        /// Snapshot order, 1 is the latest
        #[arg(short, long, default_value = "1")]
        order: usize,

        /// Print leaf hashes instead of values
        #[arg(long)]
        hashed: bool,
    },

    /// List an entry's snapshots in a stage
    Files {
        /// Entry name, `domain:name`
        entry: String,

        /// Stage to list
        stage: String,
    },

    /// Promote an entry into a stage
    Move {
        /// Entry name, `domain:name`
        entry: String,

        /// Target stage
        stage: String,

        /// Stage to promote from
        #[arg(short, long, default_value = "base")]
        from: String,

        /// Promote even when nothing changed
        #[arg(short, long)]
        force: bool,

        /// Skip the target stage's retention sweep
        #[arg(long)]
        no_retain: bool,
    },

    /// Promote an entry through every stage
    Deploy {
        /// Entry name, `domain:name`
        entry: String,

        /// Last stage to promote into (default: the final stage)
        #[arg(short, long)]
        stop: Option<String>,
    },

    /// Evict snapshots outside a stage's retention window
    Purge {
        /// Entry name, `domain:name`
        entry: String,

        /// Stage to purge
        stage: String,
    },

    /// Delete every snapshot of an entry in a stage
    Remove {
        /// Entry name, `domain:name`
        entry: String,

        /// Stage to clear
        stage: String,
    },

    /// Remove an entry from every stage
    Reset {
        /// Entry name, `domain:name`
        entry: String,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), StagehandError> {
    let params = crate::settings::load_params(&cli.config)?;
    let json_mode = cli.json_mode;

    let output = match cli.command {
        Commands::Stages => cmd_stages(&params),
        Commands::Show {
            entry,
            stage,
            order,
            hashed,
        } => cmd_show(params, &entry, &stage, order, hashed)?,
        Commands::Files { entry, stage } => cmd_files(params, &entry, &stage)?,
        Commands::Move {
            entry,
            stage,
            from,
            force,
            no_retain,
        } => cmd_move(params, &entry, &from, &stage, force, !no_retain)?,
        Commands::Deploy { entry, stop } => cmd_deploy(params, &entry, stop.as_deref())?,
        Commands::Purge { entry, stage } => cmd_purge(params, &entry, &stage)?,
        Commands::Remove { entry, stage } => cmd_remove(params, &entry, &stage)?,
        Commands::Reset { entry } => cmd_reset(params, &entry)?,
    };

    println!("{}", output.render(json_mode));
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
