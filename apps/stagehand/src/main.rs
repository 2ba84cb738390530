//! # Stagehand
//!
//! Promote configuration entries through ordered staging tiers.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │           apps/stagehand (THE BINARY)        │
//! │                                              │
//! │  ┌──────────────┐      ┌──────────────────┐  │
//! │  │     CLI      │      │     Settings     │  │
//! │  │   (clap)     │      │  (stagehand.toml)│  │
//! │  └──────┬───────┘      └────────┬─────────┘  │
//! │         └───────────┬───────────┘            │
//! │                     ▼                        │
//! │            ┌────────────────┐                │
//! │            │ stagehand-core │                │
//! │            │  (THE ENGINE)  │                │
//! │            └────────────────┘                │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! stagehand stages
//! stagehand show demo:conn
//! stagehand move demo:conn raw
//! stagehand deploy demo:conn --stop persisted
//! stagehand purge demo:conn raw
//! ```

use clap::Parser;
use stagehand::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // STAGEHAND_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("STAGEHAND_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let cli = cli::Cli::parse();

    let default_filter = if cli.verbose {
        "stagehand=debug,stagehand_core=debug"
    } else {
        "stagehand=info,stagehand_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
