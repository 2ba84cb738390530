//! # Stagehand
//!
//! Command-line front end for `stagehand-core`.
//!
//! - [`cli`] parses arguments and runs one engine operation per invocation
//! - [`settings`] loads the TOML configuration into engine `Params`

pub mod cli;
pub mod settings;
