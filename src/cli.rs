// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! Behaviour is selected by target name only. The config file location and
//! log level come from `ASSETDAG_CONFIG` and `ASSETDAG_LOG`.

use clap::Parser;

/// Command-line arguments for `assetdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetdag",
    version,
    about = "Build, serve and watch static front-end assets.",
    long_about = None
)]
pub struct CliArgs {
    /// Task to run, e.g. `dev`, `dist`, `work` or `default`.
    #[arg(value_name = "TARGET", default_value = "default")]
    pub target: String,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
