// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::Selection;

/// Command-line arguments for `wavebuild`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "wavebuild",
    version,
    about = "Rebuild multi-architecture images wave by wave and publish their manifests.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the build plan (TOML).
    #[arg(long, value_name = "PATH", default_value = "Wavebuild.toml")]
    pub config: String,

    /// Run up to this many builds in parallel (overrides `[config].max_parallelism`).
    #[arg(short = 'j', long, value_name = "N")]
    pub parallel: Option<usize>,

    /// Build only this group and the groups built from it, optionally
    /// restricted to one variant (e.g. `debian-sid-base/amd64`).
    #[arg(long, value_name = "GROUP[/VARIANT]")]
    pub only: Option<Selection>,

    /// Do not push images or publish manifests.
    #[arg(long)]
    pub no_push: bool,

    /// Ignore the build tool's layer cache.
    #[arg(long)]
    pub no_cache: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WAVEBUILD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate the plan and print its waves without building anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
