// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::types::Platform;

/// Command-line arguments for `scoutwarden`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "scoutwarden",
    version,
    about = "Run a task through a worker CLI that never exits on its own, and stop it once the result appears.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Scoutwarden.toml` in the current working directory; a
    /// missing default file means built-in defaults.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SCOUTWARDEN_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Hard timeout for the worker, in milliseconds. Overrides
    /// `CCR_TIMEOUT_MS` and the config file.
    #[arg(long, global = true, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Worker executable to run. Overrides `CCR_PATH` and the config file.
    #[arg(long, global = true, value_name = "PATH")]
    pub worker: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the worker on a task and print the result and log paths.
    Run {
        /// Task reference: absolute path, relative path, or bare task name.
        task: String,
    },
    /// Print where a task's artifacts would go and how the worker would be
    /// launched, without running anything.
    Paths {
        task: String,

        /// Show the launch plan as it would be on this platform
        /// (`windows` or `unix`). Defaults to the current host.
        #[arg(long, value_name = "PLATFORM")]
        platform: Option<Platform>,
    },
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
