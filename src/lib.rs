// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod invoke;
pub mod logging;
pub mod paths;
pub mod types;

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tracing::debug;

use crate::cli::{CliArgs, Command};
use crate::config::loader::{default_config_path, load_and_validate, overrides_from_env};
use crate::config::{ConfigFile, ConfigOverrides};
use crate::fs::{FileSystem, RealFileSystem};
use crate::invoke::{PreparedRun, TaskInvoker};
use crate::types::Platform;

pub use crate::errors::WardenError;
pub use crate::invoke::InvocationReport;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (file, then `CCR_*` env, then CLI flags)
/// - task resolution and path derivation
/// - the supervised worker run
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_config(&args)?;
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let cwd = std::env::current_dir()?;

    match &args.command {
        Command::Run { task } => {
            let invoker = TaskInvoker::from_config(&cfg, fs, cwd, Platform::current());
            let report = invoker.invoke(task).await?;
            println!("{report}");
        }
        Command::Paths { task, platform } => {
            let platform = platform.unwrap_or_else(Platform::current);
            let invoker = TaskInvoker::from_config(&cfg, fs, cwd, platform);
            let prepared = invoker.prepare(task, Utc::now())?;
            print_paths(&prepared);
        }
    }
    Ok(())
}

/// Load the config file and layer env and CLI overrides on top.
pub fn load_config(args: &CliArgs) -> Result<ConfigFile> {
    let mut overrides = overrides_from_env()?;
    merge_cli_overrides(&mut overrides, args);

    let (path, required) = match &args.config {
        Some(path) => (path.clone(), true),
        None => (default_config_path(), false),
    };
    debug!(path = %path.display(), required, "loading config");

    Ok(load_and_validate(&path, required, &overrides)?)
}

fn merge_cli_overrides(overrides: &mut ConfigOverrides, args: &CliArgs) {
    if let Some(worker) = &args.worker {
        overrides.worker_path = Some(worker.clone());
    }
    if let Some(ms) = args.timeout_ms {
        overrides.timeout_ms = Some(ms);
    }
}

fn print_paths(prepared: &PreparedRun) {
    println!("task: {}", prepared.task.display());
    println!("result: {}", prepared.locations.result.display());
    println!("log: {}", prepared.locations.latest_log.display());
    println!("log_ts: {}", prepared.locations.timestamped_log.display());
    println!("cwd: {}", prepared.cwd.display());
    println!("command: {}", prepared.plan.program.display());
    println!("args: {:?}", prepared.plan.display_args());
}
