// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Every failure a run can end in maps to exactly one variant here; the
//! front end only ever sees the rendered message.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WardenError {
    #[error("taskPath must be under a 'tasks' directory (.kilocode/sub-memory-bank/tasks/...): {}", .0.display())]
    InvalidTaskLocation(PathBuf),

    #[error("taskPath is empty")]
    EmptyTaskPath,

    #[error("taskPath not found. Given: {0}")]
    TaskNotFound(String),

    #[error("Failed to spawn {command}: {message}. {hint}")]
    SpawnFailure {
        command: String,
        message: String,
        hint: String,
    },

    #[error("{tool} timed out after {timeout_ms}ms")]
    Timeout { tool: String, timeout_ms: u128 },

    /// Carries captured stderr when the worker wrote any; otherwise the
    /// exit code is reported.
    #[error("{}", render_exit_failure(.tool, .code, .stderr))]
    WorkerExitFailure {
        tool: String,
        code: i32,
        stderr: String,
    },

    #[error("{0} did not produce a result file or any stdout to save")]
    NoResultProduced(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn render_exit_failure(tool: &str, code: &i32, stderr: &str) -> String {
    if stderr.is_empty() {
        format!("{tool} exited with code {code}")
    } else {
        stderr.to_string()
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, WardenError>;
