// src/paths/derive.rs

//! Pure mapping from a task file to its result and log locations.
//!
//! ```text
//! <root>/.kilocode/sub-memory-bank/tasks/demo.md
//!   result  -> <root>/.kilocode/sub-memory-bank/result/demo.md
//!   latest  -> <root>/.kilocode/sub-memory-bank/logs/demo.latest.log
//!   per-run -> <root>/.kilocode/sub-memory-bank/logs/demo.2025-01-02T03-04-05-678Z.log
//! ```
//!
//! Only the last `tasks` segment of the *directory* chain is substituted.
//! Nothing here touches the filesystem.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};

use crate::errors::{Result, WardenError};

pub const TASKS_ANCHOR: &str = "tasks";
pub const RESULT_ANCHOR: &str = "result";
pub const LOGS_ANCHOR: &str = "logs";

const LATEST_LOG_SUFFIX: &str = "latest.log";

/// The three locations derived from one task reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedLocations {
    pub result: PathBuf,
    pub latest_log: PathBuf,
    pub timestamped_log: PathBuf,
}

impl DerivedLocations {
    pub fn for_task(task: &Path, at: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            result: result_path_for(task)?,
            latest_log: latest_log_path_for(task)?,
            timestamped_log: log_path_for_at(task, at)?,
        })
    }
}

pub fn result_path_for(task: &Path) -> Result<PathBuf> {
    let dir = substitute_anchor(task, RESULT_ANCHOR)?;
    Ok(dir.join(file_name(task)))
}

/// Per-run log path stamped with the current UTC time.
pub fn log_path_for(task: &Path) -> Result<PathBuf> {
    log_path_for_at(task, Utc::now())
}

pub fn log_path_for_at(task: &Path, at: DateTime<Utc>) -> Result<PathBuf> {
    let dir = substitute_anchor(task, LOGS_ANCHOR)?;
    Ok(dir.join(format!("{}.{}.log", file_stem(task), file_timestamp(at))))
}

pub fn latest_log_path_for(task: &Path) -> Result<PathBuf> {
    let dir = substitute_anchor(task, LOGS_ANCHOR)?;
    Ok(dir.join(format!("{}.{}", file_stem(task), LATEST_LOG_SUFFIX)))
}

/// Working-directory root for the worker: two levels above the anchor's
/// parent (`<root>/.kilocode/sub-memory-bank/tasks` -> `<root>`).
///
/// `None` when the anchor is missing or sits too close to the top of the
/// path; callers fall back to their own working directory.
pub fn project_root_for(task: &Path) -> Option<PathBuf> {
    let components = dir_components(task);
    let idx = anchor_index(&components)?;
    let keep = idx.checked_sub(2)?;
    if keep == 0 {
        return None;
    }
    Some(components[..keep].iter().collect())
}

/// ISO-8601 UTC with millisecond precision, made filename-safe by
/// replacing `:` and `.` with `-`.
pub fn file_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

fn substitute_anchor(task: &Path, replacement: &str) -> Result<PathBuf> {
    let mut components = dir_components(task);
    let idx = anchor_index(&components)
        .ok_or_else(|| WardenError::InvalidTaskLocation(task.to_path_buf()))?;
    components[idx] = Component::Normal(OsStr::new(replacement));
    Ok(components.iter().collect())
}

fn dir_components(task: &Path) -> Vec<Component<'_>> {
    task.parent()
        .map(|dir| dir.components().collect())
        .unwrap_or_default()
}

/// Last `tasks` segment of the directory chain. A `..` anywhere after it
/// walks back out, so such a chain has no usable anchor.
fn anchor_index(components: &[Component<'_>]) -> Option<usize> {
    let idx = components
        .iter()
        .rposition(|c| matches!(c, Component::Normal(name) if *name == TASKS_ANCHOR))?;
    let escapes = components[idx + 1..]
        .iter()
        .any(|c| matches!(c, Component::ParentDir));
    (!escapes).then_some(idx)
}

fn file_name(task: &Path) -> &OsStr {
    task.file_name().unwrap_or_default()
}

fn file_stem(task: &Path) -> String {
    task.file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned()
}
