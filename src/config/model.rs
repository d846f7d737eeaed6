// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

/// Configuration as read from `Scoutwarden.toml`.
///
/// ```toml
/// [worker]
/// path = "C:\\Users\\me\\AppData\\Roaming\\npm\\ccr.cmd"
/// name = "ccr"
/// args = ["code", "--dangerously-skip-permissions"]
///
/// [timing]
/// timeout_ms = 600000
/// poll_interval_ms = 2000
/// grace_period_ms = 3000
/// kill_delay_ms = 2000
///
/// [layout]
/// tasks_dir = ".kilocode/sub-memory-bank/tasks"
/// default_extension = "md"
/// ```
///
/// Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub worker: WorkerSection,

    #[serde(default)]
    pub timing: TimingSection,

    #[serde(default)]
    pub layout: LayoutSection,
}

/// Validated configuration. Construct through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub worker: WorkerSection,
    pub timing: TimingSection,
    pub layout: LayoutSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        worker: WorkerSection,
        timing: TimingSection,
        layout: LayoutSection,
    ) -> Self {
        Self {
            worker,
            timing,
            layout,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        let raw = RawConfigFile::default();
        Self::new_unchecked(raw.worker, raw.timing, raw.layout)
    }
}

/// `[worker]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerSection {
    /// Explicit worker executable; skips discovery. May be wrapped in
    /// quotes and may point at a `.cmd` / `.bat` / `.ps1` / `.sh` script.
    #[serde(default)]
    pub path: Option<String>,

    /// Bare tool name used for discovery and as the last-resort command.
    #[serde(default = "default_worker_name")]
    pub name: String,

    /// Arguments placed before the `task file <path>` argument.
    #[serde(default = "default_worker_args")]
    pub args: Vec<String>,
}

fn default_worker_name() -> String {
    "ccr".to_string()
}

fn default_worker_args() -> Vec<String> {
    vec![
        "code".to_string(),
        "--dangerously-skip-permissions".to_string(),
    ]
}

impl Default for WorkerSection {
    fn default() -> Self {
        Self {
            path: None,
            name: default_worker_name(),
            args: default_worker_args(),
        }
    }
}

/// `[timing]` section, all values in milliseconds.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimingSection {
    /// Hard limit for the whole run.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// How often the result location is checked.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Delay between detecting the result and asking the worker to stop.
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    /// Delay between the polite terminate and the forced kill.
    #[serde(default = "default_kill_delay_ms")]
    pub kill_delay_ms: u64,
}

fn default_timeout_ms() -> u64 {
    10 * 60 * 1000
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_grace_period_ms() -> u64 {
    3000
}

fn default_kill_delay_ms() -> u64 {
    2000
}

impl Default for TimingSection {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            grace_period_ms: default_grace_period_ms(),
            kill_delay_ms: default_kill_delay_ms(),
        }
    }
}

impl TimingSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn kill_delay(&self) -> Duration {
        Duration::from_millis(self.kill_delay_ms)
    }
}

/// `[layout]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutSection {
    /// Conventional task-storage directory, relative to the working
    /// directory or the installation root.
    #[serde(default = "default_tasks_dir")]
    pub tasks_dir: String,

    /// Extension tried when a task name is given without one.
    #[serde(default = "default_extension")]
    pub default_extension: String,
}

fn default_tasks_dir() -> String {
    ".kilocode/sub-memory-bank/tasks".to_string()
}

fn default_extension() -> String {
    "md".to_string()
}

impl Default for LayoutSection {
    fn default() -> Self {
        Self {
            tasks_dir: default_tasks_dir(),
            default_extension: default_extension(),
        }
    }
}

/// Values that take precedence over the file: environment variables and
/// CLI flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub worker_path: Option<String>,
    pub timeout_ms: Option<u64>,
}
