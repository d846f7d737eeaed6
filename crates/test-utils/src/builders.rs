#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use scoutwarden::config::{ConfigFile, RawConfigFile};
use tempfile::TempDir;

/// Layout the worker's front end uses under a project root.
pub const MEMORY_BANK: &str = ".kilocode/sub-memory-bank";

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    /// Timings small enough for real-process tests: 50ms polling, 100ms
    /// grace and kill delay, 5s hard timeout.
    pub fn fast() -> Self {
        Self::new()
            .with_timeout_ms(5_000)
            .with_poll_interval_ms(50)
            .with_grace_period_ms(100)
            .with_kill_delay_ms(100)
    }

    pub fn with_worker_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config.worker.path = Some(path.as_ref().display().to_string());
        self
    }

    pub fn with_worker_name(mut self, name: &str) -> Self {
        self.config.worker.name = name.to_string();
        self
    }

    pub fn with_worker_args(mut self, args: &[&str]) -> Self {
        self.config.worker.args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.config.timing.timeout_ms = ms;
        self
    }

    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.timing.poll_interval_ms = ms;
        self
    }

    pub fn with_grace_period_ms(mut self, ms: u64) -> Self {
        self.config.timing.grace_period_ms = ms;
        self
    }

    pub fn with_kill_delay_ms(mut self, ms: u64) -> Self {
        self.config.timing.kill_delay_ms = ms;
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A throwaway project root with the usual `tasks` / `result` / `logs`
/// layout underneath it.
pub struct TaskTree {
    dir: TempDir,
}

impl TaskTree {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp project root");
        fs::create_dir_all(dir.path().join(MEMORY_BANK).join("tasks"))
            .expect("create tasks dir");
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn tasks_dir(&self) -> PathBuf {
        self.root().join(MEMORY_BANK).join("tasks")
    }

    pub fn result_dir(&self) -> PathBuf {
        self.root().join(MEMORY_BANK).join("result")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root().join(MEMORY_BANK).join("logs")
    }

    /// Write `tasks/<name>.md` and return its absolute path.
    pub fn add_task(&self, name: &str, body: &str) -> PathBuf {
        let path = self.tasks_dir().join(format!("{name}.md"));
        fs::write(&path, body).expect("write task file");
        path
    }

    /// Where the result for `tasks/<name>.md` is expected.
    pub fn result_path(&self, name: &str) -> PathBuf {
        self.result_dir().join(format!("{name}.md"))
    }

    pub fn latest_log_path(&self, name: &str) -> PathBuf {
        self.logs_dir().join(format!("{name}.latest.log"))
    }

    /// Pre-create a result file, as if left over from an earlier run.
    pub fn add_stale_result(&self, name: &str, body: &str) -> PathBuf {
        let path = self.result_path(name);
        fs::create_dir_all(self.result_dir()).expect("create result dir");
        fs::write(&path, body).expect("write stale result");
        path
    }
}

impl Default for TaskTree {
    fn default() -> Self {
        Self::new()
    }
}
