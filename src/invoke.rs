// src/invoke.rs

//! Task invocation facade: one call per task, from raw task reference to the
//! three artifact paths.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::ConfigFile;
use crate::engine::{RunRequest, Supervisor, SupervisorOptions};
use crate::errors::{Result, WardenError};
use crate::exec::invocation::{InvocationPlan, InvocationResolver, ResolverEnv};
use crate::exec::sinks::accepted_preface;
use crate::exec::{RealWorkerRunner, WorkerRunner};
use crate::fs::FileSystem;
use crate::paths::derive::project_root_for;
use crate::paths::resolve::install_root;
use crate::paths::{DerivedLocations, TaskResolver};
use crate::types::Platform;

/// Where a finished run left its artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationReport {
    pub result_path: PathBuf,
    pub latest_log_path: PathBuf,
    pub timestamped_log_path: PathBuf,
}

impl fmt::Display for InvocationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.result_path.display())?;
        writeln!(f, "log: {}", self.latest_log_path.display())?;
        write!(f, "log_ts: {}", self.timestamped_log_path.display())
    }
}

/// Everything decided about a run before the worker is started.
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub task: PathBuf,
    pub locations: DerivedLocations,
    pub plan: InvocationPlan,
    pub cwd: PathBuf,
}

impl PreparedRun {
    fn into_request(self) -> (RunRequest, DerivedLocations) {
        let request = RunRequest {
            plan: self.plan,
            cwd: self.cwd,
            result_path: self.locations.result.clone(),
            log_paths: vec![
                self.locations.latest_log.clone(),
                self.locations.timestamped_log.clone(),
            ],
        };
        (request, self.locations)
    }
}

pub struct TaskInvoker {
    fs: Arc<dyn FileSystem>,
    resolver: TaskResolver,
    invocation: InvocationResolver,
    worker_args: Vec<String>,
    cwd: PathBuf,
    runner: Arc<dyn WorkerRunner>,
}

impl fmt::Debug for TaskInvoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskInvoker")
            .field("resolver", &self.resolver)
            .field("invocation", &self.invocation)
            .field("worker_args", &self.worker_args)
            .field("cwd", &self.cwd)
            .finish_non_exhaustive()
    }
}

impl TaskInvoker {
    pub fn new(
        cfg: &ConfigFile,
        fs: Arc<dyn FileSystem>,
        cwd: PathBuf,
        invocation: InvocationResolver,
        runner: Arc<dyn WorkerRunner>,
    ) -> Self {
        let resolver = TaskResolver::new(
            fs.clone(),
            cwd.clone(),
            cfg.layout.tasks_dir.clone(),
            cfg.layout.default_extension.clone(),
        );
        Self {
            fs,
            resolver,
            invocation,
            worker_args: cfg.worker.args.clone(),
            cwd,
            runner,
        }
    }

    /// Production wiring: real process environment, real supervisor, and the
    /// installation root as an extra search base for task references.
    pub fn from_config(
        cfg: &ConfigFile,
        fs: Arc<dyn FileSystem>,
        cwd: PathBuf,
        platform: Platform,
    ) -> Self {
        let invocation = InvocationResolver::new(
            cfg.worker.name.clone(),
            platform,
            ResolverEnv::from_process(cfg.worker.path.clone()),
            fs.clone(),
        );
        let supervisor = Supervisor::new(SupervisorOptions::from_config(cfg, platform), fs.clone());
        let runner: Arc<dyn WorkerRunner> = Arc::new(RealWorkerRunner::new(supervisor));

        let mut invoker = Self::new(cfg, fs, cwd, invocation, runner);
        invoker.resolver = invoker.resolver.with_install_root(install_root());
        invoker
    }

    pub fn tool(&self) -> &str {
        self.invocation.tool()
    }

    /// Resolve the task and work out its locations, command line and working
    /// directory. Touches nothing on disk.
    pub fn prepare(&self, input: &str, at: DateTime<Utc>) -> Result<PreparedRun> {
        let task = self.resolver.resolve(input)?;
        let locations = DerivedLocations::for_task(&task, at)?;
        let plan = self
            .invocation
            .resolve()
            .for_task(&self.worker_args, &task);
        let cwd = project_root_for(&task).unwrap_or_else(|| self.cwd.clone());

        Ok(PreparedRun {
            task,
            locations,
            plan,
            cwd,
        })
    }

    /// Run the worker for `input` and return where its artifacts ended up.
    pub async fn invoke(&self, input: &str) -> Result<InvocationReport> {
        self.invoke_at(input, Utc::now()).await
    }

    /// As [`invoke`](Self::invoke), with the timestamped log named after `at`.
    pub async fn invoke_at(&self, input: &str, at: DateTime<Utc>) -> Result<InvocationReport> {
        let prepared = self.prepare(input, at)?;
        info!(
            task = %prepared.task.display(),
            result = %prepared.locations.result.display(),
            cwd = %prepared.cwd.display(),
            "task accepted"
        );

        self.ensure_parent(&prepared.locations.result)?;
        self.ensure_parent(&prepared.locations.latest_log)?;
        self.prime_log(&prepared.locations.latest_log);
        self.prime_log(&prepared.locations.timestamped_log);

        let (request, locations) = prepared.into_request();
        let output = self.runner.run(request).await?;

        if self.fs.is_file(&locations.result) {
            debug!(result = %locations.result.display(), "worker wrote the result file");
        } else {
            let stdout = output.stdout.trim();
            if stdout.is_empty() {
                return Err(WardenError::NoResultProduced(self.tool().to_string()));
            }
            info!(
                result = %locations.result.display(),
                bytes = stdout.len(),
                "no result file; saving worker stdout instead"
            );
            self.fs.write(&locations.result, stdout.as_bytes())?;
        }

        Ok(InvocationReport {
            result_path: locations.result,
            latest_log_path: locations.latest_log,
            timestamped_log_path: locations.timestamped_log,
        })
    }

    fn ensure_parent(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            self.fs.create_dir_all(dir)?;
        }
        Ok(())
    }

    fn prime_log(&self, path: &Path) {
        if let Err(e) = self.fs.write(path, accepted_preface().as_bytes()) {
            warn!(path = %path.display(), error = %e, "could not prime run log");
        }
    }
}
