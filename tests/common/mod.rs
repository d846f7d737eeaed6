#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use scoutwarden::config::ConfigFile;
use scoutwarden::exec::{InvocationResolver, ResolverEnv, WorkerRunner};
use scoutwarden::fs::{FileSystem, RealFileSystem};
use scoutwarden::invoke::TaskInvoker;
use scoutwarden::types::Platform;
use scoutwarden_test_utils::builders::TaskTree;

pub use scoutwarden_test_utils::{init_tracing, with_timeout};

pub fn real_fs() -> Arc<dyn FileSystem> {
    Arc::new(RealFileSystem)
}

/// Invoker running from the tree's project root with the real supervisor.
pub fn real_invoker(cfg: &ConfigFile, tree: &TaskTree) -> TaskInvoker {
    TaskInvoker::from_config(cfg, real_fs(), tree.root().to_path_buf(), Platform::Unix)
}

/// Invoker running from the tree's project root with a caller-supplied runner.
pub fn invoker_with_runner(
    cfg: &ConfigFile,
    tree: &TaskTree,
    runner: Arc<dyn WorkerRunner>,
) -> TaskInvoker {
    invoker_from(cfg, tree.root(), runner)
}

/// As [`invoker_with_runner`], started from an arbitrary working directory.
pub fn invoker_from(cfg: &ConfigFile, cwd: &Path, runner: Arc<dyn WorkerRunner>) -> TaskInvoker {
    let fs = real_fs();
    let invocation = InvocationResolver::new(
        cfg.worker.name.clone(),
        Platform::Unix,
        ResolverEnv::default(),
        fs.clone(),
    );
    TaskInvoker::new(cfg, fs, cwd.to_path_buf(), invocation, runner)
}
