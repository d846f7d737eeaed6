// src/exec/invocation.rs

//! Working out *how* to launch the worker on this host.
//!
//! Everything platform-specific about invoking the worker lives here; the
//! supervisor only ever sees an [`InvocationPlan`] and spawns it without a
//! shell, so task paths never go through shell interpolation.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::config::loader::WORKER_PATH_ENV;
use crate::fs::FileSystem;
use crate::types::Platform;

const DEFAULT_PATHEXT: &str = ".EXE;.CMD;.BAT;.COM;.PS1";

const POWERSHELL_FLAGS: &[&str] = &["-NoProfile", "-ExecutionPolicy", "Bypass", "-File"];
const CMD_FLAGS: &[&str] = &["/c"];
const SH_FLAGS: &[&str] = &[];

/// Resolved command line for one run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationPlan {
    pub program: PathBuf,
    /// Interpreter indirection (`/c <script>`, `-File <script>`, ...).
    pub prefix_args: Vec<OsString>,
    /// Worker arguments proper.
    pub command_args: Vec<OsString>,
}

impl InvocationPlan {
    pub fn direct(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            prefix_args: Vec::new(),
            command_args: Vec::new(),
        }
    }

    /// Append `worker_args` followed by the single combined
    /// `task file <abs path>` argument.
    pub fn for_task(mut self, worker_args: &[String], task: &Path) -> Self {
        self.command_args
            .extend(worker_args.iter().map(OsString::from));
        let mut task_arg = OsString::from("task file ");
        task_arg.push(task.as_os_str());
        self.command_args.push(task_arg);
        self
    }

    /// Full argument vector handed to the OS: prefix then command args.
    pub fn args(&self) -> impl Iterator<Item = &OsString> {
        self.prefix_args.iter().chain(self.command_args.iter())
    }

    pub fn display_args(&self) -> Vec<String> {
        self.args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

/// Environment inputs to resolution, captured once so resolution is
/// deterministic and testable on any host.
#[derive(Debug, Clone, Default)]
pub struct ResolverEnv {
    pub override_path: Option<String>,
    /// `%APPDATA%` (npm global installs live under `<APPDATA>\npm`).
    pub app_data: Option<PathBuf>,
    pub search_path: Vec<PathBuf>,
    /// Raw `PATHEXT`.
    pub path_ext: Option<String>,
}

impl ResolverEnv {
    /// Capture the current process environment, with `override_path`
    /// (already merged from config/env/CLI) taking the place of `CCR_PATH`.
    pub fn from_process(override_path: Option<String>) -> Self {
        Self {
            override_path,
            app_data: std::env::var_os("APPDATA").map(PathBuf::from),
            search_path: std::env::var_os("PATH")
                .map(|p| std::env::split_paths(&p).collect())
                .unwrap_or_default(),
            path_ext: std::env::var("PATHEXT").ok(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InvocationResolver {
    tool: String,
    platform: Platform,
    env: ResolverEnv,
    fs: Arc<dyn FileSystem>,
}

impl InvocationResolver {
    pub fn new(
        tool: impl Into<String>,
        platform: Platform,
        env: ResolverEnv,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            tool: tool.into(),
            platform,
            env,
            fs,
        }
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Produce a plan; never fails. A bare tool name is the last resort,
    /// leaving the real error (with [`spawn_hint`]) to spawn time.
    pub fn resolve(&self) -> InvocationPlan {
        if let Some(path) = self.explicit_override() {
            debug!(path = %path, "using explicit worker override");
            return self.wrap_script(PathBuf::from(path));
        }

        if self.platform == Platform::Windows {
            if let Some(found) = self.search_candidates().into_iter().find(|c| self.fs.exists(c)) {
                debug!(path = %found.display(), "worker found on search path");
                return self.wrap_script(found);
            }
        }

        debug!(tool = %self.tool, "falling back to bare worker name");
        InvocationPlan::direct(&self.tool)
    }

    fn explicit_override(&self) -> Option<String> {
        let raw = self.env.override_path.as_deref()?.trim();
        let unquoted = strip_wrapping_quotes(raw).trim();
        (!unquoted.is_empty()).then(|| unquoted.to_string())
    }

    /// Well-known install dirs first, then every `PATH` dir x `PATHEXT`.
    fn search_candidates(&self) -> Vec<PathBuf> {
        let mut out = Vec::new();
        if let Some(app_data) = &self.env.app_data {
            let npm = app_data.join("npm");
            for ext in [".cmd", ".exe", ".ps1"] {
                out.push(npm.join(format!("{}{ext}", self.tool)));
            }
        }

        let exts: Vec<String> = self
            .env
            .path_ext
            .as_deref()
            .unwrap_or(DEFAULT_PATHEXT)
            .split(';')
            .filter(|e| !e.is_empty())
            .map(str::to_lowercase)
            .collect();

        for dir in self.env.search_path.iter().filter(|d| !d.as_os_str().is_empty()) {
            for ext in &exts {
                out.push(dir.join(format!("{}{ext}", self.tool)));
            }
        }
        out
    }

    fn wrap_script(&self, script: PathBuf) -> InvocationPlan {
        let ext = script
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let (program, flags) = match (self.platform, ext.as_str()) {
            (Platform::Windows, "ps1") => ("powershell.exe", POWERSHELL_FLAGS),
            (Platform::Windows, "cmd" | "bat") => ("cmd.exe", CMD_FLAGS),
            (Platform::Unix, "sh") => ("sh", SH_FLAGS),
            _ => return InvocationPlan::direct(script),
        };

        let mut prefix_args: Vec<OsString> = flags.iter().map(OsString::from).collect();
        prefix_args.push(script.into_os_string());
        InvocationPlan {
            program: PathBuf::from(program),
            prefix_args,
            command_args: Vec::new(),
        }
    }
}

/// Strip one pair of matching `"` or `'` around `s`.
pub fn strip_wrapping_quotes(s: &str) -> &str {
    for q in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

/// Remediation text attached to spawn failures.
pub fn spawn_hint(platform: Platform, tool: &str) -> String {
    match platform {
        Platform::Windows => format!(
            "Set {WORKER_PATH_ENV} to the full path of {tool}.cmd or ensure {tool} is on PATH."
        ),
        Platform::Unix => format!(
            "Ensure '{tool}' is installed and available on PATH, or set {WORKER_PATH_ENV}."
        ),
    }
}
