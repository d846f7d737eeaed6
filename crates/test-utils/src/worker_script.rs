//! Shell scripts standing in for the worker CLI.
//!
//! Each fixture is written as `<name>.sh` so the invocation resolver runs it
//! through `sh`. The worker is called as
//! `sh <script> <worker args...> "task file <abs path>"`.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Directory holding generated worker scripts.
pub struct WorkerScripts {
    dir: TempDir,
}

impl WorkerScripts {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create script dir"),
        }
    }

    /// Write `body` as `<name>.sh` and return its path.
    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.dir.path().join(format!("{name}.sh"));
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write worker script");
        path
    }

    /// Writes `result` with `content`, prints a line, then idles until
    /// terminated. The usual non-self-terminating worker.
    pub fn writes_result_and_lingers(&self, result: &Path, content: &str) -> PathBuf {
        self.script(
            "lingers",
            &format!(
                "echo working\nmkdir -p {dir}\nprintf '%s' {content} > {result}\nexec sleep 30",
                dir = sh_quote(&result.parent().unwrap_or(Path::new("/")).display().to_string()),
                content = sh_quote(content),
                result = sh_quote(&result.display().to_string()),
            ),
        )
    }

    /// Writes `result`, waits `pause_secs`, prints `late_line`, then idles
    /// until terminated. Output that follows the result file.
    pub fn writes_result_then_talks(
        &self,
        result: &Path,
        pause_secs: u32,
        late_line: &str,
    ) -> PathBuf {
        self.script(
            "talks_late",
            &format!(
                "mkdir -p {dir}\nprintf done > {result}\nsleep {pause_secs}\nprintf '%s\\n' {line}\nexec sleep 30",
                dir = sh_quote(&result.parent().unwrap_or(Path::new("/")).display().to_string()),
                result = sh_quote(&result.display().to_string()),
                line = sh_quote(late_line),
            ),
        )
    }

    /// Like [`writes_result_and_lingers`](Self::writes_result_and_lingers)
    /// but ignores `SIGTERM`, so only the forced kill stops it.
    pub fn writes_result_and_ignores_term(&self, result: &Path, content: &str) -> PathBuf {
        self.script(
            "stubborn",
            &format!(
                "trap '' TERM\nmkdir -p {dir}\nprintf '%s' {content} > {result}\nwhile :; do sleep 1; done",
                dir = sh_quote(&result.parent().unwrap_or(Path::new("/")).display().to_string()),
                content = sh_quote(content),
                result = sh_quote(&result.display().to_string()),
            ),
        )
    }

    /// Prints `stdout`, writes `stderr`, exits with `code`.
    pub fn exits(&self, stdout: &str, stderr: &str, code: i32) -> PathBuf {
        self.script(
            "exits",
            &format!(
                "printf '%s' {out}\nprintf '%s' {err} >&2\nexit {code}",
                out = sh_quote(stdout),
                err = sh_quote(stderr),
            ),
        )
    }

    /// Prints each argument on its own line, then its physical working
    /// directory, then exits 0.
    pub fn echoes_args_and_cwd(&self) -> PathBuf {
        self.script(
            "echo_args",
            "for a in \"$@\"; do printf '%s\\n' \"$a\"; done\npwd -P",
        )
    }

    /// Never writes anything and never exits on its own.
    pub fn hangs(&self) -> PathBuf {
        self.script("hangs", "exec sleep 30")
    }
}

impl Default for WorkerScripts {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-quote `s` for `sh`.
pub fn sh_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}
