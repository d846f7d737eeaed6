// src/exec/sinks.rs

//! Best-effort run logs.
//!
//! A run writes into every sink it managed to open. Nothing in here can fail
//! a run: open and write errors are reported through `tracing` and the sink
//! is dropped or skipped.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use tracing::{debug, warn};

use crate::types::RunEnding;

const BANNER_NAME: &str = "scoutwarden";

/// Content of the start banner written before any worker output.
#[derive(Debug, Clone)]
pub struct StartBanner<'a> {
    pub command: &'a Path,
    pub args: &'a [String],
    pub cwd: &'a Path,
    pub expected_result: &'a Path,
}

impl StartBanner<'_> {
    fn render(&self, now: &str) -> String {
        let args = self
            .args
            .iter()
            .map(|a| format!("{a:?}"))
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "\n===== {BANNER_NAME} run start {now} =====\n\
             command: {}\n\
             args: [{args}]\n\
             cwd: {}\n\
             expectedResultPath: {}\n",
            self.command.display(),
            self.cwd.display(),
            self.expected_result.display(),
        )
    }
}

#[derive(Debug)]
struct LogSink {
    path: PathBuf,
    file: File,
}

/// All log files of one supervised run.
#[derive(Debug, Default)]
pub struct LogSinks {
    sinks: Vec<LogSink>,
    closed: bool,
}

impl LogSinks {
    /// Open every path in append mode, skipping the ones that fail.
    pub fn open(paths: &[PathBuf]) -> Self {
        let sinks = paths
            .iter()
            .filter_map(|path| {
                match OpenOptions::new().create(true).append(true).open(path) {
                    Ok(file) => Some(LogSink {
                        path: path.clone(),
                        file,
                    }),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "could not open run log; continuing without it");
                        None
                    }
                }
            })
            .collect();
        Self {
            sinks,
            closed: false,
        }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn write_start_banner(&mut self, banner: &StartBanner<'_>) {
        let text = banner.render(&now());
        self.write_all(text.as_bytes());
    }

    /// Forward one chunk of worker output verbatim.
    pub fn write_chunk(&mut self, chunk: &[u8]) {
        self.write_all(chunk);
    }

    /// Write a lifecycle marker on its own line.
    pub fn marker(&mut self, text: &str) {
        self.write_all(format!("\n{text}\n").as_bytes());
    }

    /// Write the end banner and release the files. Later calls are no-ops.
    pub fn close(&mut self, ending: RunEnding) {
        if self.closed {
            return;
        }
        let text = format!("\n===== {BANNER_NAME} run end ({ending}) {} =====\n", now());
        self.write_all(text.as_bytes());
        for sink in &mut self.sinks {
            if let Err(e) = sink.file.flush() {
                debug!(path = %sink.path.display(), error = %e, "flushing run log failed");
            }
        }
        self.sinks.clear();
        self.closed = true;
    }

    fn write_all(&mut self, bytes: &[u8]) {
        if self.closed {
            return;
        }
        for sink in &mut self.sinks {
            if let Err(e) = sink.file.write_all(bytes) {
                debug!(path = %sink.path.display(), error = %e, "writing run log failed");
            }
        }
    }
}

/// Preface written into each log when a request is accepted, before the
/// worker is spawned, so an observer can start following the files early.
pub fn accepted_preface() -> String {
    format!("request accepted at {}\n", now())
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banners_bracket_output_and_preserve_preface() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("demo.latest.log");
        std::fs::write(&log, accepted_preface()).unwrap();

        let mut sinks = LogSinks::open(std::slice::from_ref(&log));
        assert_eq!(sinks.len(), 1);

        let args = vec!["code".to_string(), "task file /p/tasks/demo.md".to_string()];
        sinks.write_start_banner(&StartBanner {
            command: Path::new("ccr"),
            args: &args,
            cwd: Path::new("/p"),
            expected_result: Path::new("/p/result/demo.md"),
        });
        sinks.write_chunk(b"hello ");
        sinks.write_chunk(b"world");
        sinks.marker("[DETECTION] Result file created: /p/result/demo.md");
        sinks.close(RunEnding::ResultDetected);
        sinks.close(RunEnding::Error);
        sinks.write_chunk(b"late");

        let text = std::fs::read_to_string(&log).unwrap();
        assert!(text.starts_with("request accepted at "));
        assert!(text.contains("command: ccr\n"));
        assert!(text.contains("args: [\"code\",\"task file /p/tasks/demo.md\"]\n"));
        assert!(text.contains("cwd: /p\n"));
        assert!(text.contains("expectedResultPath: /p/result/demo.md\n"));

        let start = text.find("run start").unwrap();
        let output = text.find("hello world").unwrap();
        let end = text.find("run end (result detected, terminated)").unwrap();
        assert!(start < output && output < end);
        assert_eq!(text.matches("run end").count(), 1);
        assert!(!text.contains("late"));
    }

    #[test]
    fn unopenable_sink_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("a.log");
        let bad = dir.path().join("missing-dir").join("b.log");

        let mut sinks = LogSinks::open(&[bad, good.clone()]);
        assert_eq!(sinks.len(), 1);
        sinks.write_chunk(b"x");
        sinks.close(RunEnding::Ok);

        assert!(std::fs::read_to_string(good).unwrap().contains("run end (ok)"));
    }
}
