use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use scoutwarden::engine::{RunOutput, RunRequest};
use scoutwarden::errors::{Result, WardenError};
use scoutwarden::exec::WorkerRunner;
use scoutwarden::fs::FileSystem;

/// What the fake worker does when run.
#[derive(Debug, Clone)]
pub enum FakeBehaviour {
    /// Write the result file, print nothing.
    WritesResult(String),
    /// Leave the result file alone and print this on stdout.
    Prints(String),
    /// Fail the way a worker exiting non-zero does.
    ExitsWith { code: i32, stderr: String },
    /// Fail the way a hard timeout does.
    TimesOut { timeout_ms: u128 },
}

/// A fake runner that:
/// - records every request it was handed
/// - acts out a fixed [`FakeBehaviour`] without spawning anything.
#[derive(Clone)]
pub struct FakeRunner {
    fs: Arc<dyn FileSystem>,
    behaviour: FakeBehaviour,
    requests: Arc<Mutex<Vec<RunRequest>>>,
}

impl FakeRunner {
    pub fn new(fs: Arc<dyn FileSystem>, behaviour: FakeBehaviour) -> Self {
        Self {
            fs,
            behaviour,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn requests(&self) -> Vec<RunRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl WorkerRunner for FakeRunner {
    fn run(
        &self,
        request: RunRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RunOutput>> + Send + '_>> {
        self.requests.lock().unwrap().push(request.clone());

        Box::pin(async move {
            match &self.behaviour {
                FakeBehaviour::WritesResult(body) => {
                    self.fs.write(&request.result_path, body.as_bytes())?;
                    Ok(RunOutput::default())
                }
                FakeBehaviour::Prints(stdout) => Ok(RunOutput {
                    stdout: stdout.clone(),
                    stderr: String::new(),
                }),
                FakeBehaviour::ExitsWith { code, stderr } => Err(WardenError::WorkerExitFailure {
                    tool: "ccr".into(),
                    code: *code,
                    stderr: stderr.clone(),
                }),
                FakeBehaviour::TimesOut { timeout_ms } => Err(WardenError::Timeout {
                    tool: "ccr".into(),
                    timeout_ms: *timeout_ms,
                }),
            }
        })
    }
}
