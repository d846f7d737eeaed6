// src/exec/backend.rs

//! Pluggable worker runner.
//!
//! The invocation facade talks to a `WorkerRunner` instead of a concrete
//! [`Supervisor`]. Production wires in [`RealWorkerRunner`]; tests can hand
//! in a runner that writes (or withholds) the result file and returns canned
//! output without spawning anything.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::engine::{RunOutput, RunRequest, Supervisor};
use crate::errors::Result;

/// Trait abstracting how one worker run is carried out.
pub trait WorkerRunner: Send + Sync {
    /// Run the worker described by `request` to completion.
    ///
    /// Success means either the result file was detected or the worker exited
    /// with code 0; the captured output is returned in both cases.
    fn run(
        &self,
        request: RunRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RunOutput>> + Send + '_>>;
}

/// Runner that spawns and supervises a real worker process.
#[derive(Debug, Clone)]
pub struct RealWorkerRunner {
    supervisor: Arc<Supervisor>,
}

impl RealWorkerRunner {
    pub fn new(supervisor: Supervisor) -> Self {
        Self {
            supervisor: Arc::new(supervisor),
        }
    }
}

impl WorkerRunner for RealWorkerRunner {
    fn run(
        &self,
        request: RunRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RunOutput>> + Send + '_>> {
        Box::pin(self.supervisor.run(request))
    }
}
