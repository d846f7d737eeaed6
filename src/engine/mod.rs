// src/engine/mod.rs

//! Supervision engine for one worker run.
//!
//! The worker never exits on its own once it has done its job, so a run is
//! driven by four independent signals: its output/exit, a hard timeout, a
//! poll for the result file, and the grace/force-kill timers that follow
//! detection.
//!
//! The pure state machine lives in [`core`]; the async/IO shell that owns
//! the process, the timers and the log sinks is implemented in [`runtime`].

use std::time::Duration;

use crate::types::RunEnding;

/// Events flowing into the core from the IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// The worker process was started.
    Spawned,
    /// The OS refused to start the worker.
    SpawnFailed { message: String },
    /// The poll timer fired; `result_exists` is the outcome of the check.
    PollTick { result_exists: bool },
    /// The hard timeout elapsed.
    HardTimeout,
    /// The post-detection grace period elapsed.
    GraceElapsed,
    /// The delay between polite terminate and forced kill elapsed.
    KillDelayElapsed,
    /// The worker process exited and its output has been drained.
    Exited { code: i32 },
    /// The shell has cancelled every timer and closed the sinks.
    Finalized,
}

/// Lifecycle of one supervised run.
///
/// ```text
/// Starting -> Running -> ResultDetected | TimedOut | ExitedNaturally -> Finalizing -> Done
/// Starting -> Errored -> Finalizing -> Done
/// ```
///
/// `ResultDetected` and `TimedOut` last until the worker has exited;
/// `Errored` and `ExitedNaturally` move on to `Finalizing` in the same step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Starting,
    Running,
    ResultDetected { terminate_sent: bool },
    TimedOut,
    /// The worker could not be started.
    Errored,
    ExitedNaturally { code: i32 },
    /// The outcome has been handed to the shell, which is tearing the run down.
    Finalizing,
    Done,
}

/// What the run amounted to. Exactly one is produced per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The result file appeared; the worker's own exit status is ignored.
    ResultDetected,
    /// The worker exited before detection or timeout.
    Exited { code: i32 },
    TimedOut,
    SpawnFailed { message: String },
}

impl RunOutcome {
    pub fn ending(&self) -> RunEnding {
        match self {
            RunOutcome::ResultDetected => RunEnding::ResultDetected,
            RunOutcome::Exited { code: 0 } => RunEnding::Ok,
            RunOutcome::Exited { code } => RunEnding::Exit(*code),
            RunOutcome::TimedOut => RunEnding::Timeout,
            RunOutcome::SpawnFailed { .. } => RunEnding::Error,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            RunOutcome::ResultDetected | RunOutcome::Exited { code: 0 }
        )
    }
}

/// Timing knobs for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTimings {
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub grace_period: Duration,
    pub kill_delay: Duration,
}

impl Default for RunTimings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10 * 60),
            poll_interval: Duration::from_secs(2),
            grace_period: Duration::from_secs(3),
            kill_delay: Duration::from_secs(2),
        }
    }
}

pub mod core;
pub mod runtime;

pub use core::{CoreCommand, CoreStep, SupervisorCore};
pub use runtime::{RunOutput, RunRequest, Supervisor, SupervisorOptions};
