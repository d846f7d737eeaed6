// src/engine/core.rs

//! Pure supervisor state machine.
//!
//! [`SupervisorCore::step`] is the single place where a run changes state.
//! It consumes [`RunEvent`]s and returns the commands the IO shell must carry
//! out. The first terminal event (result detected, timeout, natural exit,
//! spawn failure) fixes the outcome; everything that arrives afterwards is
//! either part of that path's own shutdown sequence or ignored.
//!
//! No Tokio, processes, or filesystem in here.

use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::engine::{RunEvent, RunOutcome, RunState, RunTimings};

/// Instruction for the IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    ArmHardTimeout(Duration),
    StartPolling(Duration),
    StopPolling,
    CancelHardTimeout,
    ArmGrace(Duration),
    ArmForceKill(Duration),
    /// Ask the worker to stop (`SIGTERM` where available).
    Terminate,
    ForceKill,
    /// Lifecycle line for the run logs.
    Marker(String),
    /// Cancel every timer, close the sinks and yield this outcome.
    Finish(RunOutcome),
}

/// Result of handling one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// True once the run is `Done`; the shell stops its loop.
    pub finished: bool,
}

#[derive(Debug)]
pub struct SupervisorCore {
    state: RunState,
    timings: RunTimings,
    tool: String,
    result_path: PathBuf,
}

impl SupervisorCore {
    pub fn new(tool: impl Into<String>, result_path: PathBuf, timings: RunTimings) -> Self {
        Self {
            state: RunState::Starting,
            timings,
            tool: tool.into(),
            result_path,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn step(&mut self, event: RunEvent) -> CoreStep {
        let commands = match (self.state, event) {
            (RunState::Starting, RunEvent::Spawned) => {
                self.transition(RunState::Running);
                vec![
                    CoreCommand::ArmHardTimeout(self.timings.timeout),
                    CoreCommand::StartPolling(self.timings.poll_interval),
                ]
            }
            (RunState::Starting, RunEvent::SpawnFailed { message }) => {
                self.transition(RunState::Errored);
                vec![
                    CoreCommand::Marker(format!("spawn error: {message}")),
                    self.finish(RunOutcome::SpawnFailed { message }),
                ]
            }

            (RunState::Running, RunEvent::PollTick { result_exists: true }) => {
                self.transition(RunState::ResultDetected {
                    terminate_sent: false,
                });
                vec![
                    CoreCommand::StopPolling,
                    CoreCommand::CancelHardTimeout,
                    CoreCommand::Marker(format!(
                        "[DETECTION] Result file created: {}",
                        self.result_path.display()
                    )),
                    CoreCommand::ArmGrace(self.timings.grace_period),
                ]
            }
            (RunState::Running, RunEvent::HardTimeout) => {
                self.transition(RunState::TimedOut);
                vec![
                    CoreCommand::StopPolling,
                    CoreCommand::Marker(format!(
                        "ERROR: {} timed out after {}ms",
                        self.tool,
                        self.timings.timeout.as_millis()
                    )),
                    CoreCommand::ForceKill,
                ]
            }
            (RunState::Running, RunEvent::Exited { code }) => {
                self.transition(RunState::ExitedNaturally { code });
                vec![self.finish(RunOutcome::Exited { code })]
            }

            (
                RunState::ResultDetected {
                    terminate_sent: false,
                },
                RunEvent::GraceElapsed,
            ) => {
                self.transition(RunState::ResultDetected {
                    terminate_sent: true,
                });
                vec![
                    CoreCommand::Marker(format!(
                        "[TERMINATION] Gracefully terminating {} after grace period",
                        self.tool
                    )),
                    CoreCommand::Terminate,
                    CoreCommand::ArmForceKill(self.timings.kill_delay),
                ]
            }
            (
                RunState::ResultDetected {
                    terminate_sent: true,
                },
                RunEvent::KillDelayElapsed,
            ) => vec![CoreCommand::ForceKill],
            (RunState::ResultDetected { .. }, RunEvent::Exited { .. }) => {
                vec![self.finish(RunOutcome::ResultDetected)]
            }

            (RunState::TimedOut, RunEvent::Exited { .. }) => {
                vec![self.finish(RunOutcome::TimedOut)]
            }

            (RunState::Finalizing, RunEvent::Finalized) => {
                self.transition(RunState::Done);
                Vec::new()
            }

            (state, event) => {
                debug!(?state, ?event, "event ignored in current state");
                Vec::new()
            }
        };

        CoreStep {
            commands,
            finished: self.state == RunState::Done,
        }
    }

    fn transition(&mut self, to: RunState) {
        debug!(from = ?self.state, to = ?to, "run state changed");
        self.state = to;
    }

    /// Leave a terminal state. The shell answers `Finish` with `Finalized`.
    fn finish(&mut self, outcome: RunOutcome) -> CoreCommand {
        self.transition(RunState::Finalizing);
        CoreCommand::Finish(outcome)
    }
}
