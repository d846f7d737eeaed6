// src/engine/runtime.rs

//! Async IO shell around [`SupervisorCore`].
//!
//! One run is one loop on the calling task: a single `tokio::select!` reads
//! stdout and stderr, waits for the child, and waits on whichever timers
//! are armed. Output chunks are handled inline (forwarded in arrival order);
//! everything else becomes a [`RunEvent`] for the core, whose commands are
//! then executed here.

use std::future::pending;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::time::{interval_at, sleep_until, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::ConfigFile;
use crate::engine::core::{CoreCommand, SupervisorCore};
use crate::engine::{RunEvent, RunOutcome, RunTimings};
use crate::errors::{Result, WardenError};
use crate::exec::invocation::{spawn_hint, InvocationPlan};
use crate::exec::sinks::{LogSinks, StartBanner};
use crate::fs::FileSystem;
use crate::types::Platform;

const READ_CHUNK: usize = 8 * 1024;

/// Upper bound on reading leftover output once the worker has exited. A
/// grandchild holding the pipes open must not stall the run.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Everything one run needs to know about the worker and its artifacts.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub plan: InvocationPlan,
    pub cwd: PathBuf,
    pub result_path: PathBuf,
    pub log_paths: Vec<PathBuf>,
}

/// Output captured from a run that ended successfully.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    /// Worker name used in messages.
    pub tool: String,
    /// Selects the remediation hint for spawn failures.
    pub platform: Platform,
    pub timings: RunTimings,
}

impl SupervisorOptions {
    pub fn from_config(cfg: &ConfigFile, platform: Platform) -> Self {
        Self {
            tool: cfg.worker.name.clone(),
            platform,
            timings: RunTimings {
                timeout: cfg.timing.timeout(),
                poll_interval: cfg.timing.poll_interval(),
                grace_period: cfg.timing.grace_period(),
                kill_delay: cfg.timing.kill_delay(),
            },
        }
    }
}

/// Runs the worker to apparent completion.
#[derive(Debug, Clone)]
pub struct Supervisor {
    options: SupervisorOptions,
    fs: Arc<dyn FileSystem>,
}

impl Supervisor {
    pub fn new(options: SupervisorOptions, fs: Arc<dyn FileSystem>) -> Self {
        Self { options, fs }
    }

    /// Spawn the worker described by `request` and supervise it until it is
    /// gone. Every exit path releases the process, timers and log files
    /// before returning.
    pub async fn run(&self, request: RunRequest) -> Result<RunOutput> {
        let mut core = SupervisorCore::new(
            self.options.tool.clone(),
            request.result_path.clone(),
            self.options.timings,
        );

        let sinks = LogSinks::open(&request.log_paths);
        let mut run = SupervisedRun::new(sinks, &request.result_path, self.fs.as_ref());
        let display_args = request.plan.display_args();
        run.sinks.write_start_banner(&StartBanner {
            command: &request.plan.program,
            args: &display_args,
            cwd: &request.cwd,
            expected_result: &request.result_path,
        });

        info!(
            command = %request.plan.program.display(),
            args = ?display_args,
            cwd = %request.cwd.display(),
            result = %request.result_path.display(),
            sinks = run.sinks.len(),
            "starting worker process"
        );

        let first = match spawn(&request.plan, &request.cwd) {
            Ok(mut child) => {
                // Closing stdin right away keeps the worker from waiting on input.
                drop(child.stdin.take());
                run.stdout = child.stdout.take();
                run.stderr = child.stderr.take();
                debug!(pid = ?child.id(), "worker spawned");
                run.child = Some(child);
                RunEvent::Spawned
            }
            Err(e) => {
                warn!(command = %request.plan.program.display(), error = %e, "failed to spawn worker");
                RunEvent::SpawnFailed {
                    message: e.to_string(),
                }
            }
        };

        let mut step = core.step(first);
        loop {
            let mut follow_up = None;
            for command in step.commands {
                follow_up = run.execute(command).or(follow_up);
            }
            if step.finished {
                break;
            }
            let event = match follow_up {
                Some(event) => event,
                None => run.next_event().await,
            };
            step = core.step(event);
        }

        let outcome = run
            .outcome
            .take()
            .unwrap_or(RunOutcome::Exited { code: -1 });
        info!(outcome = ?outcome, ending = %outcome.ending(), "worker run finished");
        let output = run.into_output();
        self.outcome_to_result(outcome, output, &request.plan.program)
    }

    fn outcome_to_result(&self, outcome: RunOutcome, output: RunOutput, program: &Path) -> Result<RunOutput> {
        let tool = self.options.tool.clone();
        match outcome {
            RunOutcome::ResultDetected | RunOutcome::Exited { code: 0 } => Ok(output),
            RunOutcome::Exited { code } => Err(WardenError::WorkerExitFailure {
                tool,
                code,
                stderr: output.stderr,
            }),
            RunOutcome::TimedOut => Err(WardenError::Timeout {
                tool,
                timeout_ms: self.options.timings.timeout.as_millis(),
            }),
            RunOutcome::SpawnFailed { message } => Err(WardenError::SpawnFailure {
                command: program.display().to_string(),
                message,
                hint: spawn_hint(self.options.platform, &tool),
            }),
        }
    }
}

fn spawn(plan: &InvocationPlan, cwd: &Path) -> io::Result<Child> {
    let mut cmd = Command::new(&plan.program);
    cmd.args(plan.args())
        .current_dir(cwd)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(windows)]
    {
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }

    cmd.spawn()
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Timers owned by one run. Dropping a field cancels that timer.
#[derive(Debug, Default)]
struct Timers {
    hard_timeout: Option<Instant>,
    poll: Option<Interval>,
    grace: Option<Instant>,
    force_kill: Option<Instant>,
}

/// Mutable state of one supervised run.
struct SupervisedRun<'a> {
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
    stdout_buf: Vec<u8>,
    stderr_buf: Vec<u8>,
    sinks: LogSinks,
    timers: Timers,
    result_path: &'a Path,
    fs: &'a dyn FileSystem,
    exited: bool,
    outcome: Option<RunOutcome>,
}

impl<'a> SupervisedRun<'a> {
    fn new(sinks: LogSinks, result_path: &'a Path, fs: &'a dyn FileSystem) -> Self {
        Self {
            child: None,
            stdout: None,
            stderr: None,
            stdout_buf: Vec::new(),
            stderr_buf: Vec::new(),
            sinks,
            timers: Timers::default(),
            result_path,
            fs,
            exited: false,
            outcome: None,
        }
    }

    /// Wait for the next event the core cares about, forwarding output on
    /// the way.
    async fn next_event(&mut self) -> RunEvent {
        let mut out_chunk = [0u8; READ_CHUNK];
        let mut err_chunk = [0u8; READ_CHUNK];
        loop {
            tokio::select! {
                res = read_some(&mut self.stdout, &mut out_chunk) => {
                    self.on_read(Stream::Stdout, res, &out_chunk);
                }
                res = read_some(&mut self.stderr, &mut err_chunk) => {
                    self.on_read(Stream::Stderr, res, &err_chunk);
                }
                status = wait_child(&mut self.child), if !self.exited => {
                    self.exited = true;
                    let code = match status {
                        Ok(status) => {
                            info!(exit_code = ?status.code(), success = status.success(), "worker process exited");
                            status.code().unwrap_or(-1)
                        }
                        Err(e) => {
                            warn!(error = %e, "waiting for worker process failed");
                            -1
                        }
                    };
                    self.drain_output().await;
                    return RunEvent::Exited { code };
                }
                _ = sleep_opt(self.timers.hard_timeout) => {
                    self.timers.hard_timeout = None;
                    return RunEvent::HardTimeout;
                }
                _ = tick_opt(&mut self.timers.poll) => {
                    let result_exists = self.fs.exists(self.result_path);
                    debug!(result_exists, "polled for result file");
                    return RunEvent::PollTick { result_exists };
                }
                _ = sleep_opt(self.timers.grace) => {
                    self.timers.grace = None;
                    return RunEvent::GraceElapsed;
                }
                _ = sleep_opt(self.timers.force_kill) => {
                    self.timers.force_kill = None;
                    return RunEvent::KillDelayElapsed;
                }
            }
        }
    }

    /// Carry out one command. `Finish` is answered right away with
    /// [`RunEvent::Finalized`]; nothing else produces an event.
    fn execute(&mut self, command: CoreCommand) -> Option<RunEvent> {
        match command {
            CoreCommand::ArmHardTimeout(d) => self.timers.hard_timeout = Some(Instant::now() + d),
            CoreCommand::StartPolling(period) => {
                let mut poll = interval_at(Instant::now() + period, period);
                poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.timers.poll = Some(poll);
            }
            CoreCommand::StopPolling => self.timers.poll = None,
            CoreCommand::CancelHardTimeout => self.timers.hard_timeout = None,
            CoreCommand::ArmGrace(d) => self.timers.grace = Some(Instant::now() + d),
            CoreCommand::ArmForceKill(d) => self.timers.force_kill = Some(Instant::now() + d),
            CoreCommand::Terminate => self.terminate(),
            CoreCommand::ForceKill => self.force_kill(),
            CoreCommand::Marker(text) => {
                info!(marker = %text, "run lifecycle");
                self.sinks.marker(&text);
            }
            CoreCommand::Finish(outcome) => {
                self.timers = Timers::default();
                self.sinks.close(outcome.ending());
                self.outcome = Some(outcome);
                return Some(RunEvent::Finalized);
            }
        }
        None
    }

    fn on_read(&mut self, stream: Stream, res: io::Result<usize>, chunk: &[u8]) {
        match res {
            Ok(0) => {
                debug!(?stream, "worker stream closed");
                self.close_stream(stream);
            }
            Ok(n) => self.forward(stream, &chunk[..n]),
            Err(e) => {
                debug!(?stream, error = %e, "reading worker stream failed");
                self.close_stream(stream);
            }
        }
    }

    fn forward(&mut self, stream: Stream, bytes: &[u8]) {
        match stream {
            Stream::Stdout => self.stdout_buf.extend_from_slice(bytes),
            Stream::Stderr => self.stderr_buf.extend_from_slice(bytes),
        }
        self.sinks.write_chunk(bytes);
    }

    fn is_open(&self, stream: Stream) -> bool {
        match stream {
            Stream::Stdout => self.stdout.is_some(),
            Stream::Stderr => self.stderr.is_some(),
        }
    }

    fn close_stream(&mut self, stream: Stream) {
        match stream {
            Stream::Stdout => self.stdout = None,
            Stream::Stderr => self.stderr = None,
        }
    }

    /// Read whatever the worker left in its pipes after exiting.
    async fn drain_output(&mut self) {
        let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
            let mut chunk = [0u8; READ_CHUNK];
            for stream in [Stream::Stdout, Stream::Stderr] {
                while self.is_open(stream) {
                    let res = match stream {
                        Stream::Stdout => read_some(&mut self.stdout, &mut chunk).await,
                        Stream::Stderr => read_some(&mut self.stderr, &mut chunk).await,
                    };
                    self.on_read(stream, res, &chunk);
                }
            }
        })
        .await;

        if drained.is_err() {
            debug!("worker pipes still open after exit; dropping them");
            self.stdout = None;
            self.stderr = None;
        }
    }

    fn terminate(&mut self) {
        let Some(child) = self.child.as_mut() else {
            return;
        };

        #[cfg(unix)]
        {
            if let Some(pid) = child.id() {
                // SAFETY: `pid` belongs to a child we have not reaped yet.
                let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
                if rc != 0 {
                    debug!(pid, error = %io::Error::last_os_error(), "SIGTERM failed");
                }
                return;
            }
        }

        if let Err(e) = child.start_kill() {
            debug!(error = %e, "terminate request failed; worker may already be gone");
        }
    }

    fn force_kill(&mut self) {
        if let Some(child) = self.child.as_mut() {
            if let Err(e) = child.start_kill() {
                debug!(error = %e, "kill failed; worker may already be gone");
            }
        }
    }

    fn into_output(self) -> RunOutput {
        RunOutput {
            stdout: String::from_utf8_lossy(&self.stdout_buf).into_owned(),
            stderr: String::from_utf8_lossy(&self.stderr_buf).into_owned(),
        }
    }
}

/// Read from an optional pipe; a missing pipe never becomes ready.
async fn read_some<R: AsyncRead + Unpin>(reader: &mut Option<R>, buf: &mut [u8]) -> io::Result<usize> {
    match reader {
        Some(r) => r.read(buf).await,
        None => pending().await,
    }
}

async fn wait_child(child: &mut Option<Child>) -> io::Result<std::process::ExitStatus> {
    match child {
        Some(c) => c.wait().await,
        None => pending().await,
    }
}

async fn sleep_opt(deadline: Option<Instant>) {
    match deadline {
        Some(d) => sleep_until(d).await,
        None => pending().await,
    }
}

async fn tick_opt(interval: &mut Option<Interval>) {
    match interval {
        Some(i) => {
            i.tick().await;
        }
        None => pending().await,
    }
}
