// tests/supervisor_process.rs
//
// Real worker processes, played by small `sh` scripts.
#![cfg(unix)]

mod common;
use crate::common::{init_tracing, real_invoker, with_timeout};

use std::error::Error;
use std::fs;
use std::time::{Duration, Instant};

use scoutwarden::errors::WardenError;
use scoutwarden_test_utils::builders::{ConfigFileBuilder, TaskTree};
use scoutwarden_test_utils::worker_script::WorkerScripts;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn detected_result_stops_a_lingering_worker() -> TestResult {
    init_tracing();
    let tree = TaskTree::new();
    tree.add_task("demo", "x");
    let scripts = WorkerScripts::new();
    let worker = scripts.writes_result_and_lingers(&tree.result_path("demo"), "# answer");
    let cfg = ConfigFileBuilder::fast().with_worker_path(&worker).build();

    let started = Instant::now();
    let report = with_timeout(real_invoker(&cfg, &tree).invoke("demo")).await?;

    // The script would sleep for 30s if nobody stopped it.
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(fs::read_to_string(&report.result_path)?, "# answer");

    for log in [&report.latest_log_path, &report.timestamped_log_path] {
        let text = fs::read_to_string(log)?;
        assert!(text.starts_with("request accepted at "));
        assert!(text.contains("expectedResultPath: "));
        assert!(text.contains("working\n"));
        assert!(text.contains("[DETECTION] Result file created: "));
        assert!(text.contains("[TERMINATION] Gracefully terminating ccr after grace period"));
        assert!(text.contains("run end (result detected, terminated)"));
    }
    Ok(())
}

#[tokio::test]
async fn output_during_the_grace_period_is_still_logged() -> TestResult {
    init_tracing();
    let tree = TaskTree::new();
    tree.add_task("demo", "x");
    let scripts = WorkerScripts::new();
    let worker = scripts.writes_result_then_talks(&tree.result_path("demo"), 1, "final words");
    let grace = Duration::from_millis(1_500);
    let cfg = ConfigFileBuilder::fast()
        .with_worker_path(&worker)
        .with_grace_period_ms(1_500)
        .build();

    let started = Instant::now();
    let report = with_timeout(real_invoker(&cfg, &tree).invoke("demo")).await?;

    // SIGTERM waits for the whole grace period after detection.
    assert!(started.elapsed() >= grace);

    let log = fs::read_to_string(&report.latest_log_path)?;
    let detection = log.find("[DETECTION]").ok_or("no detection marker")?;
    let late = log.find("final words\n").ok_or("late output missing")?;
    let termination = log.find("[TERMINATION]").ok_or("no termination marker")?;
    let end = log.find("run end").ok_or("no end banner")?;
    assert!(detection < late, "late output logged before detection:\n{log}");
    assert!(late < termination, "late output logged after terminate:\n{log}");
    assert!(termination < end);
    Ok(())
}

#[tokio::test]
async fn worker_ignoring_sigterm_is_force_killed() -> TestResult {
    init_tracing();
    let tree = TaskTree::new();
    tree.add_task("demo", "x");
    let scripts = WorkerScripts::new();
    let worker = scripts.writes_result_and_ignores_term(&tree.result_path("demo"), "stubborn");
    let cfg = ConfigFileBuilder::fast().with_worker_path(&worker).build();

    let report = with_timeout(real_invoker(&cfg, &tree).invoke("demo")).await?;

    assert_eq!(fs::read_to_string(&report.result_path)?, "stubborn");
    Ok(())
}

#[tokio::test]
async fn natural_exit_saves_trimmed_stdout() -> TestResult {
    init_tracing();
    let tree = TaskTree::new();
    tree.add_task("demo", "x");
    let scripts = WorkerScripts::new();
    let worker = scripts.exits("\n  all done  \n", "", 0);
    let cfg = ConfigFileBuilder::fast().with_worker_path(&worker).build();

    let report = with_timeout(real_invoker(&cfg, &tree).invoke("demo")).await?;

    assert_eq!(fs::read_to_string(&report.result_path)?, "all done");
    let log = fs::read_to_string(&report.latest_log_path)?;
    assert!(log.contains("run end (ok)"));
    Ok(())
}

#[tokio::test]
async fn worker_sees_the_task_argument_and_project_root() -> TestResult {
    init_tracing();
    let tree = TaskTree::new();
    let task = tree.add_task("demo", "x");
    let scripts = WorkerScripts::new();
    let worker = scripts.echoes_args_and_cwd();
    let cfg = ConfigFileBuilder::fast().with_worker_path(&worker).build();

    let report = with_timeout(real_invoker(&cfg, &tree).invoke("demo")).await?;

    let saved = fs::read_to_string(&report.result_path)?;
    let lines: Vec<&str> = saved.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "code");
    assert_eq!(lines[1], "--dangerously-skip-permissions");
    assert_eq!(lines[2], format!("task file {}", task.display()));
    assert_eq!(fs::canonicalize(lines[3])?, fs::canonicalize(tree.root())?);
    Ok(())
}

#[tokio::test]
async fn nonzero_exit_reports_stderr() {
    init_tracing();
    let tree = TaskTree::new();
    tree.add_task("demo", "x");
    let scripts = WorkerScripts::new();
    let worker = scripts.exits("partial output", "quota exceeded", 3);
    let cfg = ConfigFileBuilder::fast().with_worker_path(&worker).build();

    let err = with_timeout(real_invoker(&cfg, &tree).invoke("demo"))
        .await
        .unwrap_err();

    match err {
        WardenError::WorkerExitFailure { code, ref stderr, .. } => {
            assert_eq!(code, 3);
            assert_eq!(stderr, "quota exceeded");
        }
        other => panic!("expected WorkerExitFailure, got {other:?}"),
    }
    // Failed runs never fall back to stdout.
    assert!(!tree.result_path("demo").exists());
}

#[tokio::test]
async fn nonzero_exit_without_stderr_reports_the_code() {
    init_tracing();
    let tree = TaskTree::new();
    tree.add_task("demo", "x");
    let scripts = WorkerScripts::new();
    let worker = scripts.exits("", "", 4);
    let cfg = ConfigFileBuilder::fast().with_worker_path(&worker).build();

    let err = with_timeout(real_invoker(&cfg, &tree).invoke("demo"))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "ccr exited with code 4");
}

#[tokio::test]
async fn hard_timeout_kills_the_worker() -> TestResult {
    init_tracing();
    let tree = TaskTree::new();
    tree.add_task("demo", "x");
    let scripts = WorkerScripts::new();
    let worker = scripts.hangs();
    let cfg = ConfigFileBuilder::fast()
        .with_timeout_ms(300)
        .with_worker_path(&worker)
        .build();

    let started = Instant::now();
    let err = with_timeout(real_invoker(&cfg, &tree).invoke("demo"))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "ccr timed out after 300ms");
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(!tree.result_path("demo").exists());

    let log = fs::read_to_string(tree.latest_log_path("demo"))?;
    assert!(log.contains("ERROR: ccr timed out after 300ms"));
    assert!(log.contains("run end (timeout)"));
    Ok(())
}

#[tokio::test]
async fn missing_worker_fails_to_spawn_with_hint() -> TestResult {
    init_tracing();
    let tree = TaskTree::new();
    tree.add_task("demo", "x");
    let missing = tree.root().join("no-such-worker");
    let cfg = ConfigFileBuilder::fast().with_worker_path(&missing).build();

    let err = with_timeout(real_invoker(&cfg, &tree).invoke("demo"))
        .await
        .unwrap_err();

    assert!(matches!(err, WardenError::SpawnFailure { .. }));
    let msg = err.to_string();
    assert!(msg.starts_with(&format!("Failed to spawn {}: ", missing.display())));
    assert!(msg.ends_with("Ensure 'ccr' is installed and available on PATH, or set CCR_PATH."));

    let log = fs::read_to_string(tree.latest_log_path("demo"))?;
    assert!(log.contains("spawn error: "));
    assert!(log.contains("run end (error)"));
    Ok(())
}

#[tokio::test]
async fn leftover_result_counts_as_detection() -> TestResult {
    init_tracing();
    let tree = TaskTree::new();
    tree.add_task("demo", "x");
    tree.add_stale_result("demo", "from last time");
    let scripts = WorkerScripts::new();
    let worker = scripts.hangs();
    let cfg = ConfigFileBuilder::fast().with_worker_path(&worker).build();

    let started = Instant::now();
    let report = with_timeout(real_invoker(&cfg, &tree).invoke("demo")).await?;

    // Detected on the first poll, well before the 5s hard timeout.
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(fs::read_to_string(report.result_path)?, "from last time");
    Ok(())
}
