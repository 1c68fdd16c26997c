//! Integration tests for the local process runner.
//!
//! These tests spawn `/bin/sh` and are only compiled on Unix.

#![cfg(unix)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tempfile::tempdir;
use tfwrap_runner::{
    CancellationToken, CommandSpec, LocalRunner, LogLine, LogStream, ProcessRunner, RunConfig,
    RunnerError,
};

fn sh(script: &str, dir: &std::path::Path) -> CommandSpec {
    CommandSpec::new("/bin/sh", dir)
        .args(["-c", script])
        .env_entry(format!("PATH={}", std::env::var("PATH").unwrap_or_default()))
}

/// Test stdout, stderr and exit code are captured.
#[tokio::test]
async fn test_captures_output_and_exit_code() {
    let dir = tempdir().unwrap();
    let spec = sh("echo out; echo err >&2; exit 3", dir.path());

    let result = LocalRunner::new()
        .run(&spec, &RunConfig::default())
        .await
        .unwrap();

    assert_eq!(result.exit_code, 3);
    assert!(!result.success());
    assert_eq!(result.stdout, "out\n");
    assert_eq!(result.stderr, "err\n");
}

/// Test the child sees only the descriptor's environment.
#[tokio::test]
async fn test_environment_is_replaced() {
    let dir = tempdir().unwrap();
    std::env::set_var("TFWRAP_RUNNER_TEST_LEAK", "leaked");

    let spec = sh(
        "echo \"$TF_IN_AUTOMATION:${TFWRAP_RUNNER_TEST_LEAK:-unset}\"",
        dir.path(),
    )
    .env_entry("TF_IN_AUTOMATION=1");

    let result = LocalRunner::new()
        .run(&spec, &RunConfig::default())
        .await
        .unwrap();

    assert_eq!(result.stdout.trim(), "1:unset");
}

/// Test the working directory is applied.
#[tokio::test]
async fn test_working_directory() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("main.tf"), "").unwrap();

    let result = LocalRunner::new()
        .run(&sh("ls", dir.path()), &RunConfig::default())
        .await
        .unwrap();

    assert!(result.stdout.contains("main.tf"));
}

/// Test cancelling the token kills the process and surfaces a cancellation error.
#[tokio::test]
async fn test_cancellation_kills_process() {
    let dir = tempdir().unwrap();
    let token = CancellationToken::new();
    let spec = sh("sleep 30", dir.path()).cancel_on(token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
    });

    let start = Instant::now();
    let err = LocalRunner::new()
        .run(&spec, &RunConfig::default())
        .await
        .unwrap_err();
    canceller.await.unwrap();

    assert!(matches!(err, RunnerError::Cancelled));
    assert!(start.elapsed() < Duration::from_secs(10));
}

/// Test a timeout terminates the process.
#[tokio::test]
async fn test_timeout() {
    let dir = tempdir().unwrap();
    let spec = sh("sleep 30", dir.path());

    let err = LocalRunner::new()
        .run(&spec, &RunConfig::default().timeout(1))
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::Timeout(1)));
}

/// Test cancellation still applies while a background job keeps stdout open.
#[tokio::test]
async fn test_cancellation_after_exit_with_open_output() {
    let dir = tempdir().unwrap();
    let token = CancellationToken::new();
    let spec = sh("sleep 4 & echo started", dir.path()).cancel_on(token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        token.cancel();
    });

    let start = Instant::now();
    let err = LocalRunner::new()
        .run(&spec, &RunConfig::default())
        .await
        .unwrap_err();
    canceller.await.unwrap();

    assert!(matches!(err, RunnerError::Cancelled));
    assert!(start.elapsed() < Duration::from_secs(3));
}

/// Test the timeout bounds the run while a background job keeps stdout open.
#[tokio::test]
async fn test_timeout_after_exit_with_open_output() {
    let dir = tempdir().unwrap();
    let spec = sh("sleep 4 & echo started", dir.path());

    let start = Instant::now();
    let err = LocalRunner::new()
        .run(&spec, &RunConfig::default().timeout(1))
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::Timeout(1)));
    assert!(start.elapsed() < Duration::from_secs(3));
}

/// Test streamed lines reach the log handler.
#[tokio::test]
async fn test_log_handler_receives_lines() {
    let dir = tempdir().unwrap();
    let lines: Arc<Mutex<Vec<LogLine>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = lines.clone();

    let runner = LocalRunner::new().with_log_handler(Arc::new(move |line: LogLine| sink.lock().push(line)));
    let result = runner
        .run(
            &sh("echo one; echo two; echo three >&2", dir.path()),
            &RunConfig::default().stream(),
        )
        .await
        .unwrap();

    let lines = lines.lock();
    let stdout: Vec<_> = lines
        .iter()
        .filter(|l| l.stream == LogStream::Stdout)
        .map(|l| l.message.as_str())
        .collect();
    let stderr: Vec<_> = lines
        .iter()
        .filter(|l| l.stream == LogStream::Stderr)
        .map(|l| l.message.as_str())
        .collect();

    assert_eq!(stdout, vec!["one", "two"]);
    assert_eq!(stderr, vec!["three"]);
    assert!(lines.iter().all(|l| l.invocation_id == result.invocation_id));
}
