//! Mock process runner for testing.
//!
//! Provides a configurable mock implementation of the ProcessRunner trait
//! for use in unit tests without requiring a real executable.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::command::CommandSpec;
use crate::config::RunConfig;
use crate::error::{RunnerError, RunnerResult};
use crate::runner::{ExecutionResult, ProcessRunner};

/// Predefined mock response for a process execution.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl MockResponse {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
            duration_ms: 100,
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
            duration_ms: 100,
        }
    }
}

/// Captured call information for verification.
#[derive(Debug, Clone)]
pub struct CapturedCall {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: Vec<String>,
    pub working_dir: PathBuf,
    pub timeout_seconds: u64,
}

impl CapturedCall {
    /// The subcommand, i.e. the first argument.
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

/// Mock process runner for testing.
///
/// This runner captures all calls and returns predefined responses,
/// allowing tests to verify invocations without spawning processes.
#[derive(Clone)]
pub struct MockRunner {
    /// Predefined responses for run calls.
    responses: Arc<RwLock<Vec<MockResponse>>>,
    /// Index of next response to return.
    response_index: Arc<AtomicUsize>,
    /// Captured calls for verification.
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
    /// Simulated failure to return (as a string message for ExecutionFailed).
    simulate_failure: Arc<RwLock<Option<String>>>,
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRunner {
    /// Create a new mock runner.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(RwLock::new(Vec::new())),
            response_index: Arc::new(AtomicUsize::new(0)),
            captured_calls: Arc::new(RwLock::new(Vec::new())),
            simulate_failure: Arc::new(RwLock::new(None)),
        }
    }

    /// Add a mock response for the next run call.
    pub fn add_response(self, response: MockResponse) -> Self {
        self.responses.write().push(response);
        self
    }

    /// Set multiple responses.
    pub fn with_responses(self, responses: Vec<MockResponse>) -> Self {
        *self.responses.write() = responses;
        self
    }

    /// Set a failure to simulate.
    pub fn simulate_failure(self, message: impl Into<String>) -> Self {
        *self.simulate_failure.write() = Some(message.into());
        self
    }

    /// Get all captured calls.
    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    /// Get calls for a specific subcommand.
    pub fn get_subcommand_calls(&self, subcommand: &str) -> Vec<CapturedCall> {
        self.captured_calls
            .read()
            .iter()
            .filter(|c| c.subcommand() == Some(subcommand))
            .cloned()
            .collect()
    }

    fn record_call(&self, call: CapturedCall) {
        self.captured_calls.write().push(call);
    }

    fn next_response(&self) -> MockResponse {
        let responses = self.responses.read();
        if responses.is_empty() {
            return MockResponse::success("");
        }
        let index = self.response_index.fetch_add(1, Ordering::SeqCst);
        responses
            .get(index % responses.len())
            .cloned()
            .unwrap_or_else(|| MockResponse::success(""))
    }

    fn check_failure(&self) -> RunnerResult<()> {
        if let Some(msg) = self.simulate_failure.read().clone() {
            return Err(RunnerError::ExecutionFailed(msg));
        }
        Ok(())
    }
}

#[async_trait]
impl ProcessRunner for MockRunner {
    async fn run(&self, spec: &CommandSpec, config: &RunConfig) -> RunnerResult<ExecutionResult> {
        self.record_call(CapturedCall {
            program: spec.program.clone(),
            args: spec.args.clone(),
            env: spec.env.clone(),
            working_dir: spec.working_dir.clone(),
            timeout_seconds: config.timeout_seconds,
        });

        if spec.cancel.is_cancelled() {
            return Err(RunnerError::Cancelled);
        }
        self.check_failure()?;

        let response = self.next_response();
        let started_at = Utc::now();
        let finished_at = started_at + chrono::Duration::milliseconds(response.duration_ms as i64);

        Ok(ExecutionResult {
            invocation_id: Uuid::new_v4(),
            exit_code: response.exit_code,
            stdout: response.stdout,
            stderr: response.stderr,
            started_at,
            finished_at,
            duration_ms: response.duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;

    fn spec(args: &[&str]) -> CommandSpec {
        CommandSpec::new("/usr/bin/terraform", "/work").args(args.iter().copied())
    }

    #[tokio::test]
    async fn test_mock_runner_basic() {
        let runner = MockRunner::new().add_response(MockResponse::success("test output"));

        let result = runner
            .run(&spec(&["version"]), &RunConfig::default())
            .await
            .unwrap();

        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout, "test output");
    }

    #[tokio::test]
    async fn test_mock_runner_captures_calls() {
        let runner = MockRunner::new();

        let spec = spec(&["plan", "-no-color"]).env_entry("TF_INPUT=0");
        let _ = runner.run(&spec, &RunConfig::default().timeout(30)).await;

        let calls = runner.get_subcommand_calls("plan");
        assert_eq!(calls.len(), 1);

        let call = &calls[0];
        assert_eq!(call.program, PathBuf::from("/usr/bin/terraform"));
        assert_eq!(call.args, vec!["plan", "-no-color"]);
        assert_eq!(call.env, vec!["TF_INPUT=0"]);
        assert_eq!(call.working_dir, PathBuf::from("/work"));
        assert_eq!(call.timeout_seconds, 30);
    }

    #[tokio::test]
    async fn test_mock_runner_failure_simulation() {
        let runner = MockRunner::new().simulate_failure("simulated error");

        let result = runner.run(&spec(&["plan"]), &RunConfig::default()).await;
        assert!(matches!(result, Err(RunnerError::ExecutionFailed(_))));
    }

    #[tokio::test]
    async fn test_mock_runner_multiple_responses() {
        let runner = MockRunner::new().with_responses(vec![
            MockResponse::success("first"),
            MockResponse::success("second"),
            MockResponse::failure(1, "third failed"),
        ]);

        let config = RunConfig::default();
        let r1 = runner.run(&spec(&["plan"]), &config).await.unwrap();
        assert_eq!(r1.stdout, "first");

        let r2 = runner.run(&spec(&["plan"]), &config).await.unwrap();
        assert_eq!(r2.stdout, "second");

        let r3 = runner.run(&spec(&["plan"]), &config).await.unwrap();
        assert_eq!(r3.exit_code, 1);
        assert_eq!(r3.stderr, "third failed");
    }

    #[tokio::test]
    async fn test_mock_runner_honours_cancellation() {
        let runner = MockRunner::new();
        let token = CancellationToken::new();
        token.cancel();

        let err = runner
            .run(&spec(&["plan"]).cancel_on(token), &RunConfig::default())
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(runner.call_count(), 1);
    }
}
