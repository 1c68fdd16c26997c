//! Local subprocess runner built on `tokio::process`.
//!
//! The child gets exactly the environment listed in the descriptor; nothing is
//! inherited from the parent process. Output is captured concurrently and can
//! optionally be streamed line by line.

use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::command::CommandSpec;
use crate::config::RunConfig;
use crate::error::{RunnerError, RunnerResult};
use crate::runner::{ExecutionResult, ProcessRunner};

/// Log output from a running process.
#[derive(Debug, Clone)]
pub struct LogLine {
    pub invocation_id: Uuid,
    pub timestamp: chrono::DateTime<Utc>,
    pub stream: LogStream,
    pub message: String,
}

/// Log stream type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Stdout,
    Stderr,
}

impl std::fmt::Display for LogStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

/// Log handler callback type.
pub type LogHandler = Arc<dyn Fn(LogLine) + Send + Sync>;

/// How a wait on the child ended.
enum Outcome {
    Exited(std::io::Result<ExitStatus>),
    Cancelled,
    TimedOut,
}

/// Runs descriptors as local child processes.
#[derive(Clone, Default)]
pub struct LocalRunner {
    log_handler: Option<LogHandler>,
}

impl LocalRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a log handler for streamed output lines.
    pub fn with_log_handler(mut self, handler: LogHandler) -> Self {
        self.log_handler = Some(handler);
        self
    }

    fn build_command(spec: &CommandSpec) -> Command {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .env_clear()
            .envs(spec.env_pairs())
            .current_dir(&spec.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn terminate(child: &mut Child) {
        if let Err(e) = child.kill().await {
            warn!("Failed to kill child process: {}", e);
        }
    }
}

/// Read a stream to its end, optionally forwarding every line.
async fn collect_output<R>(
    reader: R,
    invocation_id: Uuid,
    stream: LogStream,
    stream_logs: bool,
    handler: Option<LogHandler>,
) -> String
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut output = String::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                output.push_str(&line);

                if stream_logs {
                    let message = line.trim_end_matches(['\r', '\n']).to_string();
                    debug!(target: "tfwrap::process", %invocation_id, %stream, "{}", message);
                    if let Some(handler) = &handler {
                        handler(LogLine {
                            invocation_id,
                            timestamp: Utc::now(),
                            stream,
                            message,
                        });
                    }
                }
            }
            Err(e) => {
                warn!("Failed reading {} of {}: {}", stream, invocation_id, e);
                break;
            }
        }
    }

    output
}

#[async_trait]
impl ProcessRunner for LocalRunner {
    async fn run(&self, spec: &CommandSpec, config: &RunConfig) -> RunnerResult<ExecutionResult> {
        if spec.cancel.is_cancelled() {
            return Err(RunnerError::Cancelled);
        }

        let invocation_id = Uuid::new_v4();
        debug!(%invocation_id, "Executing: {}", spec);

        let started_at = Utc::now();
        let mut child = Self::build_command(spec)
            .spawn()
            .map_err(|source| RunnerError::SpawnFailed {
                program: spec.program.clone(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RunnerError::ExecutionFailed("stdout unavailable".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RunnerError::ExecutionFailed("stderr unavailable".to_string()))?;

        let mut stdout_task = tokio::spawn(collect_output(
            stdout,
            invocation_id,
            LogStream::Stdout,
            config.stream_logs,
            self.log_handler.clone(),
        ));
        let mut stderr_task = tokio::spawn(collect_output(
            stderr,
            invocation_id,
            LogStream::Stderr,
            config.stream_logs,
            self.log_handler.clone(),
        ));

        let timeout_seconds = config.timeout_seconds;
        let deadline = async move {
            if timeout_seconds > 0 {
                tokio::time::sleep(Duration::from_secs(timeout_seconds)).await;
            } else {
                std::future::pending::<()>().await;
            }
        };
        tokio::pin!(deadline);

        let outcome = tokio::select! {
            status = child.wait() => Outcome::Exited(status),
            _ = spec.cancel.cancelled() => Outcome::Cancelled,
            _ = &mut deadline => Outcome::TimedOut,
        };

        let status = match outcome {
            Outcome::Exited(status) => status.map_err(|e| {
                RunnerError::ExecutionFailed(format!("Failed to wait for process: {}", e))
            })?,
            Outcome::Cancelled => {
                info!(%invocation_id, "Cancellation requested, killing {}", spec.program.display());
                Self::terminate(&mut child).await;
                stdout_task.abort();
                stderr_task.abort();
                return Err(RunnerError::Cancelled);
            }
            Outcome::TimedOut => {
                error!(%invocation_id, "Process exceeded {}s timeout", timeout_seconds);
                Self::terminate(&mut child).await;
                stdout_task.abort();
                stderr_task.abort();
                return Err(RunnerError::Timeout(timeout_seconds));
            }
        };

        // A background grandchild can hold the pipes open after the child exits.
        let drained = tokio::select! {
            output = async { ((&mut stdout_task).await, (&mut stderr_task).await) } => Ok(output),
            _ = spec.cancel.cancelled() => Err(RunnerError::Cancelled),
            _ = &mut deadline => Err(RunnerError::Timeout(timeout_seconds)),
        };

        let (stdout, stderr) = match drained {
            Ok((stdout, stderr)) => (stdout.unwrap_or_default(), stderr.unwrap_or_default()),
            Err(e) => {
                warn!(%invocation_id, "Output still open after process exit: {}", e);
                stdout_task.abort();
                stderr_task.abort();
                return Err(e);
            }
        };
        let finished_at = Utc::now();
        let duration_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;
        let exit_code = status.code().unwrap_or(-1);

        if exit_code == 0 {
            debug!(%invocation_id, "Process completed successfully in {}ms", duration_ms);
        } else {
            warn!(
                %invocation_id,
                "Process exited with code {} after {}ms", exit_code, duration_ms
            );
        }

        Ok(ExecutionResult {
            invocation_id,
            exit_code,
            stdout,
            stderr,
            started_at,
            finished_at,
            duration_ms,
        })
    }
}
