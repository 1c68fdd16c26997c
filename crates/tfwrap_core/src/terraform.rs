//! Terraform client handle.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tfwrap_runner::{CancellationToken, CommandSpec, ExecutionResult, LocalRunner, ProcessRunner, RunConfig};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::env::{self, EnvProvider, ProcessEnv};
use crate::error::{TfError, TfResult};
use crate::version::TerraformVersion;

/// Side-channel sink for command log lines.
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

/// A Terraform working directory bound to one executable.
///
/// The handle is created once and reused for any number of invocations.
/// Building a command reads the handle but never mutates it, so concurrent
/// builds are safe; setters need `&mut self`.
pub struct Terraform {
    exec_path: PathBuf,
    working_dir: PathBuf,
    env: Option<HashMap<String, String>>,
    logger: LogSink,
    env_provider: Arc<dyn EnvProvider>,
    runner: Arc<dyn ProcessRunner>,
    run_config: RunConfig,
    pub(crate) version_cache: Mutex<Option<TerraformVersion>>,
}

impl Terraform {
    /// Create a client using the real process environment and a local runner.
    ///
    /// The working directory must be non-empty and exist. An empty
    /// `exec_path` yields [`TfError::NoSuitableBinary`]; locating or
    /// installing a binary is left to the caller.
    pub fn new(working_dir: impl Into<PathBuf>, exec_path: impl Into<PathBuf>) -> TfResult<Self> {
        Self::with_parts(
            working_dir,
            exec_path,
            Arc::new(ProcessEnv),
            Arc::new(LocalRunner::new()),
        )
    }

    /// Create a client with explicit environment provider and runner.
    pub fn with_parts(
        working_dir: impl Into<PathBuf>,
        exec_path: impl Into<PathBuf>,
        env_provider: Arc<dyn EnvProvider>,
        runner: Arc<dyn ProcessRunner>,
    ) -> TfResult<Self> {
        let working_dir = working_dir.into();
        let exec_path = exec_path.into();

        if working_dir.as_os_str().is_empty() {
            return Err(TfError::MissingWorkingDir);
        }

        std::fs::metadata(&working_dir).map_err(|source| TfError::WorkingDirInaccessible {
            path: working_dir.clone(),
            source,
        })?;

        if exec_path.as_os_str().is_empty() {
            return Err(TfError::NoSuitableBinary(
                "please supply the path to a Terraform executable".to_string(),
            ));
        }

        let env = env::parse_environ(env_provider.environ());
        info!(
            "Terraform client for {} using {}",
            working_dir.display(),
            exec_path.display()
        );

        Ok(Self {
            exec_path,
            working_dir,
            env: Some(env),
            logger: Arc::new(|_: &str| {}),
            env_provider,
            runner,
            run_config: RunConfig::default(),
            version_cache: Mutex::new(None),
        })
    }

    pub fn exec_path(&self) -> &Path {
        &self.exec_path
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// The stored environment; `None` when the ambient one is followed.
    pub fn env(&self) -> Option<&HashMap<String, String>> {
        self.env.as_ref()
    }

    pub fn run_config(&self) -> &RunConfig {
        &self.run_config
    }

    /// Replace the environment passed to Terraform.
    ///
    /// Unless `env` sets `CHECKPOINT_DISABLE` itself, the ambient value is
    /// carried over so the opt-out survives an explicit environment.
    pub fn set_env(&mut self, mut env: HashMap<String, String>) {
        env::propagate_checkpoint_disable(&mut env, self.env_provider.as_ref());
        self.env = Some(env);
    }

    /// Drop the stored environment and read the ambient one on every build.
    pub fn inherit_env(&mut self) {
        self.env = None;
    }

    pub fn set_logger(&mut self, logger: LogSink) {
        self.logger = logger;
    }

    /// Set the run configuration used for every invocation.
    pub fn set_run_config(&mut self, config: RunConfig) {
        self.run_config = config;
    }

    /// Compute the environment for a new invocation.
    pub fn build_env(&self) -> Vec<String> {
        env::build_env(self.env.as_ref(), self.env_provider.as_ref())
    }

    /// Assemble a descriptor for `args`, bound to `cancel`.
    pub(crate) fn build_terraform_cmd<I, S>(&self, cancel: &CancellationToken, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let spec = CommandSpec::new(&self.exec_path, &self.working_dir)
            .args(args)
            .env(self.build_env())
            .cancel_on(cancel.clone());

        let line = format!("Terraform command: {}", spec);
        debug!("{}", line);
        (self.logger)(&line);

        spec
    }

    /// Run a descriptor, turning a nonzero exit into an error.
    pub(crate) async fn run_terraform_cmd(&self, spec: CommandSpec) -> TfResult<ExecutionResult> {
        let subcommand = spec.args.first().cloned().unwrap_or_default();
        let result = self.runner.run(&spec, &self.run_config).await?;

        if !result.success() {
            return Err(TfError::ExitStatus {
                subcommand,
                code: result.exit_code,
                stderr: result.stderr.trim().to_string(),
            });
        }

        Ok(result)
    }
}

impl std::fmt::Debug for Terraform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Terraform")
            .field("exec_path", &self.exec_path)
            .field("working_dir", &self.working_dir)
            .field("env_vars", &self.env.as_ref().map(HashMap::len))
            .field("run_config", &self.run_config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::StaticEnv;
    use std::sync::Mutex as StdMutex;
    use tempfile::tempdir;
    use tfwrap_runner::{MockResponse, MockRunner};

    fn client(dir: &Path, provider: StaticEnv) -> Terraform {
        Terraform::with_parts(dir, "/usr/bin/terraform", Arc::new(provider), Arc::new(MockRunner::new())).unwrap()
    }

    #[test]
    fn test_environment_seeded_from_provider() {
        let dir = tempdir().unwrap();
        let tf = client(dir.path(), StaticEnv::from_entries(["HOME=/root", "PATH=/bin"]));

        let env = tf.env().unwrap();
        assert_eq!(env.get("HOME").map(String::as_str), Some("/root"));
        assert_eq!(env.get("PATH").map(String::as_str), Some("/bin"));
    }

    #[test]
    fn test_set_env_replaces_rather_than_merges() {
        let dir = tempdir().unwrap();
        let mut tf = client(dir.path(), StaticEnv::from_entries(["HOME=/root"]));

        tf.set_env(HashMap::from([("FOO".to_string(), "bar".to_string())]));

        let env = tf.env().unwrap();
        assert!(!env.contains_key("HOME"));
        assert_eq!(env.get("FOO").map(String::as_str), Some("bar"));
    }

    #[test]
    fn test_inherit_env_reads_provider_on_build() {
        let dir = tempdir().unwrap();
        let mut tf = client(dir.path(), StaticEnv::from_entries(["HOME=/root"]));
        tf.set_env(HashMap::new());
        tf.inherit_env();

        assert!(tf.env().is_none());
        assert!(tf.build_env().contains(&"HOME=/root".to_string()));
    }

    #[test]
    fn test_logger_receives_command_line() {
        let dir = tempdir().unwrap();
        let mut tf = client(dir.path(), StaticEnv::new());
        let captured = Arc::new(StdMutex::new(Vec::new()));
        let sink = captured.clone();
        tf.set_logger(Arc::new(move |line: &str| sink.lock().unwrap().push(line.to_string())));

        tf.build_terraform_cmd(&CancellationToken::new(), ["version"]);

        assert_eq!(
            *captured.lock().unwrap(),
            vec!["Terraform command: /usr/bin/terraform version".to_string()]
        );
    }

    #[tokio::test]
    async fn test_nonzero_exit_becomes_error() {
        let dir = tempdir().unwrap();
        let runner = MockRunner::new().add_response(MockResponse::failure(1, "Error: boom\n"));
        let tf = Terraform::with_parts(dir.path(), "/usr/bin/terraform", Arc::new(StaticEnv::new()), Arc::new(runner))
            .unwrap();

        let spec = tf.build_terraform_cmd(&CancellationToken::new(), ["plan"]);
        let err = tf.run_terraform_cmd(spec).await.unwrap_err();

        match err {
            TfError::ExitStatus { subcommand, code, stderr } => {
                assert_eq!(subcommand, "plan");
                assert_eq!(code, 1);
                assert_eq!(stderr, "Error: boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
