//! # tfwrap_runner
//!
//! Subprocess execution layer for tfwrap.
//!
//! This crate owns the command descriptor handed over by the command
//! builders and the runners that turn a descriptor into a child process.
//!
//! # Features
//!
//! - **Descriptors**: `CommandSpec` carries program, arguments, environment,
//!   working directory and a cancellation token
//! - **Local Runner**: tokio-based execution with timeout and cancellation
//! - **Log Streaming**: optional per-line handler for stdout/stderr
//! - **Mock Runner**: For testing without a real executable
//!
//! # Example
//!
//! ```rust,no_run
//! use tfwrap_runner::{CancellationToken, CommandSpec, LocalRunner, ProcessRunner, RunConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let spec = CommandSpec::new("/usr/local/bin/terraform", "/srv/infra")
//!         .arg("version")
//!         .env_entry("TF_IN_AUTOMATION=1")
//!         .cancel_on(CancellationToken::new());
//!
//!     let result = LocalRunner::new().run(&spec, &RunConfig::default()).await?;
//!     println!("Exit code: {}", result.exit_code);
//!
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod command;
pub mod config;
pub mod error;
pub mod local;
pub mod mock;
pub mod runner;

pub use cancel::CancellationToken;
pub use command::CommandSpec;
pub use config::RunConfig;
pub use error::{RunnerError, RunnerResult};
pub use local::{LocalRunner, LogHandler, LogLine, LogStream};
pub use mock::{CapturedCall, MockResponse, MockRunner};
pub use runner::{ExecutionResult, ProcessRunner};
