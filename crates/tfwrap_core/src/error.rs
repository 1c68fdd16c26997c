//! Error types for the Terraform client.

use std::path::PathBuf;

use thiserror::Error;
use tfwrap_runner::RunnerError;

/// Result type alias for Terraform client operations.
pub type TfResult<T> = Result<T, TfError>;

/// Errors that can occur while constructing or driving a Terraform client.
#[derive(Error, Debug)]
pub enum TfError {
    #[error("Terraform cannot be initialised with an empty working directory")]
    MissingWorkingDir,

    #[error("Error initialising Terraform with working directory {path:?}: {source}")]
    WorkingDirInaccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No executable path was supplied; the caller should locate or install a
    /// binary and pass its path explicitly.
    #[error("No suitable Terraform binary: {0}")]
    NoSuitableBinary(String),

    #[error("terraform {subcommand} exited with code {code}: {stderr}")]
    ExitStatus {
        subcommand: String,
        code: i32,
        stderr: String,
    },

    #[error("Failed to parse terraform version output: {0}")]
    VersionParse(String),

    #[error("Runner error: {0}")]
    Runner(#[from] RunnerError),
}

impl TfError {
    /// Whether the invocation was cancelled through its token.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Runner(e) if e.is_cancelled())
    }
}
