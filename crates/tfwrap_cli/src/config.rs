//! CLI configuration file.
//!
//! Resolution order, lowest to highest: built-in defaults, the YAML file
//! (`--config` or `./tfwrap.yaml`), `TFWRAP_*` environment variables, and
//! finally command-line flags (applied by the command modules).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tfwrap_core::PlanOption;
use tracing::debug;

/// Configuration file looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "tfwrap.yaml";

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid value for {variable}: {value}")]
    InvalidEnv { variable: String, value: String },
}

/// Settings shared by all commands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Path of the terraform executable
    pub exec_path: Option<PathBuf>,
    /// Terraform working directory
    pub working_dir: Option<PathBuf>,
    /// Explicit environment; replaces the inherited one when set
    pub env: Option<HashMap<String, String>>,
    /// Per-invocation timeout in seconds (0 = none)
    pub timeout_seconds: u64,
    /// Stream terraform output while it runs
    pub stream_logs: bool,
    /// Options applied to every plan before command-line flags
    pub plan_defaults: Vec<PlanOption>,
}

impl CliConfig {
    /// Load configuration from `path`, or from `./tfwrap.yaml` when no path
    /// is given and that file exists.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) if !path.exists() => Err(ConfigError::NotFound(path.to_path_buf())),
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading config from {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `TFWRAP_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply `TFWRAP_*` overrides using `lookup` to read variables.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("TFWRAP_EXEC_PATH").filter(|v| !v.is_empty()) {
            self.exec_path = Some(PathBuf::from(path));
        }

        if let Some(dir) = lookup("TFWRAP_WORKING_DIR").filter(|v| !v.is_empty()) {
            self.working_dir = Some(PathBuf::from(dir));
        }

        if let Some(timeout) = lookup("TFWRAP_TIMEOUT") {
            self.timeout_seconds = timeout.parse().map_err(|_| ConfigError::InvalidEnv {
                variable: "TFWRAP_TIMEOUT".to_string(),
                value: timeout.clone(),
            })?;
        }

        Ok(self)
    }
}
