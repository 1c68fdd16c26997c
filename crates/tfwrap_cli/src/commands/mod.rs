//! CLI command definitions.
//!
//! Each subcommand maps to one Terraform invocation built by `tfwrap_core`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tfwrap_core::{ProcessEnv, Terraform};
use tfwrap_runner::{LocalRunner, LogLine, LogStream, RunConfig};

use crate::config::CliConfig;

pub mod plan;
pub mod version;

/// tfwrap - typed, non-interactive Terraform invocations
#[derive(Parser, Debug)]
#[command(name = "tfwrap")]
#[command(version, about = "tfwrap - typed, non-interactive Terraform invocations")]
#[command(long_about = r#"
tfwrap runs Terraform with a fixed, machine-friendly argument order and a
sanitized environment: logging, interactive input and human hints are always
disabled.

COMMANDS:
  plan     → Run terraform plan with typed options
  version  → Detect the terraform version

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments or configuration
  3 - Terraform exited with an error
  4 - Cancelled
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Configuration file (defaults to ./tfwrap.yaml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Terraform working directory
    #[arg(short, long, global = true, env = "TFWRAP_WORKING_DIR")]
    pub dir: Option<PathBuf>,

    /// Path of the terraform executable
    #[arg(long, global = true, env = "TFWRAP_EXEC_PATH")]
    pub exec_path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run terraform plan
    Plan(plan::PlanArgs),

    /// Show the terraform version
    Version(version::VersionArgs),
}

/// Load configuration, with environment overrides applied.
pub fn load_config(global: &GlobalArgs) -> Result<CliConfig> {
    let config = CliConfig::load(global.config.as_deref())?.with_env_overrides()?;
    Ok(config)
}

/// Build a client from flags and configuration; flags win.
pub fn build_client(global: &GlobalArgs, config: &CliConfig) -> Result<Terraform> {
    let working_dir = global
        .dir
        .clone()
        .or_else(|| config.working_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    let exec_path = global
        .exec_path
        .clone()
        .or_else(|| config.exec_path.clone())
        .unwrap_or_default();

    let runner = if config.stream_logs {
        LocalRunner::new().with_log_handler(Arc::new(|line: LogLine| match line.stream {
            LogStream::Stdout => println!("{}", line.message),
            LogStream::Stderr => eprintln!("{}", line.message),
        }))
    } else {
        LocalRunner::new()
    };

    let mut tf = Terraform::with_parts(&working_dir, exec_path, Arc::new(ProcessEnv), Arc::new(runner))
        .with_context(|| format!("failed to initialise terraform in {}", working_dir.display()))?;

    tf.set_run_config(
        RunConfig::default()
            .timeout(config.timeout_seconds)
            .stream_logs(config.stream_logs),
    );

    if let Some(env) = &config.env {
        tf.set_env(env.clone());
    }

    if global.verbose {
        tf.set_logger(Arc::new(|line: &str| eprintln!("{}", line)));
    }

    Ok(tf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_flags_override_config() {
        let flag_dir = tempdir().unwrap();
        let config_dir = tempdir().unwrap();

        let global = GlobalArgs {
            dir: Some(flag_dir.path().to_path_buf()),
            exec_path: Some(PathBuf::from("/flag/terraform")),
            ..Default::default()
        };
        let config = CliConfig {
            working_dir: Some(config_dir.path().to_path_buf()),
            exec_path: Some(PathBuf::from("/config/terraform")),
            timeout_seconds: 45,
            ..Default::default()
        };

        let tf = build_client(&global, &config).unwrap();

        assert_eq!(tf.working_dir(), flag_dir.path());
        assert_eq!(tf.exec_path(), std::path::Path::new("/flag/terraform"));
        assert_eq!(tf.run_config().timeout_seconds, 45);
    }

    #[test]
    fn test_config_env_replaces_environment() {
        let dir = tempdir().unwrap();
        let global = GlobalArgs {
            dir: Some(dir.path().to_path_buf()),
            exec_path: Some(PathBuf::from("terraform")),
            ..Default::default()
        };
        let config = CliConfig {
            env: Some([("AWS_PROFILE".to_string(), "prod".to_string())].into()),
            ..Default::default()
        };

        let tf = build_client(&global, &config).unwrap();
        let env = tf.env().unwrap();

        assert_eq!(env.get("AWS_PROFILE").map(String::as_str), Some("prod"));
        assert!(env.contains_key("CHECKPOINT_DISABLE"));
        assert!(!env.contains_key("PATH"));
    }

    #[test]
    fn test_missing_exec_path_is_reported() {
        let dir = tempdir().unwrap();
        let global = GlobalArgs {
            dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };

        let err = build_client(&global, &CliConfig::default()).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<tfwrap_core::TfError>(),
            Some(tfwrap_core::TfError::NoSuitableBinary(_))
        ));
    }

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "tfwrap",
            "plan",
            "--dir",
            "/srv/infra",
            "--exec-path",
            "/usr/bin/terraform",
            "-v",
        ])
        .unwrap();

        assert_eq!(cli.global.dir, Some(PathBuf::from("/srv/infra")));
        assert_eq!(cli.global.exec_path, Some(PathBuf::from("/usr/bin/terraform")));
        assert!(cli.global.verbose);
        assert!(matches!(cli.command, Commands::Plan(_)));
    }
}
