//! tfwrap CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments or configuration
//! - 3: Terraform exited with an error
//! - 4: Cancelled

use std::process::ExitCode;

use clap::Parser;
use tfwrap_core::TfError;
use tfwrap_runner::CancellationToken;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;

use commands::{Cli, Commands};
use config::ConfigError;

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const TERRAFORM_ERROR: u8 = 3;
    pub const CANCELLED: u8 = 4;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping terraform");
            on_interrupt.cancel();
        }
    });

    let result = match cli.command {
        Commands::Plan(args) => commands::plan::execute(&cli.global, args, &cancel).await,
        Commands::Version(args) => commands::version::execute(&cli.global, args, &cancel).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Install the stderr subscriber. A subscriber that is already set is kept.
fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "tfwrap=debug,warn"
    } else {
        "tfwrap=info,warn"
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .try_init();
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    if let Some(err) = e.downcast_ref::<TfError>() {
        return match err {
            _ if err.is_cancelled() => ExitCodes::CANCELLED,
            TfError::ExitStatus { .. } => ExitCodes::TERRAFORM_ERROR,
            TfError::MissingWorkingDir
            | TfError::WorkingDirInaccessible { .. }
            | TfError::NoSuitableBinary(_) => ExitCodes::INVALID_ARGS,
            _ => ExitCodes::GENERAL_ERROR,
        };
    }

    if e.downcast_ref::<ConfigError>().is_some() {
        return ExitCodes::INVALID_ARGS;
    }

    ExitCodes::GENERAL_ERROR
}
