//! # tfwrap_core
//!
//! Typed command builders for the Terraform CLI.
//!
//! This crate turns typed options into exact Terraform argument lists and a
//! sanitized environment, producing descriptors that `tfwrap_runner` executes.
//! It does not discover or install the executable; callers pass its path.
//!
//! ## Features
//!
//! - Client handle bound to one working directory and executable
//! - Environment builder that always disables logging, input and human hints
//! - `plan` options with fixed argument order and documented defaults
//! - Cached version detection
//!
//! ## Example
//!
//! ```rust,no_run
//! use tfwrap_core::{PlanOption, Terraform};
//! use tfwrap_runner::CancellationToken;
//!
//! # async fn run() -> tfwrap_core::TfResult<()> {
//! let tf = Terraform::new("./infrastructure", "/usr/local/bin/terraform")?;
//! let cancel = CancellationToken::new();
//!
//! let cmd = tf.plan_cmd(&cancel, [PlanOption::out("tfplan"), PlanOption::target("module.vpc")]);
//! println!("{}", cmd);
//!
//! let result = tf.plan(&cancel, [PlanOption::refresh(false)]).await?;
//! println!("{}", result.stdout);
//! # Ok(())
//! # }
//! ```

pub mod env;
pub mod error;
pub mod options;
pub mod plan;
pub mod terraform;
pub mod version;

pub use env::{build_env, parse_environ, EnvProvider, ProcessEnv, StaticEnv};
pub use error::{TfError, TfResult};
pub use options::{PlanConfig, PlanOption};
pub use terraform::{LogSink, Terraform};
pub use version::TerraformVersion;
