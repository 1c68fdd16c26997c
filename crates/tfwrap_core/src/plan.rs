//! `terraform plan`.

use tfwrap_runner::{CancellationToken, CommandSpec, ExecutionResult};
use tracing::info;

use crate::error::TfResult;
use crate::options::{PlanConfig, PlanOption};
use crate::terraform::Terraform;

impl Terraform {
    /// Run `terraform plan` with the given options.
    ///
    /// A nonzero exit is returned as [`TfError::ExitStatus`](crate::TfError::ExitStatus);
    /// cancelling `cancel` kills the process.
    pub async fn plan<I>(&self, cancel: &CancellationToken, opts: I) -> TfResult<ExecutionResult>
    where
        I: IntoIterator<Item = PlanOption>,
    {
        info!("Running terraform plan in {}", self.working_dir().display());
        self.run_terraform_cmd(self.plan_cmd(cancel, opts)).await
    }

    /// Build the `plan` descriptor without running it.
    pub fn plan_cmd<I>(&self, cancel: &CancellationToken, opts: I) -> CommandSpec
    where
        I: IntoIterator<Item = PlanOption>,
    {
        let config = PlanConfig::from_options(opts);
        self.build_terraform_cmd(cancel, config.to_args())
    }
}
