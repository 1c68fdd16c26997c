//! Plan command - Run terraform plan.

use anyhow::Result;
use clap::Args;
use tfwrap_core::PlanOption;
use tfwrap_runner::CancellationToken;
use tracing::info;

use super::{build_client, load_config, GlobalArgs};

#[derive(Args, Debug, Default)]
pub struct PlanArgs {
    /// Plan a destroy of all managed resources
    #[arg(long)]
    destroy: bool,

    /// Do not hold the state lock
    #[arg(long)]
    no_lock: bool,

    /// How long to retry acquiring the state lock (e.g. 30s)
    #[arg(long, value_name = "DURATION")]
    lock_timeout: Option<String>,

    /// Write the plan to this path
    #[arg(long, value_name = "PATH")]
    out: Option<String>,

    /// Limit the number of concurrent operations
    #[arg(long)]
    parallelism: Option<u32>,

    /// Skip refreshing state before planning
    #[arg(long)]
    no_refresh: bool,

    /// Path of the state file
    #[arg(long, value_name = "PATH")]
    state: Option<String>,

    /// Resource address to target (repeatable)
    #[arg(long = "target", value_name = "ADDRESS")]
    targets: Vec<String>,

    /// Variable assignment NAME=VALUE (repeatable)
    #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_var)]
    vars: Vec<String>,

    /// Variable definitions file
    #[arg(long, value_name = "PATH")]
    var_file: Option<String>,

    /// Kill terraform after this many seconds (overrides config)
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Print the command instead of running it
    #[arg(long)]
    dry_run: bool,
}

fn parse_var(s: &str) -> Result<String, String> {
    match s.split_once('=') {
        Some((name, _)) if !name.is_empty() => Ok(s.to_string()),
        _ => Err(format!("expected NAME=VALUE, got '{}'", s)),
    }
}

impl PlanArgs {
    /// Translate flags into options, appended after `defaults`.
    ///
    /// Only flags that were given produce an option, so config defaults are
    /// not reset by absent flags.
    pub fn to_options(&self, defaults: &[PlanOption]) -> Vec<PlanOption> {
        let mut opts = defaults.to_vec();

        if self.destroy {
            opts.push(PlanOption::destroy(true));
        }
        if self.no_lock {
            opts.push(PlanOption::lock(false));
        }
        if let Some(timeout) = &self.lock_timeout {
            opts.push(PlanOption::lock_timeout(timeout));
        }
        if let Some(out) = &self.out {
            opts.push(PlanOption::out(out));
        }
        if let Some(n) = self.parallelism {
            opts.push(PlanOption::parallelism(n));
        }
        if self.no_refresh {
            opts.push(PlanOption::refresh(false));
        }
        if let Some(state) = &self.state {
            opts.push(PlanOption::state(state));
        }
        opts.extend(self.targets.iter().map(PlanOption::target));
        opts.extend(self.vars.iter().map(PlanOption::var));
        if let Some(var_file) = &self.var_file {
            opts.push(PlanOption::var_file(var_file));
        }

        opts
    }
}

pub async fn execute(global: &GlobalArgs, args: PlanArgs, cancel: &CancellationToken) -> Result<()> {
    let config = load_config(global)?;
    let mut tf = build_client(global, &config)?;
    if let Some(secs) = args.timeout {
        let run_config = tf.run_config().clone().timeout(secs);
        tf.set_run_config(run_config);
    }
    let opts = args.to_options(&config.plan_defaults);

    if args.dry_run {
        let cmd = tf.plan_cmd(cancel, opts);
        println!("{}", cmd);
        if global.verbose {
            for entry in &cmd.env {
                println!("  {}", entry);
            }
        }
        return Ok(());
    }

    info!("Planning in {}", tf.working_dir().display());
    let result = tf.plan(cancel, opts).await?;

    if !config.stream_logs {
        print!("{}", result.stdout);
    }
    info!("Plan finished in {}ms", result.duration_ms);

    Ok(())
}
