//! Typed options for the `plan` subcommand.
//!
//! Options are applied in the order given to a [`PlanConfig`]. Singular
//! options overwrite earlier values; repeatable options (`Target`, `Var`)
//! append. Argument order is fixed by [`PlanConfig::to_args`] and does not
//! depend on the order options were supplied in.

use serde::{Deserialize, Serialize};

/// Default `-lock-timeout` value.
pub const DEFAULT_LOCK_TIMEOUT: &str = "0s";
/// Default `-parallelism` value.
pub const DEFAULT_PARALLELISM: u32 = 10;

/// A single configurable `plan` flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "option", content = "value")]
pub enum PlanOption {
    /// Plan a destroy; emitted as bare `-destroy` when true
    Destroy(bool),
    /// Hold the state lock
    Lock(bool),
    /// Duration string such as `"30s"`
    LockTimeout(String),
    /// Path the plan is written to
    Out(String),
    /// Concurrent operations limit
    Parallelism(u32),
    /// Refresh state before planning
    Refresh(bool),
    /// Path of the state file
    State(String),
    /// Resource address, repeatable
    Target(String),
    /// `name=value` assignment, repeatable
    Var(String),
    /// Path of a variable definitions file
    VarFile(String),
}

impl PlanOption {
    pub fn destroy(destroy: bool) -> Self {
        Self::Destroy(destroy)
    }

    pub fn lock(lock: bool) -> Self {
        Self::Lock(lock)
    }

    pub fn lock_timeout(timeout: impl Into<String>) -> Self {
        Self::LockTimeout(timeout.into())
    }

    pub fn out(path: impl Into<String>) -> Self {
        Self::Out(path.into())
    }

    pub fn parallelism(n: u32) -> Self {
        Self::Parallelism(n)
    }

    pub fn refresh(refresh: bool) -> Self {
        Self::Refresh(refresh)
    }

    pub fn state(path: impl Into<String>) -> Self {
        Self::State(path.into())
    }

    pub fn target(address: impl Into<String>) -> Self {
        Self::Target(address.into())
    }

    /// A raw `name=value` assignment.
    pub fn var(assignment: impl Into<String>) -> Self {
        Self::Var(assignment.into())
    }

    /// An assignment built from its two halves.
    pub fn var_pair(name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        Self::Var(format!("{}={}", name.as_ref(), value.as_ref()))
    }

    pub fn var_file(path: impl Into<String>) -> Self {
        Self::VarFile(path.into())
    }

    /// Apply this option to the configuration.
    pub fn configure(self, config: &mut PlanConfig) {
        match self {
            Self::Destroy(v) => config.destroy = v,
            Self::Lock(v) => config.lock = v,
            Self::LockTimeout(v) => config.lock_timeout = v,
            Self::Out(v) => config.out = Some(v),
            Self::Parallelism(v) => config.parallelism = v,
            Self::Refresh(v) => config.refresh = v,
            Self::State(v) => config.state = Some(v),
            Self::Target(v) => config.targets.push(v),
            Self::Var(v) => config.vars.push(v),
            Self::VarFile(v) => config.var_file = Some(v),
        }
    }
}

/// Resolved `plan` settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanConfig {
    pub destroy: bool,
    pub lock: bool,
    pub lock_timeout: String,
    pub out: Option<String>,
    pub parallelism: u32,
    pub refresh: bool,
    pub state: Option<String>,
    pub targets: Vec<String>,
    pub vars: Vec<String>,
    pub var_file: Option<String>,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            destroy: false,
            lock: true,
            lock_timeout: DEFAULT_LOCK_TIMEOUT.to_string(),
            out: None,
            parallelism: DEFAULT_PARALLELISM,
            refresh: true,
            state: None,
            targets: Vec::new(),
            vars: Vec::new(),
            var_file: None,
        }
    }
}

impl PlanConfig {
    /// Start from the defaults and apply each option in order.
    pub fn from_options<I>(opts: I) -> Self
    where
        I: IntoIterator<Item = PlanOption>,
    {
        let mut config = Self::default();
        for opt in opts {
            opt.configure(&mut config);
        }
        config
    }

    /// Render the full argument list, subcommand first.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "plan".to_string(),
            "-no-color".to_string(),
            format!("-lock-timeout={}", self.lock_timeout),
        ];

        // string opts: only pass if set
        if let Some(out) = &self.out {
            args.push(format!("-out={}", out));
        }
        if let Some(state) = &self.state {
            args.push(format!("-state={}", state));
        }
        if let Some(var_file) = &self.var_file {
            args.push(format!("-var-file={}", var_file));
        }

        args.push(format!("-lock={}", self.lock));
        args.push(format!("-parallelism={}", self.parallelism));
        args.push(format!("-refresh={}", self.refresh));

        if self.destroy {
            args.push("-destroy".to_string());
        }

        for target in &self.targets {
            args.push(format!("-target={}", target));
        }
        for var in &self.vars {
            args.push("-var".to_string());
            args.push(var.clone());
        }

        args
    }
}
