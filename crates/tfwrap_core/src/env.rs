//! Subprocess environment handling.
//!
//! The ambient process environment is reached only through an
//! [`EnvProvider`], so environment construction stays deterministic under
//! test. [`build_env`] produces the final `KEY=VALUE` list for one invocation.

use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;

use tracing::warn;

/// Opt-out for the checkpoint (telemetry / update check) service.
pub const CHECKPOINT_DISABLE_ENV_VAR: &str = "CHECKPOINT_DISABLE";
/// Terraform's internal log level.
pub const LOG_ENV_VAR: &str = "TF_LOG";
/// Interactive input toggle.
pub const INPUT_ENV_VAR: &str = "TF_INPUT";
/// Automation mode; suppresses hints aimed at humans.
pub const AUTOMATION_ENV_VAR: &str = "TF_IN_AUTOMATION";

/// Variables forced on every invocation, with their values.
///
/// Logging would pollute stderr, and input or human hints would block or
/// clutter a machine-driven run. Caller values for these keys are discarded.
pub const FORCED_ENV_VARS: [(&str, &str); 3] = [
    (LOG_ENV_VAR, ""),
    (INPUT_ENV_VAR, "0"),
    (AUTOMATION_ENV_VAR, "1"),
];

/// Source of the ambient process environment.
#[cfg_attr(test, mockall::automock)]
pub trait EnvProvider: Send + Sync {
    /// All variables as raw `KEY=VALUE` entries.
    fn environ(&self) -> Vec<String>;

    /// A single variable, `None` when unset.
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads the real environment of the current process.
///
/// Variables whose name or value is not valid UTF-8 are treated as unset
/// rather than passed on in lossy form.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvProvider for ProcessEnv {
    fn environ(&self) -> Vec<String> {
        std::env::vars_os()
            .filter_map(|(key, value)| utf8_entry(key, value))
            .collect()
    }

    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

fn utf8_entry(key: OsString, value: OsString) -> Option<String> {
    match (key.into_string(), value.into_string()) {
        (Ok(key), Ok(value)) => Some(format!("{}={}", key, value)),
        (Ok(key), Err(_)) => {
            warn!("Skipping environment variable {} with a non UTF-8 value", key);
            None
        }
        (Err(key), _) => {
            warn!(
                "Skipping environment variable with a non UTF-8 name {}",
                key.to_string_lossy()
            );
            None
        }
    }
}

/// A fixed environment, mostly useful in tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticEnv {
    vars: BTreeMap<String, String>,
}

impl StaticEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw `KEY=VALUE` entries.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            vars: parse_environ(entries).into_iter().collect(),
        }
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

impl EnvProvider for StaticEnv {
    fn environ(&self) -> Vec<String> {
        self.vars.iter().map(|(k, v)| format!("{}={}", k, v)).collect()
    }

    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

/// Parse `KEY=VALUE` entries into a map.
///
/// Entries are split on the first `=`. An entry without `=` maps to an empty
/// value; empty entries are skipped. Later duplicates win.
pub fn parse_environ<I, S>(entries: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entries
        .into_iter()
        .filter_map(|entry| {
            let entry = entry.as_ref();
            if entry.is_empty() {
                return None;
            }
            Some(match entry.split_once('=') {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => (entry.to_string(), String::new()),
            })
        })
        .collect()
}

/// Inject `CHECKPOINT_DISABLE` from the ambient environment unless the map
/// already sets it. An unset ambient value is injected as an empty string.
pub fn propagate_checkpoint_disable(env: &mut HashMap<String, String>, provider: &dyn EnvProvider) {
    if !env.contains_key(CHECKPOINT_DISABLE_ENV_VAR) {
        env.insert(
            CHECKPOINT_DISABLE_ENV_VAR.to_string(),
            provider.var(CHECKPOINT_DISABLE_ENV_VAR).unwrap_or_default(),
        );
    }
}

/// Compute the environment for one invocation.
///
/// `stored` is the handle's environment; `None` means the ambient
/// environment is read fresh. The result is sorted by key.
pub fn build_env(stored: Option<&HashMap<String, String>>, provider: &dyn EnvProvider) -> Vec<String> {
    let mut env = match stored {
        Some(stored) => stored.clone(),
        None => parse_environ(provider.environ()),
    };

    propagate_checkpoint_disable(&mut env, provider);

    for (key, value) in FORCED_ENV_VARS {
        env.insert(key.to_string(), value.to_string());
    }

    let sorted: BTreeMap<_, _> = env.into_iter().collect();
    sorted
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect()
}
