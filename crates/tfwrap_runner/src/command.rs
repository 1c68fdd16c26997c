//! Subprocess descriptor.

use std::path::PathBuf;

use crate::cancel::CancellationToken;

/// A fully resolved subprocess invocation.
///
/// Holds the program path, the ordered argument list, the complete
/// environment as `KEY=VALUE` entries, the working directory, and the token
/// whose cancellation terminates the process.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Executable to run
    pub program: PathBuf,
    /// Arguments, in the exact order they are passed
    pub args: Vec<String>,
    /// Complete environment as `KEY=VALUE` entries
    pub env: Vec<String>,
    /// Working directory of the child process
    pub working_dir: PathBuf,
    /// Cancelling this token kills the running process
    pub cancel: CancellationToken,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            working_dir: working_dir.into(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env_entry(mut self, entry: impl Into<String>) -> Self {
        self.env.push(entry.into());
        self
    }

    pub fn env(mut self, env: Vec<String>) -> Self {
        self.env = env;
        self
    }

    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Split the environment entries into key/value pairs.
    ///
    /// Each entry is split on its first `=`; an entry without `=` yields an
    /// empty value.
    pub fn env_pairs(&self) -> Vec<(String, String)> {
        self.env
            .iter()
            .filter(|entry| !entry.is_empty())
            .map(|entry| match entry.split_once('=') {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => (entry.clone(), String::new()),
            })
            .collect()
    }

    /// Look up a single environment value.
    pub fn env_value(&self, key: &str) -> Option<String> {
        self.env_pairs()
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.contains([' ', '=', '\'']) {
                write!(f, " '{}'", arg.replace('\'', r"'\''"))?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_keeps_argument_order() {
        let spec = CommandSpec::new("terraform", "/tmp")
            .arg("plan")
            .args(["-no-color", "-lock=true"]);

        assert_eq!(spec.args, vec!["plan", "-no-color", "-lock=true"]);
    }

    #[test]
    fn test_env_pairs_split_on_first_equals() {
        let spec = CommandSpec::new("terraform", "/tmp")
            .env_entry("A=1")
            .env_entry("B=x=y")
            .env_entry("NOVALUE")
            .env_entry("");

        assert_eq!(
            spec.env_pairs(),
            vec![
                ("A".to_string(), "1".to_string()),
                ("B".to_string(), "x=y".to_string()),
                ("NOVALUE".to_string(), String::new()),
            ]
        );
        assert_eq!(spec.env_value("B").as_deref(), Some("x=y"));
        assert_eq!(spec.env_value("MISSING"), None);
    }

    #[test]
    fn test_display_quotes_assignments() {
        let spec = CommandSpec::new("/usr/bin/terraform", "/tmp")
            .args(["plan", "-no-color", "-lock-timeout=0s", "-var", "a b"]);

        assert_eq!(
            spec.to_string(),
            "/usr/bin/terraform plan -no-color '-lock-timeout=0s' -var 'a b'"
        );
    }

    #[test]
    fn test_display_escapes_single_quotes() {
        let spec = CommandSpec::new("terraform", "/tmp").args(["-var", "owner=O'Brien", "it's"]);

        assert_eq!(
            spec.to_string(),
            r"terraform -var 'owner=O'\''Brien' 'it'\''s'"
        );
    }
}
