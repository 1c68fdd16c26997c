//! `terraform version` and the cached version of the executable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tfwrap_runner::{CancellationToken, CommandSpec};
use tracing::debug;

use crate::error::{TfError, TfResult};
use crate::terraform::Terraform;

/// Version of the executable and of the providers selected in the working
/// directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerraformVersion {
    #[serde(rename = "terraform_version")]
    pub version: String,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub provider_selections: BTreeMap<String, String>,
}

impl TerraformVersion {
    /// Parse `version -json` output, falling back to the plain text format
    /// printed by releases without JSON support.
    pub fn parse(output: &str) -> TfResult<Self> {
        let trimmed = output.trim();
        if trimmed.starts_with('{') {
            return serde_json::from_str(trimmed).map_err(|e| TfError::VersionParse(e.to_string()));
        }
        Self::parse_plaintext(trimmed)
    }

    fn parse_plaintext(output: &str) -> TfResult<Self> {
        let mut lines = output.lines().map(str::trim);

        let version = lines
            .next()
            .and_then(|line| line.strip_prefix("Terraform v"))
            .map(|v| v.split_whitespace().next().unwrap_or(v).to_string())
            .ok_or_else(|| TfError::VersionParse(format!("unexpected output: {:?}", output)))?;

        let mut platform = None;
        let mut provider_selections = BTreeMap::new();
        for line in lines {
            if let Some(p) = line.strip_prefix("on ") {
                platform = Some(p.to_string());
            } else if let Some(rest) = line.strip_prefix("+ provider") {
                // "+ provider.aws v2.70.0" or "+ provider registry.terraform.io/hashicorp/aws v3.0.0"
                let rest = rest.trim_start_matches(['.', ' ']);
                if let Some((name, v)) = rest.rsplit_once(' ') {
                    provider_selections.insert(name.to_string(), v.trim_start_matches('v').to_string());
                }
            }
        }

        Ok(Self {
            version,
            platform,
            provider_selections,
        })
    }
}

impl Terraform {
    /// Build the `version` descriptor without running it.
    pub fn version_cmd(&self, cancel: &CancellationToken) -> CommandSpec {
        self.build_terraform_cmd(cancel, ["version", "-json"])
    }

    /// Detect the executable's version.
    ///
    /// The result is cached on the handle. The cache lock is held while the
    /// command runs, so concurrent callers wait for a single detection.
    pub async fn version(&self, cancel: &CancellationToken, skip_cache: bool) -> TfResult<TerraformVersion> {
        let mut cache = self.version_cache.lock().await;

        if !skip_cache {
            if let Some(version) = cache.as_ref() {
                return Ok(version.clone());
            }
        }

        let result = self.run_terraform_cmd(self.version_cmd(cancel)).await?;
        let version = TerraformVersion::parse(&result.stdout)?;
        debug!("Detected terraform {}", version.version);

        *cache = Some(version.clone());
        Ok(version)
    }
}
