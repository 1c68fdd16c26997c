//! Version command - Show the terraform version.

use anyhow::Result;
use clap::Args;
use tfwrap_core::TerraformVersion;
use tfwrap_runner::CancellationToken;

use super::{build_client, load_config, GlobalArgs};

#[derive(Args, Debug, Default)]
pub struct VersionArgs {
    /// Print the version as JSON
    #[arg(long)]
    json: bool,
}

pub async fn execute(global: &GlobalArgs, args: VersionArgs, cancel: &CancellationToken) -> Result<()> {
    let config = load_config(global)?;
    let tf = build_client(global, &config)?;

    let version = tf.version(cancel, false).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&version)?);
    } else {
        print!("{}", render(&version));
    }

    Ok(())
}

fn render(version: &TerraformVersion) -> String {
    let mut out = format!("Terraform v{}\n", version.version);
    if let Some(platform) = &version.platform {
        out.push_str(&format!("on {}\n", platform));
    }
    for (provider, v) in &version.provider_selections {
        out.push_str(&format!("+ provider {} v{}\n", provider, v));
    }
    out
}
