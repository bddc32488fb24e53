//! Config command - show the resolved configuration.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Path to config file (overrides default discovery)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, _ctx: &Context) -> Result<()> {
    let loaded = super::load(args.config.as_deref())?;

    println!("# Ymir Configuration\n");

    println!("Config file search order (later overrides earlier):");
    for source in &loaded.sources {
        let status = if source.loaded {
            "✓ loaded"
        } else {
            "· not found"
        };
        println!("  {} {}", status, source.path.display());
    }
    println!("  + environment variables\n");

    let resolved = loaded.config.resolve()?;
    println!("{}", resolved);

    Ok(())
}
