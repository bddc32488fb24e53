//! CLI command handlers.

pub mod config;
pub mod start;

use std::path::Path;

use anyhow::Result;
use ymir_config::LoadedConfig;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Verbose output enabled.
    pub verbose: bool,
}

/// Load configuration and print any loader warnings.
pub fn load(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let loaded = ymir_config::load_config(explicit)?;
    for warning in &loaded.warnings {
        eprintln!("warning: {}", warning);
    }
    Ok(loaded)
}
