//! Start command - launches the Ymir server.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use tracing::info;
use ymir_server::{AppState, Server};

use super::Context;

/// Arguments for the start command.
///
/// CLI arguments override config file and environment values.
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind to (overrides config)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Path to config file (overrides default discovery)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Run the start command.
pub async fn run(args: StartArgs, ctx: &Context) -> Result<()> {
    let loaded = super::load(args.config.as_deref())?;
    if ctx.verbose {
        for path in loaded.loaded_from() {
            println!("Loaded config: {}", path.display());
        }
    }

    let mut resolved = loaded.config.resolve()?;
    resolved.bind_address = bind_override(resolved.bind_address, args.bind.as_deref(), args.port)?;

    let state = AppState::from_resolved(&resolved)?;
    let server = Server::new(state);

    info!(
        bind = %resolved.bind_address,
        app_url = %resolved.app_url,
        auth_url = %resolved.auth_url,
        api_url = %resolved.api_url,
        logout_strategy = %resolved.logout_strategy,
        "Starting Ymir"
    );
    println!("Ymir listening on http://{}", resolved.bind_address);

    server.run_with_shutdown(shutdown_signal()).await?;
    Ok(())
}

/// Apply `--bind` and `--port` on top of the configured address.
fn bind_override(configured: SocketAddr, bind: Option<&str>, port: Option<u16>) -> Result<SocketAddr> {
    let mut addr = match bind {
        Some(bind) => match bind.parse::<SocketAddr>() {
            Ok(addr) => addr,
            Err(_) => {
                let ip = bind
                    .parse()
                    .with_context(|| format!("Invalid bind address '{}'", bind))?;
                SocketAddr::new(ip, configured.port())
            }
        },
        None => configured,
    };
    if let Some(port) = port {
        addr.set_port(port);
    }
    Ok(addr)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
