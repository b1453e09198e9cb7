use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ida_server::api::{LogSink, build_app};
use ida_server::config::Config;

#[derive(Debug, Parser)]
#[command(name = "ida-server", version, about = "Serves Ida's HTTP API")]
struct Cli {
    /// Overrides HOST
    #[arg(long)]
    host: Option<String>,

    /// Overrides PORT
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "ida_server=info".into()))
        .init();

    let mut config = Config::from_env().context("loading configuration")?;
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    let app = build_app(&config, LogSink)?;
    app.serve(&config.host, config.port).await?;
    tracing::info!("server shut down");

    Ok(())
}
