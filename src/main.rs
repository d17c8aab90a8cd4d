use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Notify;

use fixture_server::{
    config::{self, FixtureConfig},
    logger::{self, LogTag},
    FixtureServer,
};

/// Fault-injecting HTTP + WebSocket fixture server for end-to-end UI tests
#[derive(Debug, Parser)]
#[command(name = "fixture-server", version, about)]
struct Cli {
    /// Port to listen on (0 picks an ephemeral port)
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory served for non-API paths and the image routes
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Enable debug logs for a tag (system, webserver, faults, ws, correlation, all)
    #[arg(long, value_name = "TAG")]
    debug: Vec<String>,

    /// Print verbose logs
    #[arg(short, long)]
    verbose: bool,

    /// Only print warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn resolve_config(&self) -> anyhow::Result<FixtureConfig> {
        let mut config = match &self.config {
            Some(path) => config::load_config_from_path(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => FixtureConfig::default(),
        };

        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dir) = &self.static_dir {
            config.server.static_dir = Some(dir.clone());
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logger::init(&cli.debug, cli.verbose, cli.quiet);

    let config = cli.resolve_config()?;
    let port = config.server.port;

    let shutdown = Arc::new(Notify::new());
    let signal = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        signal.notify_one();
    })
    .context("installing Ctrl+C handler")?;

    let mut server = FixtureServer::new(config);
    server.start(port).await?;

    shutdown.notified().await;
    logger::info(LogTag::System, "Received Ctrl+C, shutting down...");

    server.stop().await;
    Ok(())
}
