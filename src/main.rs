use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use xserver::config::ServerConfig;
use xserver::server::Server;

#[derive(Parser, Debug)]
#[command(name = "xserver")]
#[command(about = "X Protocol connection and session server")]
#[command(version)]
struct Args {
    /// YAML configuration file
    #[arg(short, long, env = "XSERVER_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides the config file)
    #[arg(long)]
    listen_address: Option<String>,

    /// Port to listen on (overrides the config file)
    #[arg(long)]
    listen_port: Option<u16>,

    /// Log at debug level regardless of RUST_LOG
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::from_env()?,
    };
    if let Some(address) = args.listen_address {
        config.listen_address = address;
    }
    if let Some(port) = args.listen_port {
        config.listen_port = port;
    }

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.log_level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    for var in &config.env_overrides {
        debug!(var, "applied environment override");
    }
    if config.users.is_empty() {
        warn!("no users configured, every login will be refused");
    }

    let options = config.server_options()?;
    info!(
        mechanisms = ?options.mechanisms,
        max_connections = options.max_connections,
        "starting xserver"
    );

    let listener = TcpListener::bind(config.listen_addr()).await?;
    let server = Server::new(listener, Arc::new(config.backend()), options);

    server
        .serve_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!("stopped");
    Ok(())
}
