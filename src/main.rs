use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use zonekeeper::config::AdminConfig;
use zonekeeper::http_server::HttpServer;

/// HTTP administration API for BIND zone files
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to serve the admin API on, overriding the configuration
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Log filter, e.g. `debug` or `zonekeeper=trace`. Defaults to RUST_LOG, then `info`
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let filter = match &args.log_level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = match AdminConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }

    info!(
        "Managing zones in {} declared in {}",
        config.nameserver.zone_dir.display(),
        config.nameserver.config_file.display()
    );

    HttpServer::from_config(&config).start().await
}
