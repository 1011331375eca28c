//! Edgepass Web Server
//!
//! Issues presigned upload URLs and signed, tier-scoped content URLs.

use anyhow::Context;
use clap::Parser;
use edgepass_core::{init_logging, EdgepassConfig};
use edgepass_web::{EdgepassServer, WebConfig};
use std::path::PathBuf;
use tracing::info;

/// Edgepass Web Server - signed upload and content grants
#[derive(Parser)]
#[command(name = "edgepass-web")]
#[command(about = "Issue time-limited signed URLs for uploads and tiered content")]
#[command(version)]
struct Args {
    /// Server host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Server port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// TOML configuration file; environment variables override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load environment variables
    dotenvy::dotenv().ok();

    let mut config = match &args.config {
        Some(path) => {
            let mut config = EdgepassConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?;
            config.apply_env_overrides();
            config
        }
        None => EdgepassConfig::from_env(),
    };

    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    config.validate().context("invalid configuration")?;

    let mut web_config = WebConfig::from_env();
    if let Some(host) = args.host {
        web_config.host = host;
    }
    if let Some(port) = args.port {
        web_config.port = port;
    }

    info!(
        address = %web_config.address(),
        upload_bucket = %config.upload.bucket,
        content_bucket = %config.content.bucket,
        edge_domain = %config.edge.domain,
        "Starting edgepass web server"
    );

    let server: EdgepassServer = EdgepassServer::builder()
        .web_config(web_config)
        .build(config)
        .context("failed to build server")?;

    server.start().await.context("server failed")?;

    Ok(())
}
