use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use netdash::config::NetdashConfig;
use netdash::server::DashboardServer;
use netdash::telemetry;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "netdash")]
#[command(about = "Network diagnostics dashboard backend", long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "netdash.toml")]
    config: String,

    /// Listen address override
    #[arg(long, env = "NETDASH_LISTEN_ADDR")]
    listen_addr: Option<String>,

    /// Log level override
    #[arg(long, env = "NETDASH_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut cfg = if Path::new(&args.config).exists() {
        NetdashConfig::load(&args.config)?
    } else {
        NetdashConfig::default()
    };

    if let Some(listen_addr) = args.listen_addr {
        cfg.listen_addr = listen_addr;
    }
    if let Some(log_level) = args.log_level {
        cfg.log_level = log_level;
    }

    let _guard = telemetry::init(&cfg);
    info!("Starting netdash with configuration: {:?}", cfg);

    let server = DashboardServer::new(Arc::new(cfg))?;
    server.run().await?;

    Ok(())
}
