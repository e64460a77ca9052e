use std::net::SocketAddr;

use anyhow::Result;
use clap::Parser;
use pose_coach::config::{Config, RuntimeConfig};
use tracing::info;

#[derive(Parser)]
#[command(name = "pose-coach")]
#[command(about = "Real-time exercise form coaching server", long_about = None)]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, env = "POSE_COACH_CONFIG", default_value = "pose_coach.toml")]
    config: String,
    /// Listen address, overrides config and env
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // logging first, so config warnings are not lost
    pose_coach::load_env();
    pose_coach::init_tracing(&RuntimeConfig::load_from_env().log_level);

    let mut config = Config::load_from(&cli.config).map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }

    info!("Starting pose-coach server");
    info!(
        "Configuration loaded: bind={}, db={}, model={}",
        config.server.bind, config.storage.database_path, config.model.model
    );

    pose_coach::http::start_http_server(config).await?;
    Ok(())
}
