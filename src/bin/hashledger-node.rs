#![forbid(unsafe_code)]
//! Run a hashledger node and its HTTP API.

use clap::Parser;
use hashledger::api::run_api_server;
use hashledger::config::{load_config_from, DEFAULT_CONFIG_PATH};
use hashledger::node::NodeService;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "hashledger-node", version, about = "Run a hashledger node")]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Address to bind, overrides network.host
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, overrides network.port and PORT
    #[arg(short, long)]
    port: Option<u16>,

    /// Leading zeros required by proof of work, overrides miner.difficulty
    #[arg(short, long)]
    difficulty: Option<u32>,

    /// Extra peer to register at startup; may be repeated
    #[arg(long = "peer")]
    peers: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = load_config_from(&args.config)?;

    if let Some(host) = args.host {
        config.network.host = host;
    }
    if let Some(port) = args.port {
        config.network.port = port;
    }
    if let Some(difficulty) = args.difficulty {
        config.miner.difficulty = difficulty;
    }
    config.network.bootstrap_peers.extend(args.peers);
    config.validate()?;

    let addr = tokio::net::lookup_host((config.network.host.as_str(), config.network.port))
        .await?
        .next()
        .ok_or_else(|| format!("could not resolve {}", config.network.host))?;
    let node = Arc::new(NodeService::from_config(&config).await?);

    info!(
        difficulty = config.miner.difficulty,
        peers = node.peer_list().await.len(),
        "starting hashledger node"
    );

    run_api_server(node, addr).await
}
