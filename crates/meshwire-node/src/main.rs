// ============================================
// File: crates/meshwire-node/src/main.rs
// ============================================
//! # meshwire Node Entry Point
//!
//! ## Creation Reason
//! Main entry point for the meshwire node binary.
//! Handles CLI parsing, logging setup, and node start-up.
//!
//! ## Usage
//! ```bash
//! meshwire-node start --config /etc/meshwire/node.toml
//! meshwire-node validate --config /etc/meshwire/node.toml
//! meshwire-node node-id
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - `RUST_LOG` overrides the configured log level
//! - A fresh node id is generated on every start
//!
//! ## Last Modified
//! v0.1.0 - Initial CLI implementation

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use meshwire_common::types::NodeId;
use meshwire_node::{Node, NodeConfig};

// ============================================
// CLI Definition
// ============================================

/// meshwire node-to-node protocol node
#[derive(Parser, Debug)]
#[command(name = "meshwire-node")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the node
    Start {
        /// Path to configuration file
        #[arg(short, long, default_value = "/etc/meshwire/node.toml")]
        config: PathBuf,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "/etc/meshwire/node.toml")]
        config: PathBuf,
    },

    /// Print a freshly generated node id
    NodeId,
}

// ============================================
// Main
// ============================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Start { config } => cmd_start(config).await,
        Commands::Validate { config } => cmd_validate(config).await,
        Commands::NodeId => {
            println!("{}", NodeId::generate());
            Ok(())
        }
    };

    if let Err(e) = result {
        init_logging("error");
        error!("{}", e);
        std::process::exit(1);
    }
}

// ============================================
// Commands
// ============================================

/// Starts the node.
async fn cmd_start(config_path: PathBuf) -> anyhow::Result<()> {
    let config = load_or_default_config(&config_path).await?;
    init_logging(&config.logging.level);

    let node_id = NodeId::generate();
    info!("════════════════════════════════════════");
    info!("Node ID:    {}", node_id);
    info!("Listen:     {}", config.network.listen_addr);
    info!("App ID:     {}", config.middleman.app_identifier);
    info!("════════════════════════════════════════");

    let node = Node::new(config, node_id)?;
    node.run().await?;

    Ok(())
}

/// Validates configuration file.
async fn cmd_validate(config_path: PathBuf) -> anyhow::Result<()> {
    if !config_path.exists() {
        println!("⚠️  Config file not found: {}", config_path.display());
        println!("   Node will use default values.");
        return Ok(());
    }

    let config = NodeConfig::load(&config_path).await?;

    println!("✅ Configuration is valid");
    println!();
    println!("Network:");
    println!("   Listen:     {}", config.network.listen_addr);
    for peer in &config.network.peers {
        println!("   Peer:       {}", peer);
    }
    println!();
    println!("Middleman:");
    println!("   App ID:     {}", config.middleman.app_identifier);
    match config.heartbeat_interval() {
        Some(period) => println!("   Heartbeat:  {}ms", period.as_millis()),
        None => println!("   Heartbeat:  disabled"),
    }
    println!("   Max Payload: {} bytes", config.middleman.max_payload_len);
    println!();
    println!("{}", config.to_toml());

    Ok(())
}

// ============================================
// Helper Functions
// ============================================

/// Initializes the tracing subscriber.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .ok();
}

/// Loads config, or defaults if the file does not exist.
async fn load_or_default_config(path: &Path) -> anyhow::Result<NodeConfig> {
    if path.exists() {
        Ok(NodeConfig::load(path).await?)
    } else {
        init_logging("info");
        info!("Config file not found, using defaults");
        Ok(NodeConfig::default())
    }
}
