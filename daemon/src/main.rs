//! Tip selection daemon: entry point for running a tip selection node.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use tipsel_node::{init_logging, NodeConfig, TipselNode};
use tipsel_oracle::ConsistencyMethod;

#[derive(Parser)]
#[command(name = "tipsel-daemon", about = "Weighted random-walk tip selection service")]
struct Cli {
    /// Upstream event feed (WebSocket URL).
    #[arg(long, env = "TIPSEL_UPSTREAM_URL")]
    upstream_url: Option<String>,

    /// Node RPC used for consistency checks.
    #[arg(long, env = "TIPSEL_NODE_URL")]
    node_url: Option<String>,

    /// Port of the HTTP front end.
    #[arg(long, env = "TIPSEL_HTTP_PORT")]
    http_port: Option<u16>,

    /// Number of milestones retained as the walk window.
    #[arg(long, env = "TIPSEL_MAX_DEPTH")]
    max_depth: Option<i64>,

    /// Walk bias toward heavily approved transactions.
    #[arg(long, env = "TIPSEL_ALPHA")]
    alpha: Option<f64>,

    /// Validate with `getBalances` instead of `checkConsistency`.
    #[arg(long)]
    get_balances: bool,

    /// Disable the Prometheus metrics endpoint.
    #[arg(long)]
    no_metrics: bool,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "TIPSEL_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "TIPSEL_LOG_FORMAT")]
    log_format: Option<String>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Manage the node.
    #[command(name = "node")]
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
    /// Print the effective configuration as TOML and exit.
    Config,
}

#[derive(clap::Subcommand)]
enum NodeAction {
    /// Run the node.
    Run,
}

impl Cli {
    /// File config (or defaults) with flags and env vars applied on top.
    fn node_config(&self) -> anyhow::Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let path = path.to_string_lossy();
                NodeConfig::from_toml_file(&path)
                    .with_context(|| format!("loading config file {path}"))?
            }
            None => NodeConfig::default(),
        };

        if let Some(url) = &self.upstream_url {
            config.upstream_url = url.clone();
        }
        if let Some(url) = &self.node_url {
            config.node_rpc_url = url.clone();
        }
        if let Some(port) = self.http_port {
            config.http_port = port;
        }
        if let Some(max_depth) = self.max_depth {
            config.max_depth = max_depth;
        }
        if let Some(alpha) = self.alpha {
            config.alpha = alpha;
        }
        if self.get_balances {
            config.consistency_method = ConsistencyMethod::GetBalances;
        }
        if self.no_metrics {
            config.enable_metrics = false;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.log_format = format.clone();
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.node_config()?;

    match cli.command {
        Command::Config => {
            print!("{}", config.to_toml_string()?);
        }
        Command::Node { action } => match action {
            NodeAction::Run => {
                init_logging(config.log_format()?, &config.log_level)?;
                tracing::info!(
                    upstream = %config.upstream_url,
                    node = %config.node_rpc_url,
                    http_port = config.http_port,
                    metrics = config.enable_metrics,
                    "starting tip selection node"
                );

                let mut node = TipselNode::new(config)?;
                node.start().await?;

                node.shutdown.wait_for_signal().await;
                tracing::info!("shutdown signal received, stopping node");
                node.stop().await?;

                tracing::info!("tipsel daemon exited cleanly");
            }
        },
    }

    Ok(())
}
