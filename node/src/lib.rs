//! Tip selection node: runs the ingest and request sides of the service.
//!
//! The node is the coordinator that:
//! - Reads `tx`/`sn` frames from the upstream feed into the tangle
//! - Reconnects the feed when it drops, keeping tangle state
//! - Serves tip pairs over HTTP, validated against the node RPC
//! - Exposes store status and Prometheus metrics
//! - Shuts down gracefully on SIGINT/SIGTERM

pub mod config;
pub mod error;
pub mod feed;
pub mod ingest;
pub mod logging;
pub mod node;
pub mod shutdown;

pub use config::NodeConfig;
pub use error::NodeError;
pub use feed::WebSocketFeed;
pub use ingest::Ingestor;
pub use logging::{init_logging, LogFormat};
pub use node::TipselNode;
pub use shutdown::ShutdownController;
