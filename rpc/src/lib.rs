//! HTTP front end for the tip selector.
//!
//! Provides endpoints for:
//! - Tip pairs (`GET /?depth=n`, also served at `/gtta`)
//! - Store status (`GET /status`)
//! - Prometheus metrics (`GET /metrics`)

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod server;

pub use error::RpcError;
pub use handlers::{router, RpcState};
pub use metrics::TipselMetrics;
pub use server::RpcServer;
