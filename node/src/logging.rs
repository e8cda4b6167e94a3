//! Structured logging initialisation.
//!
//! Two output formats are supported:
//! - [`LogFormat::Human`] - coloured, human-readable lines (development).
//! - [`LogFormat::Json`] - newline-delimited JSON (production / log aggregation).
//!
//! The filter level can be overridden at runtime via the `RUST_LOG`
//! environment variable.  When `RUST_LOG` is not set, the caller-supplied
//! `level` string is used (e.g. `"info"`, `"debug,tipsel_selection=trace"`).

use std::str::FromStr;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::NodeError;

/// Selects the output format for structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Pretty-printed, coloured output for local development.
    Human,
    /// Newline-delimited JSON for production and log aggregation pipelines.
    Json,
}

impl FromStr for LogFormat {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "human" | "text" => Ok(LogFormat::Human),
            "json" => Ok(LogFormat::Json),
            other => Err(NodeError::Config(format!(
                "unknown log format {other:?} (expected \"human\" or \"json\")"
            ))),
        }
    }
}

/// Initialise the global tracing subscriber.
///
/// Returns an error if a global subscriber has already been set.
pub fn init_logging(format: LogFormat, level: &str) -> Result<(), NodeError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let result = match format {
        LogFormat::Human => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_thread_ids(true))
            .try_init(),
    };
    result.map_err(|e| NodeError::Config(format!("logging already initialised: {e}")))
}
