//! Service configuration with TOML file support.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use tipsel_oracle::ConsistencyMethod;
use tipsel_types::params::{DEFAULT_ALPHA, DEFAULT_MAX_DEPTH};
use tipsel_types::WalkParams;

use crate::logging::LogFormat;
use crate::NodeError;

/// Configuration for a tip selection node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Number of milestones retained as the live walk window.
    #[serde(default = "default_max_depth")]
    pub max_depth: i64,

    /// Walk bias toward heavily approved transactions.
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Upstream event feed.
    #[serde(default = "default_upstream_url")]
    pub upstream_url: String,

    /// Node RPC used for consistency checks.
    #[serde(default = "default_node_rpc_url")]
    pub node_rpc_url: String,

    /// Port of the HTTP front end.
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Which node command validates transactions.
    #[serde(default)]
    pub consistency_method: ConsistencyMethod,

    /// Timeout for each node RPC call, in seconds.
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,

    /// Delay before reconnecting a dropped upstream feed, in milliseconds.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Optional cap on refused tip pairs within one request. Unset, a
    /// request retries until its entry points run out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_selection_attempts: Option<usize>,

    /// Whether to serve Prometheus metrics on `/metrics`.
    #[serde(default = "default_true")]
    pub enable_metrics: bool,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_max_depth() -> i64 {
    DEFAULT_MAX_DEPTH
}

fn default_alpha() -> f64 {
    DEFAULT_ALPHA
}

fn default_upstream_url() -> String {
    "ws://127.0.0.1:5556".to_string()
}

fn default_node_rpc_url() -> String {
    "https://nodes.devnet.iota.org:443".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_rpc_timeout_secs() -> u64 {
    30
}

fn default_reconnect_delay_ms() -> u64 {
    2000
}

fn default_true() -> bool {
    true
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn walk_params(&self) -> WalkParams {
        WalkParams {
            max_depth: self.max_depth,
            alpha: self.alpha,
        }
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }

    /// Reject values the service cannot run with.
    pub fn validate(&self) -> Result<(), NodeError> {
        self.walk_params()
            .validate()
            .map_err(|e| NodeError::Config(e.to_string()))?;
        self.log_format()?;
        if self.rpc_timeout_secs == 0 {
            return Err(NodeError::Config("rpc_timeout_secs must be positive".into()));
        }
        if self.max_selection_attempts == Some(0) {
            return Err(NodeError::Config(
                "max_selection_attempts must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            alpha: default_alpha(),
            upstream_url: default_upstream_url(),
            node_rpc_url: default_node_rpc_url(),
            http_port: default_http_port(),
            consistency_method: ConsistencyMethod::default(),
            rpc_timeout_secs: default_rpc_timeout_secs(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            max_selection_attempts: None,
            enable_metrics: default_true(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = NodeConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = NodeConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = NodeConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.max_depth, 5);
        assert_eq!(config.alpha, 0.001);
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.consistency_method, ConsistencyMethod::CheckConsistency);
        assert!(config.enable_metrics);
        assert_eq!(config.max_selection_attempts, None);
        assert_eq!(config.log_format, "human");
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            max_depth = 3
            alpha = 0.5
            consistency_method = "get_balances"
            max_selection_attempts = 12
        "#;
        let config = NodeConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.alpha, 0.5);
        assert_eq!(config.consistency_method, ConsistencyMethod::GetBalances);
        assert_eq!(config.max_selection_attempts, Some(12));
        assert_eq!(config.http_port, 8080); // default
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "http_port = 9000\nupstream_url = \"ws://feed:5556\"").unwrap();
        let config = NodeConfig::from_toml_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.http_port, 9000);
        assert_eq!(config.upstream_url, "ws://feed:5556");
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = NodeConfig::from_toml_file("/nonexistent/tipsel.toml");
        assert!(matches!(result, Err(NodeError::Config(_))));
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(NodeConfig::default().validate().is_ok());

        let config = NodeConfig {
            alpha: 0.0,
            ..NodeConfig::default()
        };
        assert!(matches!(config.validate(), Err(NodeError::Config(_))));

        let config = NodeConfig {
            alpha: f64::NAN,
            ..NodeConfig::default()
        };
        assert!(config.validate().is_err());

        let config = NodeConfig {
            max_depth: 0,
            ..NodeConfig::default()
        };
        assert!(config.validate().is_err());

        let config = NodeConfig {
            max_selection_attempts: Some(0),
            ..NodeConfig::default()
        };
        assert!(config.validate().is_err());

        let config = NodeConfig {
            log_format: "xml".into(),
            ..NodeConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
