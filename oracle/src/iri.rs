//! HTTP client for the upstream node's command API.
//!
//! Every call is a `POST` of a JSON object carrying a `command` field, with
//! the `X-IOTA-API-Version` header set. Errors come back either as a non-2xx
//! status or as an `error`/`exception` field in the body.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use tipsel_types::TxHash;

use crate::error::OracleError;
use crate::oracle::ConsistencyCheck;

const API_VERSION_HEADER: &str = "X-IOTA-API-Version";
const API_VERSION: &str = "1";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Placeholder address for the `getBalances` shape; its balance is never read.
pub const DUMMY_ADDRESS: &str =
    "999999999999999999999999999999999999999999999999999999999999999999999999999999999";

/// Balance threshold sent with `getBalances`.
const BALANCE_THRESHOLD: u8 = 100;

/// Which node command is used to validate a set of transactions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyMethod {
    /// `checkConsistency` with the hashes as tails; reads the `state` flag.
    #[default]
    CheckConsistency,
    /// `getBalances` with the hashes as tips; the node refuses the call when
    /// the tips are inconsistent.
    GetBalances,
}

/// Subset of `getNodeInfo` logged at startup.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeInfo {
    pub app_name: Option<String>,
    pub app_version: Option<String>,
    pub latest_milestone_index: Option<i64>,
    pub latest_solid_subtangle_milestone_index: Option<i64>,
    pub neighbors: Option<u32>,
    pub tips: Option<u64>,
}

/// Node RPC client.
#[derive(Clone)]
pub struct IriClient {
    http: reqwest::Client,
    node_url: String,
    method: ConsistencyMethod,
}

impl IriClient {
    pub fn new(
        node_url: impl Into<String>,
        method: ConsistencyMethod,
        timeout: Duration,
    ) -> Result<Self, OracleError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(|e| OracleError::Client(e.to_string()))?;
        Ok(Self {
            http,
            node_url: node_url.into(),
            method,
        })
    }

    pub fn node_url(&self) -> &str {
        &self.node_url
    }

    pub fn method(&self) -> ConsistencyMethod {
        self.method
    }

    /// Send one command and return the decoded body.
    async fn command(&self, body: Value) -> Result<Value, OracleError> {
        let response = self
            .http
            .post(&self.node_url)
            .header(API_VERSION_HEADER, API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| OracleError::Unreachable(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| OracleError::InvalidResponse(e.to_string()))?;
        let json: Option<Value> = serde_json::from_str(&text).ok();

        if let Some(message) = json.as_ref().and_then(error_message) {
            return Err(OracleError::Rejected(message));
        }
        if !status.is_success() {
            return Err(OracleError::Status {
                status: status.as_u16(),
                message: text,
            });
        }
        json.ok_or_else(|| OracleError::InvalidResponse(format!("not JSON: {text}")))
    }

    pub async fn node_info(&self) -> Result<NodeInfo, OracleError> {
        let value = self.command(json!({ "command": "getNodeInfo" })).await?;
        serde_json::from_value(value).map_err(|e| OracleError::InvalidResponse(e.to_string()))
    }
}

impl ConsistencyCheck for IriClient {
    async fn check_consistency(&self, hashes: &[TxHash]) -> Result<bool, OracleError> {
        let value = self.command(consistency_request(self.method, hashes)).await?;
        consistency_state(self.method, &value)
    }
}

fn error_message(value: &Value) -> Option<String> {
    value
        .get("error")
        .or_else(|| value.get("exception"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Request body for validating `hashes` with `method`.
pub fn consistency_request(method: ConsistencyMethod, hashes: &[TxHash]) -> Value {
    match method {
        ConsistencyMethod::CheckConsistency => json!({
            "command": "checkConsistency",
            "tails": hashes,
        }),
        ConsistencyMethod::GetBalances => json!({
            "command": "getBalances",
            "addresses": [DUMMY_ADDRESS],
            "threshold": BALANCE_THRESHOLD,
            "tips": hashes,
        }),
    }
}

/// Interpret a successful response body.
pub fn consistency_state(method: ConsistencyMethod, value: &Value) -> Result<bool, OracleError> {
    match method {
        ConsistencyMethod::CheckConsistency => value
            .get("state")
            .and_then(Value::as_bool)
            .ok_or_else(|| OracleError::InvalidResponse("missing boolean `state`".into())),
        ConsistencyMethod::GetBalances => Ok(true),
    }
}
