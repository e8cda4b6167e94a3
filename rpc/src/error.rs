//! RPC error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use tipsel_selection::SelectionError;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("missing query parameter: depth")]
    MissingDepth,

    #[error("invalid depth {0:?}: expected a non-negative integer")]
    InvalidDepth(String),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("metrics are disabled")]
    MetricsDisabled,

    #[error("metrics encoding failed: {0}")]
    Metrics(String),

    #[error("server error: {0}")]
    Server(String),
}

impl RpcError {
    pub fn status(&self) -> StatusCode {
        match self {
            RpcError::MissingDepth | RpcError::InvalidDepth(_) | RpcError::Selection(_) => {
                StatusCode::BAD_REQUEST
            }
            RpcError::MetricsDisabled => StatusCode::NOT_FOUND,
            RpcError::Metrics(_) | RpcError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Errors go out as plain text with the error's message as the body.
impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

impl From<std::io::Error> for RpcError {
    fn from(e: std::io::Error) -> Self {
        RpcError::Server(e.to_string())
    }
}
