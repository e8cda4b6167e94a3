//! Oracle error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("failed to create HTTP client: {0}")]
    Client(String),

    #[error("node unreachable: {0}")]
    Unreachable(String),

    #[error("node returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("node rejected command: {0}")]
    Rejected(String),

    #[error("invalid node response: {0}")]
    InvalidResponse(String),
}
