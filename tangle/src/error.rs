use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TangleError {
    #[error("malformed {kind} frame: {reason}")]
    MalformedFrame { kind: String, reason: String },
}

impl TangleError {
    pub(crate) fn malformed(kind: &str, reason: impl Into<String>) -> Self {
        TangleError::MalformedFrame {
            kind: kind.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failures of an upstream frame source.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("cannot connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("upstream transport error: {0}")]
    Transport(String),

    #[error("not connected")]
    NotConnected,
}
