//! Parameter validation errors.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ParamsError {
    #[error("alpha must be a positive finite number, got {0}")]
    InvalidAlpha(f64),

    #[error("max_depth must be at least 1, got {0}")]
    InvalidMaxDepth(i64),
}
