use thiserror::Error;

/// Reasons a tip request cannot be served. The messages are returned to
/// HTTP clients verbatim.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("tangle with this depth is not present")]
    DepthNotPresent,

    #[error("no consistent entry points available")]
    NoEntryPoints,

    #[error("no consistent tips could be found")]
    NoTips,
}
