use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("oracle error: {0}")]
    Oracle(#[from] tipsel_oracle::OracleError),

    #[error("upstream feed error: {0}")]
    Feed(#[from] tipsel_tangle::FeedError),

    #[error("HTTP server error: {0}")]
    Rpc(#[from] tipsel_rpc::RpcError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("node already started")]
    AlreadyStarted,

    #[error("shutdown timeout")]
    ShutdownTimeout,
}
