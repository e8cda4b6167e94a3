//! Axum-based HTTP server.

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;

use tipsel_oracle::ConsistencyCheck;

use crate::error::RpcError;
use crate::handlers::{router, RpcState};

/// A bound but not yet serving front end.
pub struct RpcServer {
    listener: TcpListener,
}

impl RpcServer {
    /// Bind on all interfaces. Port 0 picks a free port.
    pub async fn bind(port: u16) -> Result<Self, RpcError> {
        let addr = format!("0.0.0.0:{port}");
        let listener = TcpListener::bind(&addr).await?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, RpcError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `shutdown` resolves, then finish in-flight requests.
    pub async fn serve<C, F>(self, state: RpcState<C>, shutdown: F) -> Result<(), RpcError>
    where
        C: ConsistencyCheck + 'static,
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.local_addr()?;
        info!(%addr, "HTTP front end listening");
        axum::serve(self.listener, router(state))
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("HTTP front end stopped");
        Ok(())
    }
}
