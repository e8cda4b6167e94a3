//! The tip selection node: wires the tangle, the selector, the ingestor
//! and the HTTP front end together.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use tipsel_oracle::{ConsistencyCheck, ConsistencyOracle, IriClient};
use tipsel_rpc::{RpcServer, RpcState, TipselMetrics};
use tipsel_selection::TipSelector;
use tipsel_tangle::{ConsistentCache, FrameSource, SharedTangle, Tangle};

use crate::config::NodeConfig;
use crate::feed::WebSocketFeed;
use crate::ingest::Ingestor;
use crate::shutdown::ShutdownController;
use crate::NodeError;

/// Maximum time to wait for tasks to finish after shutdown is signalled.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TipselNode<C> {
    pub config: NodeConfig,
    /// The transaction DAG, behind the lock shared by ingest and selection.
    pub tangle: SharedTangle,
    pub selector: Arc<TipSelector<C>>,
    /// `None` when metrics are disabled in the config.
    pub metrics: Option<Arc<TipselMetrics>>,
    pub shutdown: Arc<ShutdownController>,
    http_addr: Option<SocketAddr>,
    /// Handles for spawned background tasks (joined during shutdown).
    task_handles: Vec<JoinHandle<()>>,
}

impl TipselNode<IriClient> {
    /// Create a node that validates against the node RPC at
    /// `config.node_rpc_url`.
    pub fn new(config: NodeConfig) -> Result<Self, NodeError> {
        let client = IriClient::new(
            config.node_rpc_url.clone(),
            config.consistency_method,
            config.rpc_timeout(),
        )?;
        Self::with_rpc(config, client)
    }

    /// Log the upstream node's identity, then start ingesting from the
    /// WebSocket feed at `config.upstream_url`.
    pub async fn start(&mut self) -> Result<(), NodeError> {
        let rpc = self.selector.oracle().rpc();
        match rpc.node_info().await {
            Ok(info) => tracing::info!(
                node = rpc.node_url(),
                app = info.app_name.as_deref().unwrap_or("unknown"),
                version = info.app_version.as_deref().unwrap_or("unknown"),
                latest_milestone = info.latest_milestone_index,
                "connected to node RPC"
            ),
            Err(e) => tracing::warn!(node = rpc.node_url(), error = %e, "getNodeInfo failed"),
        }

        let feed = WebSocketFeed::new(self.config.upstream_url.clone());
        self.start_with_feed(feed).await
    }
}

impl<C: ConsistencyCheck + 'static> TipselNode<C> {
    pub fn with_rpc(config: NodeConfig, rpc: C) -> Result<Self, NodeError> {
        config.validate()?;

        let cache = ConsistentCache::new();
        let tangle = Tangle::shared(config.walk_params(), cache.clone());
        let oracle = Arc::new(ConsistencyOracle::new(rpc, cache));
        let mut selector = TipSelector::new(oracle, config.alpha);
        if let Some(cap) = config.max_selection_attempts {
            selector = selector.with_max_attempts(cap);
        }
        let selector = Arc::new(selector);
        let metrics = config
            .enable_metrics
            .then(|| Arc::new(TipselMetrics::new()));

        Ok(Self {
            config,
            tangle,
            selector,
            metrics,
            shutdown: Arc::new(ShutdownController::new()),
            http_addr: None,
            task_handles: Vec::new(),
        })
    }

    /// Address the HTTP front end is bound to, once started.
    pub fn http_addr(&self) -> Option<SocketAddr> {
        self.http_addr
    }

    /// Bind the HTTP front end and spawn it together with the ingestor
    /// reading from `feed`.
    pub async fn start_with_feed<S: FrameSource + 'static>(
        &mut self,
        feed: S,
    ) -> Result<(), NodeError> {
        if !self.task_handles.is_empty() {
            return Err(NodeError::AlreadyStarted);
        }
        tracing::info!(
            max_depth = self.config.max_depth,
            alpha = self.config.alpha,
            upstream = feed.endpoint(),
            "tip selection node starting"
        );

        let server = RpcServer::bind(self.config.http_port).await?;
        self.http_addr = Some(server.local_addr()?);
        let state = RpcState {
            tangle: self.tangle.clone(),
            selector: self.selector.clone(),
            metrics: self.metrics.clone(),
        };
        let mut shutdown_rx_http = self.shutdown.subscribe();
        let http_handle = tokio::spawn(async move {
            let stop = async move {
                let _ = shutdown_rx_http.recv().await;
            };
            if let Err(e) = server.serve(state, stop).await {
                tracing::error!(error = %e, "HTTP front end failed");
            }
        });
        self.task_handles.push(http_handle);

        let ingestor = Ingestor::new(self.tangle.clone(), self.metrics.clone());
        let reconnect_delay = self.config.reconnect_delay();
        let shutdown_rx_ingest = self.shutdown.subscribe();
        let ingest_handle = tokio::spawn(async move {
            ingestor.run(feed, reconnect_delay, shutdown_rx_ingest).await;
        });
        self.task_handles.push(ingest_handle);

        tracing::info!(http = ?self.http_addr, "tip selection node started");
        Ok(())
    }

    /// Signal every task to stop and wait for them. Stopping twice is fine.
    pub async fn stop(&mut self) -> Result<(), NodeError> {
        if self.shutdown.is_triggered() && self.task_handles.is_empty() {
            return Ok(());
        }
        tracing::info!("tip selection node stopping");
        self.shutdown.shutdown();

        let handles: Vec<JoinHandle<()>> = self.task_handles.drain(..).collect();
        let aborts: Vec<_> = handles.iter().map(JoinHandle::abort_handle).collect();
        let wait_all = async {
            for handle in handles {
                let _ = handle.await;
            }
        };

        if tokio::time::timeout(SHUTDOWN_TIMEOUT, wait_all).await.is_err() {
            tracing::warn!(
                "shutdown timeout ({:?}), aborting remaining tasks",
                SHUTDOWN_TIMEOUT
            );
            for abort in aborts {
                abort.abort();
            }
            return Err(NodeError::ShutdownTimeout);
        }

        self.http_addr = None;
        tracing::info!("tip selection node stopped");
        Ok(())
    }
}
