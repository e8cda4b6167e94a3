//! Routes and request handlers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;

use tipsel_oracle::ConsistencyCheck;
use tipsel_selection::{TipPair, TipSelector};
use tipsel_tangle::{SharedTangle, TangleStatus};

use crate::error::RpcError;
use crate::metrics::TipselMetrics;

/// Shared handler state.
pub struct RpcState<C> {
    pub tangle: SharedTangle,
    pub selector: Arc<TipSelector<C>>,
    /// `None` when metrics are disabled; `/metrics` then answers 404.
    pub metrics: Option<Arc<TipselMetrics>>,
}

impl<C> Clone for RpcState<C> {
    fn clone(&self) -> Self {
        Self {
            tangle: self.tangle.clone(),
            selector: self.selector.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

/// Build the router.
pub fn router<C>(state: RpcState<C>) -> Router
where
    C: ConsistencyCheck + 'static,
{
    Router::new()
        .route("/", get(get_tips::<C>))
        .route("/gtta", get(get_tips::<C>))
        .route("/status", get(get_status::<C>))
        .route("/metrics", get(get_metrics::<C>))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn parse_depth(params: &HashMap<String, String>) -> Result<i64, RpcError> {
    let raw = params.get("depth").ok_or(RpcError::MissingDepth)?;
    match raw.trim().parse::<i64>() {
        Ok(depth) if depth >= 0 => Ok(depth),
        _ => Err(RpcError::InvalidDepth(raw.clone())),
    }
}

// ── GET / ──

async fn get_tips<C: ConsistencyCheck>(
    State(state): State<RpcState<C>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<TipPair>, RpcError> {
    let depth = parse_depth(&params)?;

    let started = Instant::now();
    let result = state.selector.get_tips(&state.tangle, depth).await;
    if let Some(metrics) = &state.metrics {
        metrics.tip_requests.inc();
        metrics
            .selection_latency_ms
            .observe(started.elapsed().as_secs_f64() * 1000.0);
        if result.is_err() {
            metrics.tip_failures.inc();
        }
    }

    match result {
        Ok(pair) => Ok(Json(pair)),
        Err(e) => {
            tracing::debug!(depth, error = %e, "tip request failed");
            Err(e.into())
        }
    }
}

// ── GET /status ──

async fn get_status<C: ConsistencyCheck>(State(state): State<RpcState<C>>) -> Json<TangleStatus> {
    Json(state.tangle.lock().await.status())
}

// ── GET /metrics ──

async fn get_metrics<C: ConsistencyCheck>(
    State(state): State<RpcState<C>>,
) -> Result<Response, RpcError> {
    let metrics = state.metrics.as_ref().ok_or(RpcError::MetricsDisabled)?;
    let status = state.tangle.lock().await.status();
    metrics.observe_tangle(&status);
    metrics.observe_oracle(state.selector.oracle().stats());
    let body = metrics.encode()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}
