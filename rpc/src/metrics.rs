//! Prometheus metrics for the tip selection service.
//!
//! Covers upstream ingest, tip requests and the consistency oracle. The
//! [`TipselMetrics`] struct owns a dedicated [`Registry`] that the `/metrics`
//! endpoint encodes into the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Histogram, HistogramOpts, IntCounter, IntGauge, Opts,
    Registry, TextEncoder,
};

use tipsel_oracle::OracleStats;
use tipsel_tangle::TangleStatus;

use crate::error::RpcError;

/// Central collection of all service-level Prometheus metrics.
pub struct TipselMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Ingest ──────────────────────────────────────────────────────────
    /// Frames read from the upstream feed, of any topic.
    pub frames_received: IntCounter,
    /// Frames that failed to parse and were skipped.
    pub frames_malformed: IntCounter,
    /// New transactions added to the tangle.
    pub transactions_ingested: IntCounter,
    /// Milestone confirmations applied.
    pub milestones_observed: IntCounter,

    // ── Requests ────────────────────────────────────────────────────────
    pub tip_requests: IntCounter,
    pub tip_failures: IntCounter,
    /// Wall time of `get_tips`, lock wait included, in milliseconds.
    pub selection_latency_ms: Histogram,

    // ── Oracle ──────────────────────────────────────────────────────────
    pub oracle_rpc_calls: IntCounter,
    pub oracle_cache_hits: IntCounter,

    // ── Tangle ──────────────────────────────────────────────────────────
    pub tx_count: IntGauge,
    pub latest_milestone: IntGauge,
    pub available_depth: IntGauge,
}

impl TipselMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let frames_received = register_int_counter_with_registry!(
            Opts::new("tipsel_frames_received_total", "Upstream frames received"),
            registry
        )
        .expect("failed to register frames_received counter");

        let frames_malformed = register_int_counter_with_registry!(
            Opts::new(
                "tipsel_frames_malformed_total",
                "Upstream frames skipped because they could not be parsed"
            ),
            registry
        )
        .expect("failed to register frames_malformed counter");

        let transactions_ingested = register_int_counter_with_registry!(
            Opts::new(
                "tipsel_transactions_ingested_total",
                "Transactions added to the tangle"
            ),
            registry
        )
        .expect("failed to register transactions_ingested counter");

        let milestones_observed = register_int_counter_with_registry!(
            Opts::new(
                "tipsel_milestones_observed_total",
                "Milestone confirmations applied"
            ),
            registry
        )
        .expect("failed to register milestones_observed counter");

        let tip_requests = register_int_counter_with_registry!(
            Opts::new("tipsel_tip_requests_total", "Tip selection requests"),
            registry
        )
        .expect("failed to register tip_requests counter");

        let tip_failures = register_int_counter_with_registry!(
            Opts::new(
                "tipsel_tip_failures_total",
                "Tip selection requests that returned an error"
            ),
            registry
        )
        .expect("failed to register tip_failures counter");

        // 1 ms → ~16 s.
        let selection_latency_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "tipsel_selection_latency_ms",
                "Tip selection latency in milliseconds"
            )
            .buckets(
                prometheus::exponential_buckets(1.0, 2.0, 15)
                    .expect("valid exponential bucket parameters")
            ),
            registry
        )
        .expect("failed to register selection_latency_ms histogram");

        let oracle_rpc_calls = register_int_counter_with_registry!(
            Opts::new(
                "tipsel_oracle_rpc_calls_total",
                "Consistency checks sent to the node"
            ),
            registry
        )
        .expect("failed to register oracle_rpc_calls counter");

        let oracle_cache_hits = register_int_counter_with_registry!(
            Opts::new(
                "tipsel_oracle_cache_hits_total",
                "Consistency checks answered from the positive cache"
            ),
            registry
        )
        .expect("failed to register oracle_cache_hits counter");

        let tx_count = register_int_gauge_with_registry!(
            Opts::new("tipsel_tx_count", "Transactions currently in the tangle"),
            registry
        )
        .expect("failed to register tx_count gauge");

        let latest_milestone = register_int_gauge_with_registry!(
            Opts::new("tipsel_latest_milestone", "Latest milestone index seen"),
            registry
        )
        .expect("failed to register latest_milestone gauge");

        let available_depth = register_int_gauge_with_registry!(
            Opts::new(
                "tipsel_available_depth",
                "Highest depth a tip request can be served at"
            ),
            registry
        )
        .expect("failed to register available_depth gauge");

        Self {
            registry,
            frames_received,
            frames_malformed,
            transactions_ingested,
            milestones_observed,
            tip_requests,
            tip_failures,
            selection_latency_ms,
            oracle_rpc_calls,
            oracle_cache_hits,
            tx_count,
            latest_milestone,
            available_depth,
        }
    }

    pub fn observe_tangle(&self, status: &TangleStatus) {
        self.tx_count.set(status.transactions as i64);
        self.latest_milestone.set(status.latest_milestone.unwrap_or(-1));
        self.available_depth.set(status.available_depth);
    }

    /// Bring the oracle counters up to the oracle's own tallies.
    pub fn observe_oracle(&self, stats: &OracleStats) {
        catch_up(&self.oracle_rpc_calls, stats.rpc_calls());
        catch_up(&self.oracle_cache_hits, stats.cache_hits());
    }

    pub fn encode(&self) -> Result<String, RpcError> {
        TextEncoder::new()
            .encode_to_string(&self.registry.gather())
            .map_err(|e| RpcError::Metrics(e.to_string()))
    }
}

impl Default for TipselMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn catch_up(counter: &IntCounter, total: u64) {
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn oracle_counters_follow_stats() {
        use tipsel_nullables::NullConsistency;
        use tipsel_tangle::ConsistentCache;
        use tipsel_types::TxHash;

        let oracle = NullConsistency::oracle(ConsistentCache::new());
        oracle.are_consistent(&[TxHash::from("A")]).await;
        oracle.are_consistent(&[TxHash::from("A")]).await;

        let metrics = TipselMetrics::new();
        metrics.observe_oracle(oracle.stats());
        metrics.observe_oracle(oracle.stats());
        assert_eq!(metrics.oracle_rpc_calls.get(), 1);
        assert_eq!(metrics.oracle_cache_hits.get(), 1);
    }

    #[test]
    fn encodes_text_format() {
        let metrics = TipselMetrics::new();
        metrics.tip_requests.inc();
        let text = metrics.encode().unwrap();
        assert!(text.contains("tipsel_tip_requests_total 1"));
        assert!(text.contains("# TYPE tipsel_available_depth gauge"));
    }

    #[test]
    fn tangle_gauges_before_first_milestone() {
        let metrics = TipselMetrics::new();
        metrics.observe_tangle(&TangleStatus {
            transactions: 4,
            tails: 4,
            milestones: vec![],
            latest_milestone: None,
            available_depth: -1,
            consistent_cached: 0,
        });
        assert_eq!(metrics.tx_count.get(), 4);
        assert_eq!(metrics.latest_milestone.get(), -1);
        assert_eq!(metrics.available_depth.get(), -1);
    }
}
