//! The caching consistency oracle.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tipsel_tangle::ConsistentCache;
use tipsel_types::TxHash;

use crate::error::OracleError;

/// The node RPC the oracle consults.
///
/// Implementations answer for the whole set at once: `Ok(true)` when the
/// transactions are jointly consistent, `Ok(false)` when the node says they
/// are not, `Err` when the node could not be asked.
pub trait ConsistencyCheck: Send + Sync {
    fn check_consistency(
        &self,
        hashes: &[TxHash],
    ) -> impl Future<Output = Result<bool, OracleError>> + Send;
}

impl<C: ConsistencyCheck> ConsistencyCheck for Arc<C> {
    fn check_consistency(
        &self,
        hashes: &[TxHash],
    ) -> impl Future<Output = Result<bool, OracleError>> + Send {
        (**self).check_consistency(hashes)
    }
}

/// Counters describing how the oracle has been answering.
#[derive(Debug, Default)]
pub struct OracleStats {
    rpc_calls: AtomicU64,
    cache_hits: AtomicU64,
    rejections: AtomicU64,
    failures: AtomicU64,
}

impl OracleStats {
    /// Node RPC round trips.
    pub fn rpc_calls(&self) -> u64 {
        self.rpc_calls.load(Ordering::Relaxed)
    }

    /// Queries answered entirely from the positive cache.
    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    /// Queries the node answered with "not consistent".
    pub fn rejections(&self) -> u64 {
        self.rejections.load(Ordering::Relaxed)
    }

    /// Queries that failed at the RPC layer.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

/// Positive-caching front for a [`ConsistencyCheck`].
pub struct ConsistencyOracle<C> {
    rpc: C,
    cache: ConsistentCache,
    stats: OracleStats,
}

impl<C: ConsistencyCheck> ConsistencyOracle<C> {
    /// `cache` is shared with the tangle so that reclaimed transactions are
    /// evicted from it.
    pub fn new(rpc: C, cache: ConsistentCache) -> Self {
        Self {
            rpc,
            cache,
            stats: OracleStats::default(),
        }
    }

    pub fn rpc(&self) -> &C {
        &self.rpc
    }

    pub fn cache(&self) -> &ConsistentCache {
        &self.cache
    }

    pub fn stats(&self) -> &OracleStats {
        &self.stats
    }

    /// Whether `hashes` are jointly consistent. Only hashes missing from the
    /// cache are sent to the node; any failure counts as "not consistent".
    pub async fn are_consistent(&self, hashes: &[TxHash]) -> bool {
        let pending = self.cache.uncached(hashes);
        if pending.is_empty() {
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            return true;
        }

        self.stats.rpc_calls.fetch_add(1, Ordering::Relaxed);
        match self.rpc.check_consistency(&pending).await {
            Ok(true) => {
                self.cache.insert_all(&pending);
                true
            }
            Ok(false) => {
                self.stats.rejections.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(count = pending.len(), "node reports transactions inconsistent");
                false
            }
            Err(e) => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(count = pending.len(), error = %e, "consistency check failed");
                false
            }
        }
    }
}
