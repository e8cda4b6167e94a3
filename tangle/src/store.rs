//! The DAG store: transactions, bundle tails, milestone confirmation sets
//! and the sliding confirmation window.
//!
//! Nodes live in a single map keyed by hash. Parent and approver edges are
//! hashes into that map, so the inverse `direct_approvers` edges never form
//! ownership cycles. A reference to a hash that is no longer in the map
//! behaves exactly like a null reference.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use tipsel_types::{BundleHash, MilestoneIndex, TxHash, WalkParams};

use crate::cache::ConsistentCache;
use crate::frame::{MilestoneEvent, TangleEvent, TransactionEvent};
use crate::node::TxNode;

/// The tangle behind its exclusion lock.
///
/// Every mutation sequence (approver propagation, reclamation) and every
/// tip-selection walk holds this lock for its whole duration. It is an async
/// mutex because the selector keeps it across node RPC calls.
pub type SharedTangle = Arc<Mutex<Tangle>>;

/// Result of applying a `tx` event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxOutcome {
    /// A new node was created; `credited` ancestors received one more approver.
    Inserted { credited: usize },
    /// The hash was already known; the event was ignored.
    Duplicate,
}

/// Counts from one reclamation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReclaimStats {
    pub empty_dropped: usize,
    pub marked: usize,
    pub deleted: usize,
}

/// Result of applying an `sn` event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MilestoneOutcome {
    /// The event raised `latest_milestone`.
    pub advanced: bool,
    /// The transaction was known and recorded in the confirmation set.
    pub confirmed: bool,
    /// Newly published query depth, if this event made one reachable.
    pub new_depth: Option<i64>,
    /// Reclamation performed because of the advance.
    pub reclaimed: ReclaimStats,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Applied {
    Transaction(TxOutcome),
    Milestone(MilestoneOutcome),
}

/// Point-in-time summary of the store.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TangleStatus {
    pub transactions: usize,
    pub tails: usize,
    pub milestones: Vec<MilestoneIndex>,
    pub latest_milestone: Option<MilestoneIndex>,
    pub available_depth: i64,
    pub consistent_cached: usize,
}

/// Indexed, mutable transaction graph with its derived aggregates.
#[derive(Debug)]
pub struct Tangle {
    params: WalkParams,
    txs: HashMap<TxHash, TxNode>,
    tails: HashMap<BundleHash, TxHash>,
    milestones: BTreeMap<MilestoneIndex, BTreeSet<TxHash>>,
    consistent: ConsistentCache,
    latest_milestone: Option<MilestoneIndex>,
    available_depth: i64,
}

impl Tangle {
    pub fn new(params: WalkParams, consistent: ConsistentCache) -> Self {
        Self {
            params,
            txs: HashMap::new(),
            tails: HashMap::new(),
            milestones: BTreeMap::new(),
            consistent,
            latest_milestone: None,
            available_depth: -1,
        }
    }

    /// Wrap a fresh tangle in its exclusion lock.
    pub fn shared(params: WalkParams, consistent: ConsistentCache) -> SharedTangle {
        Arc::new(Mutex::new(Self::new(params, consistent)))
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn params(&self) -> &WalkParams {
        &self.params
    }

    pub fn get(&self, hash: &TxHash) -> Option<&TxNode> {
        self.txs.get(hash)
    }

    pub fn contains(&self, hash: &TxHash) -> bool {
        self.txs.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.txs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    /// The tail transaction of `bundle`, if it has been ingested and not reclaimed.
    pub fn tail(&self, bundle: &BundleHash) -> Option<&TxNode> {
        self.tails.get(bundle).and_then(|hash| self.txs.get(hash))
    }

    /// Transactions confirmed by milestone `index`, ordered by hash.
    pub fn milestone(&self, index: MilestoneIndex) -> Option<&BTreeSet<TxHash>> {
        self.milestones.get(&index)
    }

    pub fn milestone_indices(&self) -> impl Iterator<Item = MilestoneIndex> + '_ {
        self.milestones.keys().copied()
    }

    pub fn latest_milestone(&self) -> Option<MilestoneIndex> {
        self.latest_milestone
    }

    /// Highest depth a tip request can currently be served at; `-1` until
    /// the first confirmation arrives.
    pub fn available_depth(&self) -> i64 {
        self.available_depth
    }

    pub fn consistent(&self) -> &ConsistentCache {
        &self.consistent
    }

    pub fn status(&self) -> TangleStatus {
        TangleStatus {
            transactions: self.txs.len(),
            tails: self.tails.len(),
            milestones: self.milestones.keys().copied().collect(),
            latest_milestone: self.latest_milestone,
            available_depth: self.available_depth,
            consistent_cached: self.consistent.len(),
        }
    }

    // ── Ingest ──────────────────────────────────────────────────────────

    pub fn apply(&mut self, event: TangleEvent) -> Applied {
        match event {
            TangleEvent::Transaction(tx) => Applied::Transaction(self.add_transaction(tx)),
            TangleEvent::Milestone(ms) => Applied::Milestone(self.add_confirmation(ms)),
        }
    }

    /// Insert a transaction and credit its ancestors.
    ///
    /// Parents that are not in the store are linked as `None` and are not
    /// relinked if they arrive later.
    pub fn add_transaction(&mut self, event: TransactionEvent) -> TxOutcome {
        if self.txs.contains_key(&event.hash) {
            tracing::trace!(hash = %event.hash, "duplicate transaction ignored");
            return TxOutcome::Duplicate;
        }

        let trunk = Some(event.trunk).filter(|h| self.txs.contains_key(h));
        let branch = Some(event.branch).filter(|h| self.txs.contains_key(h));
        let node = TxNode::new(event.hash.clone(), event.bundle.clone(), trunk, branch);

        self.txs.insert(event.hash.clone(), node);
        if event.is_tail {
            self.tails.insert(event.bundle, event.hash.clone());
        }

        let credited = self.propagate_approver(&event.hash);
        TxOutcome::Inserted { credited }
    }

    /// Register `approver` with its direct parents and add one to the
    /// approver count of every distinct transitive ancestor.
    fn propagate_approver(&mut self, approver: &TxHash) -> usize {
        let parents: Vec<TxHash> = match self.txs.get(approver) {
            Some(node) => node.parents().cloned().collect(),
            None => return 0,
        };

        for parent in &parents {
            if let Some(node) = self.txs.get_mut(parent) {
                node.direct_approvers.insert(approver.clone());
            }
        }

        let mut visited: HashSet<TxHash> = HashSet::new();
        let mut stack = parents;
        while let Some(hash) = stack.pop() {
            let Some(node) = self.txs.get_mut(&hash) else {
                continue;
            };
            if !visited.insert(hash) {
                continue;
            }
            node.approvers += 1;
            stack.extend(node.parents().cloned());
        }
        visited.len()
    }

    /// Record a milestone confirmation, advancing the window when the index
    /// is new.
    pub fn add_confirmation(&mut self, event: MilestoneEvent) -> MilestoneOutcome {
        let mut outcome = MilestoneOutcome::default();

        if self.latest_milestone.map_or(true, |latest| event.index > latest) {
            tracing::info!(milestone = event.index, "new milestone");
            self.latest_milestone = Some(event.index);
            outcome.advanced = true;
            outcome.reclaimed = self.reclaim();
            self.milestones.insert(event.index, BTreeSet::new());
        }

        if !self.txs.contains_key(&event.hash) {
            tracing::debug!(milestone = event.index, hash = %event.hash, "confirmed transaction not in tangle");
            return outcome;
        }
        let Some(confirmed) = self.milestones.get_mut(&event.index) else {
            return outcome;
        };
        confirmed.insert(event.hash);
        outcome.confirmed = true;

        if self.milestones.len() as i64 - 1 > self.available_depth {
            self.available_depth += 1;
            tracing::info!(depth = self.available_depth, "depth is available");
            outcome.new_depth = Some(self.available_depth);
        }
        outcome
    }

    /// Slide the confirmation window to `latest_milestone`.
    ///
    /// Milestone `latest - max_depth` is marked: its transactions lose their
    /// parent links so walks stop there. Every retained milestone below that
    /// is deleted together with its transactions. Running it twice for the
    /// same `latest_milestone` changes nothing.
    pub fn reclaim(&mut self) -> ReclaimStats {
        let mut stats = ReclaimStats::default();
        let Some(latest) = self.latest_milestone else {
            return stats;
        };

        let before = self.milestones.len();
        self.milestones.retain(|_, confirmed| !confirmed.is_empty());
        stats.empty_dropped = before - self.milestones.len();

        // Nothing lies below the window when it would start before i64::MIN.
        let Some(mark_idx) = latest.checked_sub(self.params.max_depth) else {
            return stats;
        };

        if let Some(to_mark) = self.milestones.get(&mark_idx) {
            for hash in to_mark {
                if let Some(node) = self.txs.get_mut(hash) {
                    node.detach();
                    stats.marked += 1;
                }
            }
            tracing::debug!(milestone = mark_idx, marked = stats.marked, "marked milestone");
        }

        let doomed: Vec<MilestoneIndex> = self
            .milestones
            .range(..mark_idx)
            .map(|(idx, _)| *idx)
            .collect();
        for idx in doomed {
            let Some(to_delete) = self.milestones.remove(&idx) else {
                continue;
            };
            for hash in &to_delete {
                if self.delete_transaction(hash) {
                    stats.deleted += 1;
                }
            }
            tracing::debug!(milestone = idx, deleted = to_delete.len(), "deleted milestone");
        }

        if stats.marked > 0 || stats.deleted > 0 {
            tracing::info!(
                marked = stats.marked,
                deleted = stats.deleted,
                remaining = self.txs.len(),
                "reclaimed transactions"
            );
        }
        stats
    }

    fn delete_transaction(&mut self, hash: &TxHash) -> bool {
        self.consistent.remove(hash);
        let Some(node) = self.txs.remove(hash) else {
            return false;
        };
        if self.tails.get(&node.bundle) == Some(hash) {
            self.tails.remove(&node.bundle);
        }
        true
    }

    /// Forget everything, as on a fresh start.
    pub fn reset(&mut self) {
        self.txs.clear();
        self.tails.clear();
        self.milestones.clear();
        self.consistent.clear();
        self.latest_milestone = None;
        self.available_depth = -1;
    }
}
