//! A single transaction node in the tangle.

use std::collections::BTreeSet;

use tipsel_types::{BundleHash, TxHash};

/// A transaction as seen by the tip selector.
///
/// Edges are stored as hashes; the [`Tangle`](crate::Tangle) owns every node
/// and resolves them. `trunk`/`branch` are `None` when the parent was unknown
/// at ingest time or after the node has been detached by reclamation.
#[derive(Clone, Debug, PartialEq)]
pub struct TxNode {
    pub hash: TxHash,
    pub bundle: BundleHash,
    pub trunk: Option<TxHash>,
    pub branch: Option<TxHash>,
    /// Transactions naming this node as trunk or branch, ordered by hash.
    pub direct_approvers: BTreeSet<TxHash>,
    /// Cumulative number of distinct descendants.
    pub approvers: u64,
}

impl TxNode {
    pub fn new(
        hash: TxHash,
        bundle: BundleHash,
        trunk: Option<TxHash>,
        branch: Option<TxHash>,
    ) -> Self {
        Self {
            hash,
            bundle,
            trunk,
            branch,
            direct_approvers: BTreeSet::new(),
            approvers: 0,
        }
    }

    /// A tip has no descendants at all.
    pub fn is_tip(&self) -> bool {
        self.approvers == 0
    }

    /// No parent link is held: either reclamation cut this node off, or
    /// neither parent was in the tangle when it arrived.
    pub fn has_no_parents(&self) -> bool {
        self.trunk.is_none() && self.branch.is_none()
    }

    pub(crate) fn detach(&mut self) {
        self.trunk = None;
        self.branch = None;
    }

    /// Parents that are still linked, trunk first. Duplicates are kept.
    pub fn parents(&self) -> impl Iterator<Item = &TxHash> {
        self.trunk.iter().chain(self.branch.iter())
    }
}
