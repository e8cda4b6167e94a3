//! Positive cache of transactions the node RPC has confirmed as consistent.
//!
//! Shared between the consistency oracle (which fills it) and reclamation
//! (which evicts deleted transactions). Negative results are never stored.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use tipsel_types::TxHash;

#[derive(Clone, Debug, Default)]
pub struct ConsistentCache {
    inner: Arc<RwLock<HashSet<TxHash>>>,
}

impl ConsistentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, hash: &TxHash) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(hash)
    }

    /// The subset of `hashes` not yet known to be consistent, in input order
    /// and without duplicates.
    pub fn uncached(&self, hashes: &[TxHash]) -> Vec<TxHash> {
        let set = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut seen = HashSet::new();
        hashes
            .iter()
            .filter(|h| !set.contains(*h) && seen.insert(*h))
            .cloned()
            .collect()
    }

    pub fn insert_all<'a>(&self, hashes: impl IntoIterator<Item = &'a TxHash>) {
        let mut set = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        set.extend(hashes.into_iter().cloned());
    }

    pub fn remove(&self, hash: &TxHash) -> bool {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(hash)
    }

    pub fn clear(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
