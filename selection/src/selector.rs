//! The `get_tips` operation.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use tipsel_oracle::{ConsistencyCheck, ConsistencyOracle};
use tipsel_tangle::SharedTangle;
use tipsel_types::TxHash;

use crate::error::SelectionError;
use crate::walk::Walker;

/// Two tips to approve, in the shape the HTTP API returns them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TipPair {
    pub trunk: TxHash,
    pub branch: TxHash,
}

/// Picks tip pairs from a shared tangle.
pub struct TipSelector<C> {
    oracle: Arc<ConsistencyOracle<C>>,
    alpha: f64,
    /// `None` retries until the entry set runs out.
    max_attempts: Option<usize>,
}

impl<C: ConsistencyCheck> TipSelector<C> {
    pub fn new(oracle: Arc<ConsistencyOracle<C>>, alpha: f64) -> Self {
        Self {
            oracle,
            alpha,
            max_attempts: None,
        }
    }

    /// Give up with [`SelectionError::NoTips`] after `max_attempts` refused
    /// pairs instead of retrying until no entry point is left.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = Some(max_attempts.max(1));
        self
    }

    pub fn oracle(&self) -> &Arc<ConsistencyOracle<C>> {
        &self.oracle
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub async fn get_tips(
        &self,
        tangle: &SharedTangle,
        depth: i64,
    ) -> Result<TipPair, SelectionError> {
        let mut rng = StdRng::from_entropy();
        self.get_tips_with_rng(tangle, depth, &mut rng).await
    }

    /// Select two jointly consistent tips, walking from the milestone `depth`
    /// steps below the latest one.
    ///
    /// The tangle stays locked for the whole selection, oracle calls included.
    pub async fn get_tips_with_rng<R: Rng + Send>(
        &self,
        tangle: &SharedTangle,
        depth: i64,
        rng: &mut R,
    ) -> Result<TipPair, SelectionError> {
        let guard = tangle.lock().await;

        if depth < 0 || depth > guard.available_depth() {
            return Err(SelectionError::DepthNotPresent);
        }
        let entry_set = guard
            .latest_milestone()
            .and_then(|latest| latest.checked_sub(depth))
            .and_then(|index| guard.milestone(index))
            .filter(|set| !set.is_empty())
            .ok_or(SelectionError::NoEntryPoints)?;

        // Per-request copy: pruning never touches the stored confirmation set.
        let mut entries: BTreeSet<TxHash> = entry_set.clone();
        let mut inconsistent: HashSet<TxHash> = HashSet::new();
        let walker = Walker::new(&guard, &self.oracle, self.alpha);

        let mut attempt = 0usize;
        loop {
            attempt += 1;
            if self.max_attempts.is_some_and(|cap| attempt > cap) {
                tracing::warn!(attempts = attempt - 1, depth, "giving up on tip selection");
                return Err(SelectionError::NoTips);
            }

            entries.retain(|h| !inconsistent.contains(h));
            if entries.is_empty() {
                return Err(SelectionError::NoEntryPoints);
            }

            let trunk = walker.walk(&entries, depth, &mut inconsistent, rng).await;
            let branch = walker.walk(&entries, depth, &mut inconsistent, rng).await;
            let (Some(trunk), Some(branch)) = (trunk, branch) else {
                return Err(SelectionError::NoTips);
            };

            if self
                .oracle
                .are_consistent(&[trunk.clone(), branch.clone()])
                .await
            {
                tracing::debug!(%trunk, %branch, depth, attempt, "selected tips");
                return Ok(TipPair { trunk, branch });
            }

            tracing::debug!(%trunk, %branch, attempt, "tip pair is not consistent, retrying");
            inconsistent.insert(trunk);
            inconsistent.insert(branch);
        }
    }
}
