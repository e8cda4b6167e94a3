//! The weighted random walk.
//!
//! Starting from a random entry point, the walk repeatedly steps to the tail
//! of one of the current transaction's direct approvers, chosen with
//! probability proportional to `exp(alpha * rating)`. Every tail it steps to
//! is queued for validation; once a batch is full the oracle is asked about
//! it, and a refused batch sends the walk back to the last validated
//! transaction with the whole batch blacklisted.

use std::collections::{BTreeSet, HashSet};

use rand::Rng;

use tipsel_oracle::{ConsistencyCheck, ConsistencyOracle};
use tipsel_tangle::{Tangle, TxNode};
use tipsel_types::{TxHash, WalkParams};

/// Weights for candidates with the given ratings.
///
/// Each weight is `exp(alpha * (rating - max_rating))`: the best-rated
/// candidate gets exactly 1 and every other weight lies in `(0, 1]`. When
/// `alpha * (max_rating - rating)` exceeds roughly 745 the weight underflows
/// to 0.0 and that candidate is practically never drawn.
pub fn rating_weights(ratings: &[u64], alpha: f64) -> Vec<f64> {
    let Some(max) = ratings.iter().max().copied() else {
        return Vec::new();
    };
    ratings
        .iter()
        .map(|&r| (alpha * (r as f64 - max as f64)).exp())
        .collect()
}

/// Roulette-wheel pick: subtract weights in order and return the first index
/// at which `target` drops to zero or below, or the last index if it never does.
pub fn roulette_index(weights: &[f64], target: f64) -> usize {
    let mut remaining = target;
    for (i, w) in weights.iter().enumerate() {
        remaining -= w;
        if remaining <= 0.0 {
            return i;
        }
    }
    weights.len().saturating_sub(1)
}

/// One walk context over a locked tangle.
pub struct Walker<'a, C> {
    tangle: &'a Tangle,
    oracle: &'a ConsistencyOracle<C>,
    alpha: f64,
}

impl<'a, C: ConsistencyCheck> Walker<'a, C> {
    pub fn new(tangle: &'a Tangle, oracle: &'a ConsistencyOracle<C>, alpha: f64) -> Self {
        Self {
            tangle,
            oracle,
            alpha,
        }
    }

    /// Direct approvers of `hash` that are still in the tangle and not known
    /// to be inconsistent, in hash order.
    fn candidates(&self, hash: &TxHash, inconsistent: &HashSet<TxHash>) -> Vec<&'a TxNode> {
        let tangle = self.tangle;
        let Some(node) = tangle.get(hash) else {
            return Vec::new();
        };
        node.direct_approvers
            .iter()
            .filter(|a| !inconsistent.contains(*a))
            .filter_map(|a| tangle.get(a))
            .collect()
    }

    /// Walk from a random member of `entries` to a tip.
    ///
    /// Hashes proven inconsistent along the way are added to `inconsistent`.
    /// Returns `None` when no entry point is usable or when the walk ends on
    /// a transaction that still has approvers, i.e. it was cornered by
    /// inconsistency rather than reaching the frontier.
    pub async fn walk<R: Rng + Send>(
        &self,
        entries: &BTreeSet<TxHash>,
        depth: i64,
        inconsistent: &mut HashSet<TxHash>,
        rng: &mut R,
    ) -> Option<TxHash> {
        let valid: Vec<&TxHash> = entries
            .iter()
            .filter(|h| !inconsistent.contains(*h) && self.tangle.contains(h))
            .collect();
        if valid.is_empty() {
            return None;
        }

        let batch_size = WalkParams::batch_size(depth);
        let entry_point = valid[rng.gen_range(0..valid.len())].clone();
        let mut tx = entry_point.clone();
        let mut last_valid = entry_point;
        let mut to_verify: Vec<TxHash> = Vec::with_capacity(batch_size);
        let mut traversed: HashSet<TxHash> = HashSet::new();
        let mut candidates = self.candidates(&tx, inconsistent);

        while !candidates.is_empty() {
            traversed.insert(tx.clone());

            let ratings: Vec<u64> = candidates.iter().map(|n| n.approvers + 1).collect();
            let weights = rating_weights(&ratings, self.alpha);
            let total: f64 = weights.iter().sum();
            let idx = roulette_index(&weights, rng.gen::<f64>() * total);
            let approver = candidates[idx];

            let Some(tail) = self.tangle.tail(&approver.bundle) else {
                tracing::warn!(approver = %approver.hash, bundle = %approver.bundle, "bundle tail is not present");
                candidates.remove(idx);
                continue;
            };

            tx = tail.hash.clone();
            to_verify.push(tx.clone());
            if to_verify.len() >= batch_size {
                if self.oracle.are_consistent(&to_verify).await {
                    last_valid = tx.clone();
                } else {
                    tracing::debug!(
                        steps = to_verify.len() + 1,
                        "traversed transactions are not consistent, going back"
                    );
                    for hash in to_verify.iter() {
                        traversed.remove(hash);
                        inconsistent.insert(hash.clone());
                    }
                    inconsistent.insert(approver.hash.clone());
                    tx = last_valid.clone();
                }
                to_verify.clear();
            }

            candidates = self.candidates(&tx, inconsistent);
        }

        match self.tangle.get(&tx) {
            Some(node) if node.is_tip() => {
                tracing::debug!(traversed = traversed.len(), tip = %tx, "random walk reached a tip");
                Some(tx)
            }
            _ => {
                tracing::warn!(stuck_at = %tx, "can't find consistent tip");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tipsel_nullables::NullConsistency;
    use tipsel_tangle::{ConsistentCache, MilestoneEvent, TransactionEvent};
    use tipsel_types::BundleHash;

    fn h(s: &str) -> TxHash {
        TxHash::from(s)
    }

    fn tx(hash: &str, trunk: &str, branch: &str) -> TransactionEvent {
        TransactionEvent {
            hash: h(hash),
            bundle: BundleHash::from(format!("B{hash}")),
            trunk: h(trunk),
            branch: h(branch),
            is_tail: true,
        }
    }

    fn build(events: Vec<TransactionEvent>) -> Tangle {
        let mut tangle = Tangle::new(WalkParams::default(), ConsistentCache::new());
        for e in events {
            tangle.add_transaction(e);
        }
        tangle
    }

    fn entries(names: &[&str]) -> BTreeSet<TxHash> {
        names.iter().map(|n| h(n)).collect()
    }

    #[test]
    fn max_rated_candidate_gets_weight_one() {
        let weights = rating_weights(&[3, 10, 1], 0.5);
        assert_eq!(weights[1], 1.0);
        assert!(weights.iter().all(|w| *w > 0.0 && *w <= 1.0));
        assert!(weights[0] > weights[2]);
    }

    #[test]
    fn extreme_rating_spread_underflows_to_zero() {
        let weights = rating_weights(&[1, 10_001], 0.1);
        assert_eq!(weights, vec![0.0, 1.0]);
        assert_eq!(roulette_index(&weights, 0.5), 1);
    }

    #[test]
    fn equal_ratings_are_uniform() {
        assert_eq!(rating_weights(&[4, 4, 4], 0.001), vec![1.0, 1.0, 1.0]);
        assert!(rating_weights(&[], 1.0).is_empty());
    }

    #[test]
    fn roulette_picks_first_index_where_target_is_exhausted() {
        let weights = [1.0, 1.0, 1.0];
        assert_eq!(roulette_index(&weights, 0.0), 0);
        assert_eq!(roulette_index(&weights, 0.5), 0);
        assert_eq!(roulette_index(&weights, 1.0), 0);
        assert_eq!(roulette_index(&weights, 1.5), 1);
        assert_eq!(roulette_index(&weights, 2.9), 2);
        assert_eq!(roulette_index(&weights, 7.0), 2);
    }

    #[tokio::test]
    async fn single_tip_entry_returns_itself() {
        let tangle = build(vec![tx("A", "9", "9")]);
        let oracle = NullConsistency::oracle(ConsistentCache::new());
        let walker = Walker::new(&tangle, &oracle, 0.001);
        let mut rng = StdRng::seed_from_u64(1);
        let tip = walker
            .walk(&entries(&["A"]), 0, &mut HashSet::new(), &mut rng)
            .await;
        assert_eq!(tip, Some(h("A")));
    }

    #[tokio::test]
    async fn walks_chain_to_the_end() {
        let tangle = build(vec![
            tx("A", "9", "9"),
            tx("B", "A", "A"),
            tx("C", "B", "B"),
            tx("D", "C", "C"),
        ]);
        let oracle = NullConsistency::oracle(ConsistentCache::new());
        let walker = Walker::new(&tangle, &oracle, 0.001);
        let mut rng = StdRng::seed_from_u64(7);
        let tip = walker
            .walk(&entries(&["A"]), 0, &mut HashSet::new(), &mut rng)
            .await;
        assert_eq!(tip, Some(h("D")));
        // batch of 4 at depth 0: B, C, D fit in one unfinished batch, no RPC needed
        assert_eq!(oracle.stats().rpc_calls(), 0);
    }

    #[tokio::test]
    async fn empty_entries_yield_nothing() {
        let tangle = build(vec![tx("A", "9", "9")]);
        let oracle = NullConsistency::oracle(ConsistentCache::new());
        let walker = Walker::new(&tangle, &oracle, 0.001);
        let mut inconsistent: HashSet<TxHash> = [h("A")].into_iter().collect();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            walker
                .walk(&entries(&["A"]), 0, &mut inconsistent, &mut rng)
                .await,
            None
        );
    }

    #[tokio::test]
    async fn missing_tail_drops_candidate_and_stays_put() {
        // B's bundle has no tail, so A cannot advance and A is not a tip.
        let mut tangle = Tangle::new(WalkParams::default(), ConsistentCache::new());
        tangle.add_transaction(tx("A", "9", "9"));
        let mut b = tx("B", "A", "A");
        b.is_tail = false;
        tangle.add_transaction(b);

        let oracle = NullConsistency::oracle(ConsistentCache::new());
        let walker = Walker::new(&tangle, &oracle, 0.001);
        let mut rng = StdRng::seed_from_u64(3);
        let tip = walker
            .walk(&entries(&["A"]), 0, &mut HashSet::new(), &mut rng)
            .await;
        assert_eq!(tip, None);
    }

    #[tokio::test]
    async fn missing_tail_falls_back_to_other_candidate() {
        let mut tangle = Tangle::new(WalkParams::default(), ConsistentCache::new());
        tangle.add_transaction(tx("A", "9", "9"));
        let mut b = tx("B", "A", "A");
        b.is_tail = false;
        tangle.add_transaction(b);
        tangle.add_transaction(tx("C", "A", "A"));

        let oracle = NullConsistency::oracle(ConsistentCache::new());
        let walker = Walker::new(&tangle, &oracle, 0.001);
        for seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(seed);
            let tip = walker
                .walk(&entries(&["A"]), 0, &mut HashSet::new(), &mut rng)
                .await;
            assert_eq!(tip, Some(h("C")));
        }
    }

    #[tokio::test]
    async fn refused_batch_rolls_back_and_blacklists() {
        // Chain A <- B <- C <- D <- E; with depth 0 the first batch is B..E.
        let tangle = build(vec![
            tx("A", "9", "9"),
            tx("B", "A", "A"),
            tx("C", "B", "B"),
            tx("D", "C", "C"),
            tx("E", "D", "D"),
        ]);
        let oracle = NullConsistency::rejecting([h("E")]).into_oracle(ConsistentCache::new());
        let walker = Walker::new(&tangle, &oracle, 0.001);
        let mut inconsistent = HashSet::new();
        let mut rng = StdRng::seed_from_u64(5);
        let tip = walker
            .walk(&entries(&["A"]), 0, &mut inconsistent, &mut rng)
            .await;

        // Rolled back to A, whose only approver B is now blacklisted: cornered.
        assert_eq!(tip, None);
        for name in ["B", "C", "D", "E"] {
            assert!(inconsistent.contains(&h(name)), "{name} should be blacklisted");
        }
        assert_eq!(oracle.stats().rejections(), 1);
    }

    #[tokio::test]
    async fn confirmed_batch_moves_last_valid_forward() {
        let tangle = build(vec![
            tx("A", "9", "9"),
            tx("B", "A", "A"),
            tx("C", "B", "B"),
            tx("D", "C", "C"),
            tx("E", "D", "D"),
            tx("F", "E", "E"),
        ]);
        let oracle = NullConsistency::oracle(ConsistentCache::new());
        let walker = Walker::new(&tangle, &oracle, 0.001);
        let mut rng = StdRng::seed_from_u64(11);
        let tip = walker
            .walk(&entries(&["A"]), 0, &mut HashSet::new(), &mut rng)
            .await;
        assert_eq!(tip, Some(h("F")));
        assert_eq!(oracle.stats().rpc_calls(), 1);
        assert!(oracle.cache().contains(&h("E")));
    }

    #[tokio::test]
    async fn detached_entry_still_walks_forward() {
        let mut tangle = Tangle::new(
            WalkParams {
                max_depth: 1,
                alpha: 0.001,
            },
            ConsistentCache::new(),
        );
        tangle.add_transaction(tx("A", "9", "9"));
        tangle.add_confirmation(MilestoneEvent { index: 1, hash: h("A") });
        tangle.add_transaction(tx("B", "A", "A"));
        tangle.add_confirmation(MilestoneEvent { index: 2, hash: h("B") });
        assert!(tangle.get(&h("A")).unwrap().has_no_parents());

        let oracle = NullConsistency::oracle(ConsistentCache::new());
        let walker = Walker::new(&tangle, &oracle, 0.001);
        let mut rng = StdRng::seed_from_u64(2);
        let tip = walker
            .walk(&entries(&["A"]), 1, &mut HashSet::new(), &mut rng)
            .await;
        assert_eq!(tip, Some(h("B")));
    }
}
