use std::collections::{HashMap, HashSet};

use proptest::prelude::*;

use tipsel_tangle::{ConsistentCache, MilestoneEvent, Tangle, TransactionEvent};
use tipsel_types::{BundleHash, TxHash, WalkParams};

fn name(i: usize) -> TxHash {
    TxHash::new(format!("TX{i:05}"))
}

fn event(i: usize, trunk: usize, branch: usize) -> TransactionEvent {
    TransactionEvent {
        hash: name(i),
        bundle: BundleHash::new(format!("BUNDLE{i:05}")),
        trunk: name(trunk),
        branch: name(branch),
        is_tail: true,
    }
}

/// Random DAG: node `i` references two nodes in `0..=i`; a self reference
/// resolves to an unknown parent, like a transaction pointing outside the view.
fn dag() -> impl Strategy<Value = Vec<(usize, usize)>> {
    (1usize..40).prop_flat_map(|n| {
        (0..n)
            .map(|i| (0..=i, 0..=i))
            .collect::<Vec<_>>()
    })
}

fn descendants(edges: &[(usize, usize)]) -> Vec<usize> {
    let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
    for (i, &(t, b)) in edges.iter().enumerate() {
        for p in [t, b] {
            if p != i {
                children.entry(p).or_default().push(i);
            }
        }
    }
    (0..edges.len())
        .map(|root| {
            let mut seen = HashSet::new();
            let mut stack = children.get(&root).cloned().unwrap_or_default();
            while let Some(n) = stack.pop() {
                if seen.insert(n) {
                    stack.extend(children.get(&n).cloned().unwrap_or_default());
                }
            }
            seen.len()
        })
        .collect()
}

proptest! {
    /// With in-order ingest and no reclamation, every node's approver count
    /// equals its number of distinct descendants.
    #[test]
    fn approvers_match_descendant_count(edges in dag()) {
        let mut tangle = Tangle::new(WalkParams::default(), ConsistentCache::new());
        for (i, &(t, b)) in edges.iter().enumerate() {
            tangle.add_transaction(event(i, t, b));
        }
        let expected = descendants(&edges);
        for (i, count) in expected.iter().enumerate() {
            prop_assert_eq!(tangle.get(&name(i)).unwrap().approvers, *count as u64);
        }
    }

    /// Direct approver sets are exactly the inverse of the parent links.
    #[test]
    fn direct_approvers_invert_parent_links(edges in dag()) {
        let mut tangle = Tangle::new(WalkParams::default(), ConsistentCache::new());
        for (i, &(t, b)) in edges.iter().enumerate() {
            tangle.add_transaction(event(i, t, b));
        }
        for i in 0..edges.len() {
            let node = tangle.get(&name(i)).unwrap();
            for approver in &node.direct_approvers {
                let child = tangle.get(approver).unwrap();
                prop_assert!(child.parents().any(|p| p == &node.hash));
            }
        }
    }

    /// Retained milestone indices stay inside the window and the published
    /// depth never decreases.
    #[test]
    fn window_bounds_hold(
        max_depth in 1i64..6,
        steps in prop::collection::vec(0i64..3, 1..40),
    ) {
        let mut tangle = Tangle::new(
            WalkParams { max_depth, alpha: 0.001 },
            ConsistentCache::new(),
        );
        let mut index = 100;
        let mut last_depth = tangle.available_depth();
        for (i, step) in steps.iter().enumerate() {
            index += step;
            let parent = i.saturating_sub(1);
            tangle.add_transaction(event(i, parent, parent));
            tangle.add_confirmation(MilestoneEvent { index, hash: name(i) });

            let latest = tangle.latest_milestone().unwrap();
            for retained in tangle.milestone_indices() {
                prop_assert!(retained <= latest);
                prop_assert!(retained >= latest - max_depth - 1);
            }
            prop_assert!(tangle.available_depth() >= last_depth);
            last_depth = tangle.available_depth();
        }
    }
}
