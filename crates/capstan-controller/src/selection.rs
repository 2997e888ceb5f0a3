use capstan_core::ClusterNode;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// The minimal cordon/uncordon delta for one control-loop iteration.
///
/// Both lists hold indices into the node slice the selection ran over. They
/// are disjoint, and neither contains a node whose desired state equals its
/// current state (minimal churn): re-running selection on the post-apply
/// snapshot with the same target yields two empty lists.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    /// Currently schedulable nodes that must become unschedulable
    pub to_cordon: Vec<usize>,
    /// Currently unschedulable nodes that no longer need to stay blocked
    pub to_uncordon: Vec<usize>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.to_cordon.is_empty() && self.to_uncordon.is_empty()
    }

    /// Net change in cordoned-node count this selection will cause
    /// (positive = net additional nodes blocked)
    pub fn net_change(&self) -> i64 {
        self.to_cordon.len() as i64 - self.to_uncordon.len() as i64
    }
}

/// Priority-queue entry: score first, original input index as the
/// tie-break, so equal-score nodes prefer earlier input order.
struct Entry {
    score: f64,
    index: usize,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then(self.index.cmp(&other.index))
    }
}

/// Choose which nodes to cordon and which to uncordon so that exactly
/// `min(desired, nodes.len())` nodes end up unschedulable.
///
/// Every node — already cordoned or not — goes into a single min-heap
/// keyed on `(score(node), input index)`. The `desired` cheapest entries
/// are the nodes that should end up blocked: the schedulable ones among
/// them are cordoned, the rest of the heap's unschedulable nodes are
/// uncordoned. Mixing both sets in one heap is what makes the tie-break
/// coherent when scores interleave across the sets; taking top-k from two
/// separately sorted lists does not reproduce it.
///
/// Lower score means higher priority to be blocked. Callers must exclude
/// nodes that may never be cordoned before calling.
pub fn select_unschedulable<F>(nodes: &[ClusterNode], desired: usize, score: F) -> Selection
where
    F: Fn(&ClusterNode) -> f64,
{
    let mut heap: BinaryHeap<Reverse<Entry>> = nodes
        .iter()
        .enumerate()
        .map(|(index, node)| {
            Reverse(Entry {
                score: score(node),
                index,
            })
        })
        .collect();

    let mut selection = Selection::default();

    for _ in 0..desired {
        match heap.pop() {
            Some(Reverse(entry)) => {
                if !nodes[entry.index].unschedulable {
                    selection.to_cordon.push(entry.index);
                }
                // Already-unschedulable nodes in the cheapest k correctly
                // stay cordoned; no action is recorded for them.
            }
            None => break,
        }
    }

    // Everything left over must end up schedulable. Draining in heap order
    // keeps the uncordon sequence deterministic (ascending score, then
    // input order).
    while let Some(Reverse(entry)) = heap.pop() {
        if nodes[entry.index].unschedulable {
            selection.to_uncordon.push(entry.index);
        }
    }

    selection
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, unschedulable: bool) -> ClusterNode {
        ClusterNode::new(name, unschedulable)
    }

    /// Apply a selection to a node list, returning the post-apply snapshot.
    fn apply(nodes: &[ClusterNode], selection: &Selection) -> Vec<ClusterNode> {
        let mut out = nodes.to_vec();
        for &i in &selection.to_cordon {
            out[i].unschedulable = true;
        }
        for &i in &selection.to_uncordon {
            out[i].unschedulable = false;
        }
        out
    }

    #[test]
    fn worked_scenario_with_interleaved_scores() {
        // A(5, schedulable), B(2, schedulable), C(8, cordoned), D(1, schedulable), k=2
        let nodes = vec![
            node("A", false),
            node("B", false),
            node("C", true),
            node("D", false),
        ];
        let scores = [5.0, 2.0, 8.0, 1.0];

        let sel = select_unschedulable(&nodes, 2, |n| {
            scores[nodes.iter().position(|m| m.name == n.name).unwrap()]
        });

        // D (score 1) and B (score 2) get cordoned, in pop order.
        assert_eq!(sel.to_cordon, vec![3, 1]);
        // C (score 8) is no longer among the cheapest two.
        assert_eq!(sel.to_uncordon, vec![2]);
        assert_eq!(sel.net_change(), 1);
    }

    #[test]
    fn selection_completeness() {
        // After applying, exactly min(k, L) nodes are unschedulable.
        let nodes = vec![
            node("a", true),
            node("b", false),
            node("c", true),
            node("d", false),
            node("e", false),
        ];

        for k in 0..=7 {
            let sel = select_unschedulable(&nodes, k, |_| 1.0);
            let after = apply(&nodes, &sel);
            let blocked = after.iter().filter(|n| n.unschedulable).count();
            assert_eq!(blocked, k.min(nodes.len()), "k={}", k);
        }
    }

    #[test]
    fn minimal_churn_and_idempotence() {
        let nodes = vec![
            node("a", false),
            node("b", true),
            node("c", false),
            node("d", true),
        ];
        let scores = [3.0, 1.0, 2.0, 4.0];
        let score = |n: &ClusterNode| match n.name.as_str() {
            "a" => scores[0],
            "b" => scores[1],
            "c" => scores[2],
            "d" => scores[3],
            _ => unreachable!(),
        };

        let sel = select_unschedulable(&nodes, 2, score);
        let after = apply(&nodes, &sel);

        // Re-running on the post-apply snapshot yields an empty delta.
        let again = select_unschedulable(&after, 2, score);
        assert!(again.is_empty());
    }

    #[test]
    fn priority_correctness_lowest_scores_end_blocked() {
        let nodes = vec![
            node("n0", false),
            node("n1", false),
            node("n2", false),
            node("n3", false),
        ];
        let scores = [7.0, 1.0, 5.0, 3.0];

        let sel = select_unschedulable(&nodes, 2, |n| {
            scores[n.name.strip_prefix('n').unwrap().parse::<usize>().unwrap()]
        });
        let after = apply(&nodes, &sel);

        let blocked: Vec<&str> = after
            .iter()
            .filter(|n| n.unschedulable)
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(blocked, vec!["n1", "n3"]);
    }

    #[test]
    fn equal_scores_prefer_earlier_input_order() {
        // All scores tie; the first k listed nodes are cordoned.
        let nodes = vec![node("x", false), node("y", false), node("z", false)];
        let sel = select_unschedulable(&nodes, 2, |_| 4.0);
        assert_eq!(sel.to_cordon, vec![0, 1]);
        assert!(sel.to_uncordon.is_empty());
    }

    #[test]
    fn tie_at_cutoff_boundary_resolved_by_input_order() {
        // Scores [1, 2, 2, 2] with k=2: the boundary tie between indices
        // 1..=3 goes to index 1, the earliest listed.
        let nodes = vec![
            node("n0", false),
            node("n1", false),
            node("n2", true),
            node("n3", false),
        ];
        let scores = [1.0, 2.0, 2.0, 2.0];

        let sel = select_unschedulable(&nodes, 2, |n| {
            scores[n.name.strip_prefix('n').unwrap().parse::<usize>().unwrap()]
        });

        assert_eq!(sel.to_cordon, vec![0, 1]);
        // n2 loses its cordon: it tied but sits later in the input.
        assert_eq!(sel.to_uncordon, vec![2]);
    }

    #[test]
    fn desired_larger_than_input_cordons_everything() {
        let nodes = vec![node("a", false), node("b", true)];
        let sel = select_unschedulable(&nodes, 10, |_| 1.0);
        assert_eq!(sel.to_cordon, vec![0]);
        assert!(sel.to_uncordon.is_empty());
    }

    #[test]
    fn desired_zero_uncordons_everything_blocked() {
        let nodes = vec![node("a", true), node("b", true), node("c", false)];
        let sel = select_unschedulable(&nodes, 0, |_| 1.0);
        assert!(sel.to_cordon.is_empty());
        assert_eq!(sel.to_uncordon.len(), 2);
        assert_eq!(sel.net_change(), -2);
    }

    #[test]
    fn net_change_sign_matches_direction() {
        // 5 schedulable nodes, raising the target from 1 to 3.
        let nodes: Vec<ClusterNode> = (0..5).map(|i| node(&format!("n{}", i), false)).collect();

        let sel = select_unschedulable(&nodes, 3, |_| 1.0);
        assert_eq!(sel.net_change(), 3);
        assert!(sel.to_uncordon.is_empty());

        let after = apply(&nodes, &sel);
        let sel = select_unschedulable(&after, 1, |_| 1.0);
        assert_eq!(sel.net_change(), -2);
    }

    #[test]
    fn empty_input_yields_empty_selection() {
        let sel = select_unschedulable(&[], 3, |_| 1.0);
        assert!(sel.is_empty());
    }
}
