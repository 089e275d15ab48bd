//! Partition quality metrics computed from scratch.
//!
//! These functions ignore every incrementally maintained aggregate and walk
//! the edges directly. They are intended for tests, debugging and
//! cross-checking the optimizer, not for use inside it.

use crate::community::{CommunityId, compute_counters};
use crate::graph::{VertexId, Weight, WeightedAdjacency};
use itertools::Itertools;

/// Modularity of the labelling `community_of` over `g` (O(V + E)).
///
/// Vertices without a label are left out of every community, their degree
/// still counts in the total weight. Returns 0 for a graph without weight.
pub fn modularity_from_scratch<G, F>(g: &G, community_of: F, resolution: f64) -> f64
where
    G: WeightedAdjacency,
    F: Fn(VertexId) -> Option<CommunityId>,
{
    let counters = compute_counters(g, community_of);
    let m2 = counters.total_weight;
    if m2 <= 0.0 {
        return 0.0;
    }
    counters
        .total
        .iter()
        .map(|(c, &total)| {
            let inner = counters.inner.get(c).copied().unwrap_or(0.0);
            inner / m2 - resolution * (total / m2).powi(2)
        })
        .sum()
}

/// Total weight of edges whose endpoints lie in different communities (O(E)).
pub fn edge_cut<G, F>(g: &G, community_of: F) -> Weight
where
    G: WeightedAdjacency,
    F: Fn(VertexId) -> Option<CommunityId>,
{
    g.edges()
        .filter(|&(u, v, _)| community_of(u) != community_of(v))
        .map(|(_, _, w)| w)
        .sum()
}

/// Number of vertices per community, ascending by community id.
pub fn community_sizes<I>(assignment: I) -> Vec<(CommunityId, usize)>
where
    I: IntoIterator<Item = (VertexId, CommunityId)>,
{
    assignment
        .into_iter()
        .map(|(_, c)| c)
        .counts()
        .into_iter()
        .sorted_unstable()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::community::GroupableGraph;
    use crate::criterion::{Criterion, Modularity};
    use crate::graph::WeightedGraph;

    fn bridged() -> WeightedGraph {
        let mut g = WeightedGraph::new();
        for v in 0..6 {
            g.add_vertex(v);
        }
        for &(u, v) in &[(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5)] {
            g.add_edge(u, v, 1.0, false).unwrap();
        }
        g.add_edge(2, 3, 2.0, false).unwrap();
        g
    }

    fn halves(v: VertexId) -> Option<CommunityId> {
        Some(if v < 3 { 0 } else { 3 })
    }

    #[test]
    fn edge_cut_counts_crossing_weight() {
        let g = bridged();
        assert_eq!(edge_cut(&g, halves), 2.0);
        assert_eq!(edge_cut(&g, |_| Some(0)), 0.0);
    }

    #[test]
    fn from_scratch_matches_incremental_score() {
        let g = bridged();
        let mut grouped = GroupableGraph::from_graph(g.clone());
        for (v, c) in [(1, 0), (2, 0), (4, 3), (5, 3)] {
            grouped.move_vertex(v, c).unwrap();
        }
        let direct = modularity_from_scratch(&g, halves, 1.0);
        let incremental = Modularity::default().score(&grouped);
        assert!((direct - incremental).abs() < 1e-12);
        assert_eq!(modularity_from_scratch(&WeightedGraph::new(), halves, 1.0), 0.0);
    }

    #[test]
    fn sizes_sorted_by_id() {
        let sizes = community_sizes([(0, 4), (1, 4), (2, 0), (3, 4)]);
        assert_eq!(sizes, vec![(0, 1), (4, 3)]);
    }
}
