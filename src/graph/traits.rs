// Graph trait abstraction for community detection
use super::{VertexId, Weight};

/// Read-only view of an undirected weighted graph.
///
/// All methods are read-only and require no interior mutability, so any
/// implementor can be scored or measured while another component holds a
/// shared borrow.
///
/// Weights follow the degree convention used across the crate: a loop counts
/// once in its vertex's degree, every other edge counts once at each endpoint.
pub trait WeightedAdjacency {
    /// Iterator over the neighbours of one vertex together with edge weights.
    type NeighborIter<'a>: Iterator<Item = (VertexId, Weight)> + Clone + 'a
    where
        Self: 'a;

    /// Ascending iterator over all live vertices.
    fn vertices(&self) -> impl Iterator<Item = VertexId> + '_;

    /// Neighbours of `v` (a loop shows up as `v` itself). Empty if `v` is absent.
    fn neighbors(&self, v: VertexId) -> Self::NeighborIter<'_>;

    /// Weighted degree of `v`.
    fn degree(&self, v: VertexId) -> Weight;

    /// Sum of all weighted degrees.
    fn total_weight(&self) -> Weight;

    /// Returns all undirected edges (u, v, w) with u <= v.
    fn edges(&self) -> impl Iterator<Item = (VertexId, VertexId, Weight)> + '_ {
        self.vertices().flat_map(move |u| {
            self.neighbors(u)
                .filter(move |&(v, _)| u <= v)
                .map(move |(v, w)| (u, v, w))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    /// Simple in-memory undirected graph for testing.
    struct TestGraph {
        adj: BTreeMap<VertexId, Vec<(VertexId, Weight)>>,
    }

    impl WeightedAdjacency for TestGraph {
        type NeighborIter<'a> = std::iter::Copied<std::slice::Iter<'a, (VertexId, Weight)>>;

        fn vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
            self.adj.keys().copied()
        }
        fn neighbors(&self, v: VertexId) -> Self::NeighborIter<'_> {
            self.adj.get(&v).map_or(&[][..], |n| n.as_slice()).iter().copied()
        }
        fn degree(&self, v: VertexId) -> Weight {
            self.neighbors(v).map(|(_, w)| w).sum()
        }
        fn total_weight(&self) -> Weight {
            self.vertices().map(|v| self.degree(v)).sum()
        }
    }

    #[test]
    fn test_edges_path_with_loop() {
        // 0-1-2 path plus a loop on 2
        let mut adj = BTreeMap::new();
        adj.insert(0, vec![(1, 1.0)]);
        adj.insert(1, vec![(0, 1.0), (2, 2.0)]);
        adj.insert(2, vec![(1, 2.0), (2, 0.5)]);
        let g = TestGraph { adj };
        let edges: Vec<_> = g.edges().collect();
        assert_eq!(edges, vec![(0, 1, 1.0), (1, 2, 2.0), (2, 2, 0.5)]);
        assert_eq!(g.total_weight(), 2.0 * 3.0 + 0.5);
    }
}
