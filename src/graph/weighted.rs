//! Adjacency-based undirected weighted graph.
//!
//! Vertices are dense `usize` handles; a slot holds `None` once its vertex is
//! removed, so handles held elsewhere never shift. Each live vertex owns an
//! ordered neighbour map, which keeps every traversal deterministic.

use super::traits::WeightedAdjacency;
use super::{VertexId, Weight};
use crate::community_error::{CommunityError, Result};
use std::collections::BTreeMap;
use std::collections::btree_map;

/// Undirected weighted graph with loops and without parallel edges.
///
/// `total_weight` is the sum of weighted degrees: every non-loop edge counts
/// twice and a loop counts once. The convention is fixed for the lifetime of
/// the crate and is what keeps totals equal across a collapse.
#[derive(Debug, Clone, Default)]
pub struct WeightedGraph {
    adjacency: Vec<Option<BTreeMap<VertexId, Weight>>>,
    degrees: Vec<Weight>,
    vertex_count: usize,
    edge_count: usize,
    total_weight: Weight,
}

/// Lazy, restartable (via `Clone`) neighbour sequence of one vertex.
#[derive(Debug, Clone)]
pub struct Neighbors<'a> {
    inner: Option<btree_map::Iter<'a, VertexId, Weight>>,
}

impl Iterator for Neighbors<'_> {
    type Item = (VertexId, Weight);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.as_mut()?.next().map(|(&v, &w)| (v, w))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.as_ref().map_or((0, Some(0)), |it| it.size_hint())
    }
}

/// Weights must be finite and non-negative; NaN never reaches scoring.
pub(crate) fn check_weight(weight: Weight) -> Result<()> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(())
    } else {
        Err(CommunityError::InvalidWeight(weight))
    }
}

impl WeightedGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty graph with room for vertex handles `0..capacity`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            adjacency: Vec::with_capacity(capacity),
            degrees: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// One past the largest vertex handle ever used.
    #[inline]
    pub fn id_bound(&self) -> usize {
        self.adjacency.len()
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Number of undirected edges, loops included.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertex_count == 0
    }

    #[inline]
    pub fn contains_vertex(&self, v: VertexId) -> bool {
        matches!(self.adjacency.get(v), Some(Some(_)))
    }

    fn slot(&self, v: VertexId) -> Result<&BTreeMap<VertexId, Weight>> {
        self.adjacency
            .get(v)
            .and_then(Option::as_ref)
            .ok_or(CommunityError::VertexNotFound(v))
    }

    fn slot_mut(&mut self, v: VertexId) -> Result<&mut BTreeMap<VertexId, Weight>> {
        self.adjacency
            .get_mut(v)
            .and_then(Option::as_mut)
            .ok_or(CommunityError::VertexNotFound(v))
    }

    /// Adds vertex `v`. Returns `false` if it already existed.
    pub fn add_vertex(&mut self, v: VertexId) -> bool {
        if v >= self.adjacency.len() {
            self.adjacency.resize_with(v + 1, || None);
            self.degrees.resize(v + 1, 0.0);
        }
        match &mut self.adjacency[v] {
            Some(_) => false,
            slot @ None => {
                *slot = Some(BTreeMap::new());
                self.vertex_count += 1;
                true
            }
        }
    }

    /// Removes `v` and every incident edge, returning the removed edges as
    /// `(neighbour, weight)` pairs (a loop appears as `(v, w)`).
    pub fn remove_vertex(&mut self, v: VertexId) -> Result<Vec<(VertexId, Weight)>> {
        let incident: Vec<(VertexId, Weight)> =
            self.slot(v)?.iter().map(|(&u, &w)| (u, w)).collect();
        for &(u, _) in &incident {
            self.remove_edge(v, u)?;
        }
        self.adjacency[v] = None;
        self.degrees[v] = 0.0;
        self.vertex_count -= 1;
        Ok(incident)
    }

    /// Inserts the undirected edge `{u, v}`.
    ///
    /// Both endpoints must exist. If the edge is already present its weight
    /// is overwritten when `replace` is set and the previous weight is
    /// returned; otherwise the call fails with `DuplicateEdge`.
    pub fn add_edge(
        &mut self,
        u: VertexId,
        v: VertexId,
        weight: Weight,
        replace: bool,
    ) -> Result<Option<Weight>> {
        check_weight(weight)?;
        self.slot(v)?;
        let previous = self.slot(u)?.get(&v).copied();
        if previous.is_some() && !replace {
            return Err(CommunityError::DuplicateEdge(u as u64, v as u64));
        }
        self.slot_mut(u)?.insert(v, weight);
        if u != v {
            self.slot_mut(v)?.insert(u, weight);
        }
        let delta = weight - previous.unwrap_or(0.0);
        self.degrees[u] += delta;
        if u != v {
            self.degrees[v] += delta;
        }
        let multiplicity = if u == v { 1.0 } else { 2.0 };
        self.total_weight += multiplicity * delta;
        if previous.is_none() {
            self.edge_count += 1;
        }
        Ok(previous)
    }

    /// Removes the undirected edge `{u, v}` and returns its weight.
    pub fn remove_edge(&mut self, u: VertexId, v: VertexId) -> Result<Weight> {
        self.slot(v)?;
        let weight = self
            .slot_mut(u)?
            .remove(&v)
            .ok_or(CommunityError::EdgeNotFound(u as u64, v as u64))?;
        if u != v {
            self.slot_mut(v)?.remove(&u);
            self.total_weight -= 2.0 * weight;
        } else {
            self.total_weight -= weight;
        }
        self.drop_degree(u, weight);
        if u != v {
            self.drop_degree(v, weight);
        }
        self.edge_count -= 1;
        if self.edge_count == 0 {
            // drop accumulated rounding noise
            self.total_weight = 0.0;
        }
        Ok(weight)
    }

    /// An isolated vertex snaps back to an exact zero degree.
    fn drop_degree(&mut self, v: VertexId, weight: Weight) {
        self.degrees[v] = if self.neighbor_count(v) == 0 {
            0.0
        } else {
            self.degrees[v] - weight
        };
    }

    /// Weight of `{u, v}`, or 0 if there is no such edge.
    ///
    /// Use [`WeightedGraph::edge`] to tell a missing edge from a zero-weight one.
    #[inline]
    pub fn weight(&self, u: VertexId, v: VertexId) -> Weight {
        self.edge(u, v).unwrap_or(0.0)
    }

    /// Weight of `{u, v}` if the edge exists.
    pub fn edge(&self, u: VertexId, v: VertexId) -> Option<Weight> {
        self.adjacency.get(u)?.as_ref()?.get(&v).copied()
    }

    /// Weight of the loop on `v` (0 without one).
    #[inline]
    pub fn loop_weight(&self, v: VertexId) -> Weight {
        self.weight(v, v)
    }

    /// Number of distinct neighbours of `v` (a loop counts as one).
    pub fn neighbor_count(&self, v: VertexId) -> usize {
        self.adjacency
            .get(v)
            .and_then(Option::as_ref)
            .map_or(0, BTreeMap::len)
    }

}

impl WeightedAdjacency for WeightedGraph {
    type NeighborIter<'a> = Neighbors<'a>;

    fn vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.adjacency
            .iter()
            .enumerate()
            .filter_map(|(v, slot)| slot.as_ref().map(|_| v))
    }

    fn neighbors(&self, v: VertexId) -> Neighbors<'_> {
        Neighbors {
            inner: self.adjacency.get(v).and_then(Option::as_ref).map(BTreeMap::iter),
        }
    }

    #[inline]
    fn degree(&self, v: VertexId) -> Weight {
        self.degrees.get(v).copied().unwrap_or(0.0)
    }

    #[inline]
    fn total_weight(&self) -> Weight {
        self.total_weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> WeightedGraph {
        let mut g = WeightedGraph::new();
        for v in 0..3 {
            g.add_vertex(v);
        }
        g.add_edge(0, 1, 1.0, false).unwrap();
        g.add_edge(1, 2, 1.0, false).unwrap();
        g.add_edge(2, 0, 1.0, false).unwrap();
        g
    }

    #[test]
    fn degrees_and_total_weight() {
        let mut g = triangle();
        assert_eq!(g.total_weight(), 6.0);
        assert_eq!(g.degree(0), 2.0);
        g.add_edge(0, 0, 0.5, false).unwrap();
        // loop counts once in both the degree and the total
        assert_eq!(g.degree(0), 2.5);
        assert_eq!(g.total_weight(), 6.5);
        assert_eq!(g.edge_count(), 4);
    }

    #[test]
    fn duplicate_edge_rejected_unless_replace() {
        let mut g = triangle();
        assert_eq!(
            g.add_edge(1, 0, 3.0, false),
            Err(CommunityError::DuplicateEdge(1, 0))
        );
        assert_eq!(g.add_edge(1, 0, 3.0, true), Ok(Some(1.0)));
        assert_eq!(g.weight(0, 1), 3.0);
        assert_eq!(g.total_weight(), 10.0);
        assert_eq!(g.edge_count(), 3);
    }

    #[test]
    fn invalid_weights_rejected() {
        let mut g = triangle();
        assert!(matches!(
            g.add_edge(0, 1, -1.0, true),
            Err(CommunityError::InvalidWeight(_))
        ));
        assert!(matches!(
            g.add_edge(0, 1, f64::NAN, true),
            Err(CommunityError::InvalidWeight(_))
        ));
        assert!(matches!(
            g.add_edge(0, 1, f64::INFINITY, true),
            Err(CommunityError::InvalidWeight(_))
        ));
        assert_eq!(g.weight(0, 1), 1.0);
    }

    #[test]
    fn zero_weight_edge_is_distinguishable() {
        let mut g = triangle();
        g.add_vertex(3);
        g.add_edge(2, 3, 0.0, false).unwrap();
        assert_eq!(g.weight(2, 3), 0.0);
        assert_eq!(g.edge(2, 3), Some(0.0));
        assert_eq!(g.edge(0, 3), None);
    }

    #[test]
    fn remove_edge_and_vertex() {
        let mut g = triangle();
        assert_eq!(g.remove_edge(0, 1), Ok(1.0));
        assert_eq!(g.remove_edge(0, 1), Err(CommunityError::EdgeNotFound(0, 1)));
        let removed = g.remove_vertex(2).unwrap();
        assert_eq!(removed, vec![(0, 1.0), (1, 1.0)]);
        assert_eq!(g.vertex_count(), 2);
        assert_eq!(g.edge_count(), 0);
        assert_eq!(g.total_weight(), 0.0);
        assert_eq!(g.remove_vertex(2), Err(CommunityError::VertexNotFound(2)));
        assert!(!g.contains_vertex(2));
    }

    #[test]
    fn missing_endpoint_is_not_found() {
        let mut g = triangle();
        assert_eq!(
            g.add_edge(0, 9, 1.0, false),
            Err(CommunityError::VertexNotFound(9))
        );
    }

    #[test]
    fn neighbors_are_restartable() {
        let g = triangle();
        let it = g.neighbors(1);
        let first: Vec<_> = it.clone().collect();
        let second: Vec<_> = it.collect();
        assert_eq!(first, second);
        assert_eq!(first, vec![(0, 1.0), (2, 1.0)]);
        assert_eq!(g.neighbors(42).count(), 0);
    }

    #[test]
    fn cached_degrees_follow_edits() {
        let mut g = triangle();
        g.add_vertex(3);
        g.add_edge(0, 1, 4.0, true).unwrap();
        g.add_edge(3, 3, 2.0, false).unwrap();
        g.add_edge(2, 3, 0.5, false).unwrap();
        g.remove_edge(1, 2).unwrap();
        for v in g.vertices().collect::<Vec<_>>() {
            let summed: Weight = g.neighbors(v).map(|(_, w)| w).sum();
            assert!((g.degree(v) - summed).abs() < 1e-12);
        }
        assert_eq!(g.degree(0), 5.0);
        assert_eq!(g.degree(3), 2.5);
        g.remove_vertex(3).unwrap();
        assert_eq!(g.degree(3), 0.0);
        assert_eq!(g.degree(2), 1.0);
        let total: Weight = g.vertices().map(|v| g.degree(v)).sum();
        assert_eq!(total, g.total_weight());
    }
}
