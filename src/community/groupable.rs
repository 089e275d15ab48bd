//! Weighted graph plus community assignment with incremental aggregates.
//!
//! [`GroupableGraph`] keeps, for every live community, the weight of its
//! internal edges, the sum of its members' degrees and its size. Those
//! aggregates are updated in O(degree) on every vertex move and in O(1) on
//! every edge change; they are recomputed from scratch only when a graph is
//! built from a seeded assignment.
//!
//! ## Weight convention
//!
//! - `inner(c)`: twice the weight of non-loop edges inside `c` plus the
//!   weight of loops inside `c` ("stubs" inside the community).
//! - `total(c)`: sum of the weighted degrees of the members of `c`.
//! - `boundary(c) = total(c) - inner(c)`: weight leaving `c`.
//!
//! [`GroupableGraph::collapse`] turns every community into one vertex whose
//! loop carries `inner(c)`, so the collapsed graph has the same
//! `total_weight` and the same modularity as the partition it came from.

use super::assignment::{CommunityId, Departure, ReversibleAssignment};
use super::counters::compute_counters;
use crate::community_error::{CommunityError, Result};
use crate::debug_invariants::DebugInvariants;
use crate::graph::{Neighbors, VertexId, Weight, WeightedAdjacency, WeightedGraph};
use std::collections::BTreeMap;

/// Aggregate weights of one community.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CommunityStats {
    /// Internal stubs: 2 × internal edge weight + loop weight.
    pub inner: Weight,
    /// Sum of member degrees.
    pub total: Weight,
    /// Number of input vertices represented by the members.
    pub size: usize,
}

impl CommunityStats {
    /// Weight of edges with exactly one endpoint in the community.
    #[inline]
    pub fn boundary(&self) -> Weight {
        (self.total - self.inner).max(0.0)
    }
}

/// Everything a criterion needs to know about one vertex to price a move.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexLinks {
    pub vertex: VertexId,
    /// Current community of `vertex`.
    pub community: CommunityId,
    pub degree: Weight,
    pub loop_weight: Weight,
    pub size: usize,
    /// Weight to the other members of `community`.
    pub own_links: Weight,
    /// Weight to each neighbouring community other than `community`, ascending by id.
    pub links: BTreeMap<CommunityId, Weight>,
}

impl VertexLinks {
    /// Weight from the vertex to community `c` (loops excluded).
    #[inline]
    pub fn links_to(&self, c: CommunityId) -> Weight {
        if c == self.community {
            self.own_links
        } else {
            self.links.get(&c).copied().unwrap_or(0.0)
        }
    }
}

/// A collapsed graph and the community each of its vertices stands for.
#[derive(Debug, Clone)]
pub struct Collapse {
    /// One vertex per community, singleton assignment.
    pub graph: GroupableGraph,
    /// `origin[i]` is the community collapsed into vertex `i` (ascending).
    pub origin: Vec<CommunityId>,
}

impl Collapse {
    /// Vertex of the collapsed graph that stands for community `c`.
    pub fn coarse_vertex(&self, c: CommunityId) -> Option<VertexId> {
        self.origin.binary_search(&c).ok()
    }
}

/// Undirected weighted graph whose vertices are grouped into communities.
#[derive(Debug, Clone, Default)]
pub struct GroupableGraph {
    graph: WeightedGraph,
    assignment: ReversibleAssignment,
    sizes: Vec<usize>,
    stats: Vec<CommunityStats>,
    total_size: usize,
}

fn make_key(a: VertexId, b: VertexId) -> (VertexId, VertexId) {
    if a < b { (a, b) } else { (b, a) }
}

impl GroupableGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps `graph` with every vertex in its own community.
    pub fn from_graph(graph: WeightedGraph) -> Self {
        let mut sizes = vec![0; graph.id_bound()];
        for v in graph.vertices() {
            sizes[v] = 1;
        }
        Self::from_parts(graph, sizes)
    }

    /// Singleton assignment over `graph` with explicit vertex sizes.
    fn from_parts(graph: WeightedGraph, sizes: Vec<usize>) -> Self {
        let assignment = ReversibleAssignment::singletons(graph.vertices());
        let mut stats = vec![CommunityStats::default(); graph.id_bound()];
        let mut total_size = 0;
        for v in graph.vertices() {
            stats[v] = CommunityStats {
                inner: graph.loop_weight(v),
                total: graph.degree(v),
                size: sizes[v],
            };
            total_size += sizes[v];
        }
        Self {
            graph,
            assignment,
            sizes,
            stats,
            total_size,
        }
    }

    /// Wraps `graph` with a prior partition.
    ///
    /// `labels` maps vertices to arbitrary group labels; vertices sharing a
    /// label form one community named after its smallest member. Vertices
    /// without a label start alone. Aggregates are rebuilt from scratch.
    pub fn with_assignment<I>(graph: WeightedGraph, labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = (VertexId, u64)>,
    {
        let mut groups: BTreeMap<u64, Vec<VertexId>> = BTreeMap::new();
        for (v, label) in labels {
            if !graph.contains_vertex(v) {
                return Err(CommunityError::VertexNotFound(v));
            }
            groups.entry(label).or_default().push(v);
        }
        let mut this = Self::from_graph(graph);
        for mut members in groups.into_values() {
            members.sort_unstable();
            members.dedup();
            let Some((&rep, rest)) = members.split_first() else {
                continue;
            };
            // a vertex listed under two labels ends up in the later group
            this.assignment.isolate(rep)?;
            for &m in rest {
                this.assignment.move_vertex(m, rep)?;
            }
        }
        this.rebuild_stats();
        Ok(this)
    }

    /// Recomputes every community aggregate from the edges.
    pub fn rebuild_stats(&mut self) {
        let counters = compute_counters(&self.graph, |v| self.assignment.community_of(v));
        let mut stats = vec![CommunityStats::default(); self.graph.id_bound()];
        for (&c, &total) in &counters.total {
            stats[c].total = total;
            stats[c].inner = counters.inner.get(&c).copied().unwrap_or(0.0);
        }
        for (v, c) in self.assignment.iter() {
            stats[c].size += self.sizes[v];
        }
        self.stats = stats;
    }

    fn ensure_len(&mut self, v: VertexId) {
        if v >= self.sizes.len() {
            self.sizes.resize(v + 1, 0);
            self.stats.resize(v + 1, CommunityStats::default());
        }
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    #[inline]
    pub fn graph(&self) -> &WeightedGraph {
        &self.graph
    }

    #[inline]
    pub fn assignment(&self) -> &ReversibleAssignment {
        &self.assignment
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.graph.vertex_count()
    }

    #[inline]
    pub fn community_count(&self) -> usize {
        self.assignment.community_count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    #[inline]
    pub fn community_of(&self, v: VertexId) -> Option<CommunityId> {
        self.assignment.community_of(v)
    }

    /// Live community ids in ascending order.
    pub fn communities(&self) -> impl Iterator<Item = CommunityId> + '_ {
        self.assignment.communities()
    }

    /// Aggregates of community `c`, if it exists.
    pub fn stats(&self, c: CommunityId) -> Option<CommunityStats> {
        if self.assignment.contains_community(c) {
            self.stats.get(c).copied()
        } else {
            None
        }
    }

    /// Internal stubs of `c` (0 for an unknown community).
    pub fn inner_weight(&self, c: CommunityId) -> Weight {
        self.stats(c).map_or(0.0, |s| s.inner)
    }

    /// Degree sum of `c` (0 for an unknown community).
    pub fn community_weight(&self, c: CommunityId) -> Weight {
        self.stats(c).map_or(0.0, |s| s.total)
    }

    /// Weight of the edges between communities `a` and `b` (O(vol(a))).
    ///
    /// For `a == b` this is the community's internal stubs.
    pub fn weight_between(&self, a: CommunityId, b: CommunityId) -> Result<Weight> {
        if a == b {
            return self
                .stats(a)
                .map(|s| s.inner)
                .ok_or(CommunityError::CommunityNotFound(a));
        }
        if !self.assignment.contains_community(b) {
            return Err(CommunityError::CommunityNotFound(b));
        }
        let mut w = 0.0;
        for m in self.assignment.sorted_members(a)? {
            w += self
                .graph
                .neighbors(m)
                .filter(|&(u, _)| self.community_of(u) == Some(b))
                .map(|(_, x)| x)
                .sum::<Weight>();
        }
        Ok(w)
    }

    /// Neighbouring communities of `c` with the weight towards each.
    pub fn neighbouring_communities(&self, c: CommunityId) -> Result<BTreeMap<CommunityId, Weight>> {
        let mut out = BTreeMap::new();
        for m in self.assignment.sorted_members(c)? {
            for (u, w) in self.graph.neighbors(m) {
                match self.community_of(u) {
                    Some(cu) if cu != c => *out.entry(cu).or_insert(0.0) += w,
                    _ => {}
                }
            }
        }
        Ok(out)
    }

    /// Size (number of represented input vertices) of `v`.
    #[inline]
    pub fn vertex_size(&self, v: VertexId) -> usize {
        self.sizes.get(v).copied().unwrap_or(0)
    }

    /// Sum of all vertex sizes.
    #[inline]
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    /// Gathers the weights from `v` to its own and neighbouring communities.
    pub fn links(&self, v: VertexId) -> Result<VertexLinks> {
        let community = self
            .community_of(v)
            .ok_or(CommunityError::VertexNotFound(v))?;
        let mut out = VertexLinks {
            vertex: v,
            community,
            degree: 0.0,
            loop_weight: 0.0,
            size: self.vertex_size(v),
            own_links: 0.0,
            links: BTreeMap::new(),
        };
        for (u, w) in self.graph.neighbors(v) {
            out.degree += w;
            if u == v {
                out.loop_weight = w;
                continue;
            }
            match self.community_of(u) {
                Some(c) if c == community => out.own_links += w,
                Some(c) => *out.links.entry(c).or_insert(0.0) += w,
                None => {}
            }
        }
        Ok(out)
    }

    // ------------------------------------------------------------------
    // Structural edits
    // ------------------------------------------------------------------

    /// Adds `v` as a singleton community of size 1. Returns `false` if it existed.
    pub fn add_vertex(&mut self, v: VertexId) -> bool {
        self.add_vertex_sized(v, 1)
    }

    fn add_vertex_sized(&mut self, v: VertexId, size: usize) -> bool {
        if !self.graph.add_vertex(v) {
            return false;
        }
        self.ensure_len(v);
        self.assignment.insert_singleton(v);
        self.sizes[v] = size;
        self.stats[v] = CommunityStats {
            inner: 0.0,
            total: 0.0,
            size,
        };
        self.total_size += size;
        true
    }

    #[inline]
    pub fn contains_vertex(&self, v: VertexId) -> bool {
        self.graph.contains_vertex(v)
    }

    /// Removes `v`, its incident edges, and evicts it from its community.
    pub fn remove_vertex(&mut self, v: VertexId) -> Result<()> {
        let incident: Vec<VertexId> = self.graph.neighbors(v).map(|(u, _)| u).collect();
        if !self.graph.contains_vertex(v) {
            return Err(CommunityError::VertexNotFound(v));
        }
        for u in incident {
            self.remove_edge(v, u)?;
        }
        self.graph.remove_vertex(v)?;
        let departure = self.assignment.evict(v)?;
        let size = self.sizes[v];
        self.stats[departure.previous()].size -= size;
        self.apply_departure(departure);
        self.sizes[v] = 0;
        self.total_size -= size;
        Ok(())
    }

    /// Inserts edge `{u, v}`; see [`WeightedGraph::add_edge`].
    pub fn add_edge(
        &mut self,
        u: VertexId,
        v: VertexId,
        weight: Weight,
        replace: bool,
    ) -> Result<Option<Weight>> {
        let previous = self.graph.add_edge(u, v, weight, replace)?;
        self.account_edge(u, v, weight - previous.unwrap_or(0.0));
        Ok(previous)
    }

    /// Removes edge `{u, v}` and returns its weight.
    pub fn remove_edge(&mut self, u: VertexId, v: VertexId) -> Result<Weight> {
        let weight = self.graph.remove_edge(u, v)?;
        self.account_edge(u, v, -weight);
        Ok(weight)
    }

    fn account_edge(&mut self, u: VertexId, v: VertexId, delta: Weight) {
        let (Some(cu), Some(cv)) = (self.community_of(u), self.community_of(v)) else {
            return;
        };
        if u == v {
            self.stats[cu].inner += delta;
            self.stats[cu].total += delta;
        } else if cu == cv {
            self.stats[cu].inner += 2.0 * delta;
            self.stats[cu].total += 2.0 * delta;
        } else {
            self.stats[cu].total += delta;
            self.stats[cv].total += delta;
        }
    }

    fn apply_departure(&mut self, departure: Departure) {
        match departure {
            Departure::Kept(_) => {}
            Departure::Relabelled { from, to } => {
                self.stats[to] = self.stats[from];
                self.stats[from] = CommunityStats::default();
            }
            Departure::Emptied(c) => self.stats[c] = CommunityStats::default(),
        }
    }

    // ------------------------------------------------------------------
    // Community moves
    // ------------------------------------------------------------------

    /// Moves `v` into community `target`. Returns `false` if it was already there.
    pub fn move_vertex(&mut self, v: VertexId, target: CommunityId) -> Result<bool> {
        let links = self.links(v)?;
        self.commit_move(&links, target)
    }

    /// Moves the vertex described by `links` (gathered on the current state).
    pub(crate) fn commit_move(&mut self, links: &VertexLinks, target: CommunityId) -> Result<bool> {
        let from = links.community;
        if target == from {
            return Ok(false);
        }
        if !self.assignment.contains_community(target) {
            return Err(CommunityError::CommunityNotFound(target));
        }
        let to_links = links.links_to(target);

        let src = &mut self.stats[from];
        src.inner -= 2.0 * links.own_links + links.loop_weight;
        src.total -= links.degree;
        src.size -= links.size;

        let dst = &mut self.stats[target];
        dst.inner += 2.0 * to_links + links.loop_weight;
        dst.total += links.degree;
        dst.size += links.size;

        if let Some(departure) = self.assignment.move_vertex(links.vertex, target)? {
            self.apply_departure(departure);
        }
        Ok(true)
    }

    /// Moves `v` into a new singleton community. Returns `false` if it was alone.
    pub fn isolate_vertex(&mut self, v: VertexId) -> Result<bool> {
        let links = self.links(v)?;
        let from = links.community;
        if self.assignment.member_count(from) == 1 {
            return Ok(false);
        }
        let src = &mut self.stats[from];
        src.inner -= 2.0 * links.own_links + links.loop_weight;
        src.total -= links.degree;
        src.size -= links.size;

        if let Some(departure) = self.assignment.isolate(v)? {
            self.apply_departure(departure);
        }
        self.stats[v] = CommunityStats {
            inner: links.loop_weight,
            total: links.degree,
            size: links.size,
        };
        Ok(true)
    }

    /// Splits community `c` back into singletons. Returns the number of moves.
    pub fn disband(&mut self, c: CommunityId) -> Result<usize> {
        let mut moved = 0;
        for m in self.assignment.sorted_members(c)? {
            if m != c && self.isolate_vertex(m)? {
                moved += 1;
            }
        }
        Ok(moved)
    }

    /// Moves every member of `absorb` into `keep`; `keep` keeps its id.
    pub fn merge_communities(&mut self, keep: CommunityId, absorb: CommunityId) -> Result<CommunityId> {
        if keep == absorb {
            return if self.assignment.contains_community(keep) {
                Ok(keep)
            } else {
                Err(CommunityError::CommunityNotFound(keep))
            };
        }
        let cross = self.weight_between(absorb, keep)?;
        self.assignment.merge_communities(keep, absorb)?;
        let absorbed = std::mem::take(&mut self.stats[absorb]);
        let kept = &mut self.stats[keep];
        kept.inner += absorbed.inner + 2.0 * cross;
        kept.total += absorbed.total;
        kept.size += absorbed.size;
        Ok(keep)
    }

    // ------------------------------------------------------------------
    // Aggregation
    // ------------------------------------------------------------------

    /// Builds the reduced graph with one vertex per community.
    ///
    /// Cross-community weights are summed; each coarse vertex carries a loop
    /// equal to its community's internal stubs and the summed member sizes.
    pub fn collapse(&self) -> Result<Collapse> {
        // 1. Number communities densely, in ascending id order
        let origin: Vec<CommunityId> = self.assignment.communities().collect();
        let k = origin.len();
        let mut index = vec![usize::MAX; self.graph.id_bound()];
        for (i, &c) in origin.iter().enumerate() {
            index[c] = i;
        }

        // 2. Fold every edge into an internal or a cross-community bucket
        let mut inner = vec![0.0; k];
        let mut has_inner = vec![false; k];
        let mut cross: BTreeMap<(VertexId, VertexId), Weight> = BTreeMap::new();
        for (u, v, w) in self.graph.edges() {
            let (Some(cu), Some(cv)) = (self.community_of(u), self.community_of(v)) else {
                continue;
            };
            let (iu, iv) = (index[cu], index[cv]);
            if iu == iv {
                inner[iu] += if u == v { w } else { 2.0 * w };
                has_inner[iu] = true;
            } else {
                *cross.entry(make_key(iu, iv)).or_insert(0.0) += w;
            }
        }

        // 3. Materialize the coarse graph
        let mut coarse = WeightedGraph::with_capacity(k);
        for i in 0..k {
            coarse.add_vertex(i);
        }
        for ((a, b), w) in cross {
            coarse.add_edge(a, b, w, false)?;
        }
        for (i, w) in inner.into_iter().enumerate() {
            if has_inner[i] {
                coarse.add_edge(i, i, w, false)?;
            }
        }
        let sizes = origin.iter().map(|&c| self.stats[c].size).collect();

        Ok(Collapse {
            graph: Self::from_parts(coarse, sizes),
            origin,
        })
    }

    /// Applies the grouping found on a collapsed graph back to this graph.
    ///
    /// Every coarse community merges the communities it stands for into the
    /// one with the smallest id. Returns the number of merges.
    pub fn absorb(&mut self, coarse: &GroupableGraph, origin: &[CommunityId]) -> Result<usize> {
        let mut merges = 0;
        for cc in coarse.communities() {
            let members = coarse.assignment.sorted_members(cc)?;
            let Some((&first, rest)) = members.split_first() else {
                continue;
            };
            let keep = origin[first];
            for &m in rest {
                self.merge_communities(keep, origin[m])?;
                merges += 1;
            }
        }
        Ok(merges)
    }
}

impl WeightedAdjacency for GroupableGraph {
    type NeighborIter<'a> = Neighbors<'a>;

    fn vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.graph.vertices()
    }

    fn neighbors(&self, v: VertexId) -> Neighbors<'_> {
        self.graph.neighbors(v)
    }

    fn degree(&self, v: VertexId) -> Weight {
        self.graph.degree(v)
    }

    fn total_weight(&self) -> Weight {
        self.graph.total_weight()
    }
}

impl DebugInvariants for GroupableGraph {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "GroupableGraph");
    }

    fn validate_invariants(&self) -> Result<()> {
        self.assignment.validate_invariants()?;
        if self.assignment.vertex_count() != self.graph.vertex_count() {
            return Err(CommunityError::InvariantViolation(format!(
                "{} vertices in the graph, {} assigned",
                self.graph.vertex_count(),
                self.assignment.vertex_count()
            )));
        }
        let counters = compute_counters(&self.graph, |v| self.community_of(v));
        let tol = 1e-9 * self.graph.total_weight().max(1.0);
        for c in self.communities() {
            let s = self.stats[c];
            let inner = counters.inner.get(&c).copied().unwrap_or(0.0);
            let total = counters.total.get(&c).copied().unwrap_or(0.0);
            if (s.inner - inner).abs() > tol || (s.total - total).abs() > tol {
                return Err(CommunityError::InvariantViolation(format!(
                    "community {c}: tracked (inner {}, total {}) but counted (inner {inner}, total {total})",
                    s.inner, s.total
                )));
            }
            let size: usize = self
                .assignment
                .members_of(c)?
                .map(|v| self.vertex_size(v))
                .sum();
            if size != s.size {
                return Err(CommunityError::InvariantViolation(format!(
                    "community {c}: tracked size {} but counted {size}",
                    s.size
                )));
            }
        }
        Ok(())
    }
}
