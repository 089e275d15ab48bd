//! Community membership for the optimizer.
//!
//! This module provides [`ReversibleAssignment`], a two-way index between
//! vertices and communities. The forward direction answers "which community
//! is `v` in" for scoring a move, the reverse direction enumerates members
//! for candidate generation and output. Both are dense arrays indexed by
//! vertex handle, so a move never scans the graph.
//!
//! A community is named after one of its members (its representative). The
//! id is stable while members come and go; if the representative itself
//! leaves, the smallest remaining member takes over and the community is
//! relabelled. Hence a live community id is always one of its own members.

use crate::community_error::{CommunityError, Result};
use crate::debug_invariants::DebugInvariants;
use crate::graph::VertexId;
use hashbrown::HashSet;

/// Community identifier: the handle of the community's representative vertex.
pub type CommunityId = VertexId;

/// What happened to the community a vertex left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// The community still exists under the same id.
    Kept(CommunityId),
    /// The representative left; the community now goes by a new id.
    Relabelled {
        /// Id before the departure (the departing vertex).
        from: CommunityId,
        /// Smallest remaining member, the new id.
        to: CommunityId,
    },
    /// The vertex was the last member; the community is gone.
    Emptied(CommunityId),
}

impl Departure {
    /// Id the departed community had before the move.
    pub fn previous(&self) -> CommunityId {
        match *self {
            Departure::Kept(c) | Departure::Emptied(c) => c,
            Departure::Relabelled { from, .. } => from,
        }
    }

    /// Id of the departed community after the move, if it survived.
    pub fn current(&self) -> Option<CommunityId> {
        match *self {
            Departure::Kept(c) => Some(c),
            Departure::Relabelled { to, .. } => Some(to),
            Departure::Emptied(_) => None,
        }
    }
}

/// Bidirectional vertex ↔ community mapping.
///
/// Invariants after every public operation:
/// - every assigned vertex belongs to exactly one member set, matching its
///   forward entry;
/// - no member set is empty;
/// - a community's id is one of its members.
#[derive(Debug, Clone, Default)]
pub struct ReversibleAssignment {
    forward: Vec<Option<CommunityId>>,
    members: Vec<Option<HashSet<VertexId>>>,
    vertex_count: usize,
    community_count: usize,
}

impl ReversibleAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every vertex of `vertices` in its own community.
    pub fn singletons<I: IntoIterator<Item = VertexId>>(vertices: I) -> Self {
        let mut a = Self::new();
        for v in vertices {
            a.insert_singleton(v);
        }
        a
    }

    fn grow(&mut self, v: VertexId) {
        if v >= self.forward.len() {
            self.forward.resize(v + 1, None);
            self.members.resize_with(v + 1, || None);
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    #[inline]
    pub fn community_count(&self) -> usize {
        self.community_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertex_count == 0
    }

    /// Community of `v`, or `None` if `v` is unassigned.
    #[inline]
    pub fn community_of(&self, v: VertexId) -> Option<CommunityId> {
        self.forward.get(v).copied().flatten()
    }

    #[inline]
    pub fn contains_community(&self, c: CommunityId) -> bool {
        matches!(self.members.get(c), Some(Some(_)))
    }

    fn member_set(&self, c: CommunityId) -> Result<&HashSet<VertexId>> {
        self.members
            .get(c)
            .and_then(Option::as_ref)
            .ok_or(CommunityError::CommunityNotFound(c))
    }

    /// Lazy, finite sequence over the members of `c` (unordered).
    pub fn members_of(&self, c: CommunityId) -> Result<impl Iterator<Item = VertexId> + '_> {
        Ok(self.member_set(c)?.iter().copied())
    }

    /// Members of `c` in ascending order.
    pub fn sorted_members(&self, c: CommunityId) -> Result<Vec<VertexId>> {
        let mut m: Vec<VertexId> = self.members_of(c)?.collect();
        m.sort_unstable();
        Ok(m)
    }

    /// Number of members of `c` (0 if `c` does not exist).
    pub fn member_count(&self, c: CommunityId) -> usize {
        self.member_set(c).map_or(0, HashSet::len)
    }

    /// Live community ids in ascending order.
    pub fn communities(&self) -> impl Iterator<Item = CommunityId> + '_ {
        self.members
            .iter()
            .enumerate()
            .filter_map(|(c, m)| m.as_ref().map(|_| c))
    }

    /// `(vertex, community)` pairs in ascending vertex order.
    pub fn iter(&self) -> impl Iterator<Item = (VertexId, CommunityId)> + '_ {
        self.forward
            .iter()
            .enumerate()
            .filter_map(|(v, c)| c.map(|c| (v, c)))
    }

    /// Places an unassigned vertex in a new community of its own.
    /// Returns `false` if `v` was already assigned.
    pub fn insert_singleton(&mut self, v: VertexId) -> bool {
        self.grow(v);
        if self.forward[v].is_some() {
            return false;
        }
        // an unassigned vertex never names a community
        debug_assert!(self.members[v].is_none());
        let mut set = HashSet::with_capacity(1);
        set.insert(v);
        self.forward[v] = Some(v);
        self.members[v] = Some(set);
        self.vertex_count += 1;
        self.community_count += 1;
        true
    }

    /// Takes `v` out of its community without placing it anywhere.
    pub fn evict(&mut self, v: VertexId) -> Result<Departure> {
        let c = self
            .community_of(v)
            .ok_or(CommunityError::VertexNotFound(v))?;
        let departure = self.detach(v, c);
        self.forward[v] = None;
        self.vertex_count -= 1;
        Ok(departure)
    }

    /// Removes `v` from member set `c`, relabelling or deleting `c` as needed.
    /// The forward entry of `v` is left for the caller to overwrite.
    fn detach(&mut self, v: VertexId, c: CommunityId) -> Departure {
        let Some(set) = self.members[c].as_mut() else {
            return Departure::Emptied(c);
        };
        set.remove(&v);
        if set.is_empty() {
            self.members[c] = None;
            self.community_count -= 1;
            return Departure::Emptied(c);
        }
        if v != c {
            return Departure::Kept(c);
        }
        let to = set.iter().copied().min().unwrap_or(c);
        self.relabel(c, to);
        Departure::Relabelled { from: c, to }
    }

    /// Renames community `from` to `to`, which must be one of its members.
    fn relabel(&mut self, from: CommunityId, to: CommunityId) {
        let Some(set) = self.members[from].take() else {
            return;
        };
        for &m in &set {
            self.forward[m] = Some(to);
        }
        self.members[to] = Some(set);
    }

    /// Moves `v` into the existing community `target`.
    ///
    /// Returns `None` when `v` already belongs to `target`, otherwise what
    /// happened to the community it left.
    ///
    /// Expected O(1), except when `v` is the representative of a community it
    /// shares with others: the remaining members are then relabelled, which
    /// costs O(|community|).
    pub fn move_vertex(&mut self, v: VertexId, target: CommunityId) -> Result<Option<Departure>> {
        let c = self
            .community_of(v)
            .ok_or(CommunityError::VertexNotFound(v))?;
        self.member_set(target)?;
        if c == target {
            return Ok(None);
        }
        let departure = self.detach(v, c);
        if let Some(set) = self.members[target].as_mut() {
            set.insert(v);
        }
        self.forward[v] = Some(target);
        Ok(Some(departure))
    }

    /// Moves `v` into a new singleton community named `v`.
    ///
    /// Returns `None` if `v` is already alone.
    pub fn isolate(&mut self, v: VertexId) -> Result<Option<Departure>> {
        let c = self
            .community_of(v)
            .ok_or(CommunityError::VertexNotFound(v))?;
        if self.member_count(c) == 1 {
            return Ok(None);
        }
        let departure = self.detach(v, c);
        let mut set = HashSet::with_capacity(1);
        set.insert(v);
        self.members[v] = Some(set);
        self.forward[v] = Some(v);
        self.community_count += 1;
        Ok(Some(departure))
    }

    /// Moves every member of `absorb` into `keep`; `keep` keeps its id.
    pub fn merge_communities(&mut self, keep: CommunityId, absorb: CommunityId) -> Result<CommunityId> {
        self.member_set(keep)?;
        self.member_set(absorb)?;
        if keep == absorb {
            return Ok(keep);
        }
        let moved = self.members[absorb].take().unwrap_or_default();
        for &m in &moved {
            self.forward[m] = Some(keep);
        }
        if let Some(set) = self.members[keep].as_mut() {
            set.extend(moved);
        }
        self.community_count -= 1;
        Ok(keep)
    }
}

impl DebugInvariants for ReversibleAssignment {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "ReversibleAssignment");
    }

    fn validate_invariants(&self) -> Result<()> {
        let violation = |msg: String| Err(CommunityError::InvariantViolation(msg));
        let mut seen_vertices = 0usize;
        let mut seen_communities = 0usize;
        for (c, set) in self.members.iter().enumerate() {
            let Some(set) = set else { continue };
            seen_communities += 1;
            if set.is_empty() {
                return violation(format!("community {c} is empty"));
            }
            if !set.contains(&c) {
                return violation(format!("community {c} does not contain its representative"));
            }
            for &m in set {
                if self.community_of(m) != Some(c) {
                    return violation(format!(
                        "vertex {m} listed in {c} but maps to {:?}",
                        self.community_of(m)
                    ));
                }
            }
            seen_vertices += set.len();
        }
        let assigned = self.forward.iter().flatten().count();
        if assigned != seen_vertices || assigned != self.vertex_count {
            return violation(format!(
                "{assigned} assigned vertices, {seen_vertices} listed, {} counted",
                self.vertex_count
            ));
        }
        if seen_communities != self.community_count {
            return violation(format!(
                "{seen_communities} communities listed, {} counted",
                self.community_count
            ));
        }
        Ok(())
    }
}
