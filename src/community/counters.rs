use crate::community::CommunityId;
use crate::graph::{VertexId, WeightedAdjacency, Weight};
use std::collections::BTreeMap;

/// Brute-force community counters for verifying incremental bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct CommunityCounters {
    /// Sum of weighted degrees of the whole graph.
    pub total_weight: Weight,
    /// Per community: twice the internal non-loop weight plus loop weight.
    pub inner: BTreeMap<CommunityId, Weight>,
    /// Per community: sum of member degrees.
    pub total: BTreeMap<CommunityId, Weight>,
    /// Weight of edges between two communities, keyed `(low, high)`.
    pub cross: BTreeMap<(CommunityId, CommunityId), Weight>,
}

/// Compute community counters for a graph and a labelling.
///
/// Vertices for which `community_of` returns `None` are skipped.
pub fn compute_counters<G, F>(g: &G, community_of: F) -> CommunityCounters
where
    G: WeightedAdjacency,
    F: Fn(VertexId) -> Option<CommunityId>,
{
    let mut counters = CommunityCounters {
        total_weight: g.total_weight(),
        ..CommunityCounters::default()
    };

    for v in g.vertices() {
        if let Some(c) = community_of(v) {
            *counters.total.entry(c).or_insert(0.0) += g.degree(v);
            counters.inner.entry(c).or_insert(0.0);
        }
    }

    for (u, v, w) in g.edges() {
        let (Some(cu), Some(cv)) = (community_of(u), community_of(v)) else {
            continue;
        };
        if cu == cv {
            let stubs = if u == v { w } else { 2.0 * w };
            *counters.inner.entry(cu).or_insert(0.0) += stubs;
        } else {
            let key = (cu.min(cv), cu.max(cv));
            *counters.cross.entry(key).or_insert(0.0) += w;
        }
    }

    counters
}
