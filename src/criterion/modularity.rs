use super::{Criterion, scoring_weight, target_view};
use crate::community::{CommunityId, GroupableGraph, VertexLinks};

/// Newman modularity with resolution `γ`.
///
/// `γ = 1` is classical modularity; larger values favour smaller communities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Modularity {
    pub resolution: f64,
}

impl Default for Modularity {
    fn default() -> Self {
        Self { resolution: 1.0 }
    }
}

impl Modularity {
    pub fn new(resolution: f64) -> Self {
        Self { resolution }
    }
}

impl Criterion for Modularity {
    fn score(&self, graph: &GroupableGraph) -> f64 {
        let Some(m2) = scoring_weight(graph) else {
            return 0.0;
        };
        graph
            .communities()
            .filter_map(|c| graph.stats(c))
            .map(|s| s.inner / m2 - self.resolution * (s.total / m2).powi(2))
            .sum()
    }

    fn remove_contribution(&self, graph: &GroupableGraph, links: &VertexLinks) -> f64 {
        -self.insert_contribution(graph, links, links.community)
    }

    fn insert_contribution(&self, graph: &GroupableGraph, links: &VertexLinks, target: CommunityId) -> f64 {
        let Some(m2) = scoring_weight(graph) else {
            return 0.0;
        };
        let (k_c, tot_c, _) = target_view(graph, links, target);
        (2.0 / m2) * (k_c - self.resolution * tot_c * links.degree / m2)
    }
}
