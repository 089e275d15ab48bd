//! Modularity with a penalty on size concentration.
//!
//! ```text
//! B = Q_γ - α ∑_c (s_c / N)^2
//! ```
//!
//! `s_c` is the summed vertex size of community `c` and `N` the total size
//! of the graph, so the penalty is the Herfindahl index of community sizes.
//! It is 1 for one giant community and `1/N` for all singletons. Joining a
//! singleton `v` to a community of size `s_c` adds `-2 α s_v s_c / N^2` on top
//! of the modularity half. Vertex sizes survive collapse, so the
//! penalty is measured in input vertices on every level.

use super::modularity::Modularity;
use super::{Criterion, target_view};
use crate::community::{CommunityId, GroupableGraph, VertexLinks};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalancedModularity {
    pub modularity: Modularity,
    /// Penalty strength in `[0, 1]`; 0 reduces to plain modularity.
    pub alpha: f64,
}

impl BalancedModularity {
    pub fn new(resolution: f64, alpha: f64) -> Self {
        Self {
            modularity: Modularity::new(resolution),
            alpha,
        }
    }

    fn size_scale(&self, graph: &GroupableGraph) -> Option<f64> {
        let n = graph.total_size();
        (n > 0 && self.alpha != 0.0).then(|| self.alpha / (n as f64).powi(2))
    }
}

impl Criterion for BalancedModularity {
    fn score(&self, graph: &GroupableGraph) -> f64 {
        let q = self.modularity.score(graph);
        let Some(scale) = self.size_scale(graph) else {
            return q;
        };
        let concentration: f64 = graph
            .communities()
            .filter_map(|c| graph.stats(c))
            .map(|s| (s.size as f64).powi(2))
            .sum();
        q - scale * concentration
    }

    fn remove_contribution(&self, graph: &GroupableGraph, links: &VertexLinks) -> f64 {
        -self.insert_contribution(graph, links, links.community)
    }

    fn insert_contribution(&self, graph: &GroupableGraph, links: &VertexLinks, target: CommunityId) -> f64 {
        let q = self.modularity.insert_contribution(graph, links, target);
        let Some(scale) = self.size_scale(graph) else {
            return q;
        };
        let (_, _, s_c) = target_view(graph, links, target);
        let s_v = links.size as f64;
        q - scale * 2.0 * s_v * s_c as f64
    }
}
