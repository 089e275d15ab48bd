//! Quality criteria over a [`GroupableGraph`].
//!
//! ## Objective
//!
//! Let
//! - `m2` = [`WeightedAdjacency::total_weight`], the sum of weighted degrees
//!   (twice the non-loop edge weight plus loop weight).
//! - `in_c` = internal stubs of community `c` (see [`CommunityStats`]).
//! - `tot_c` = sum of the degrees of the members of `c`.
//!
//! Modularity with resolution `γ` is
//!
//! ```text
//! Q = ∑_c [ in_c / m2 - γ (tot_c / m2)^2 ]
//! ```
//!
//! ## Local deltas
//!
//! A move of vertex `v` (degree `k`) from community `a` to community `b` is
//! priced as two halves, both taken with `v` already removed from `a`:
//!
//! ```text
//! gain = insert(v, b) - insert(v, a \ {v})
//! ```
//!
//! where `insert(v, c) = (2 / m2) (k_c - γ tot_c k / m2)` and `k_c` is the
//! weight from `v` to the members of `c`. Both halves read only the
//! neighbourhood of `v` and the aggregates of two communities, so a gain
//! costs O(deg v). The sum of the gains of a move sequence equals the change
//! of `Q` up to rounding.
//!
//! [`Criterion::remove_contribution`] is the second half with its sign, so
//! the optimizer removes a vertex once and then prices every candidate with
//! [`Criterion::insert_contribution`].
//!
//! [`CommunityStats`]: crate::community::CommunityStats

pub mod balanced;
pub mod modularity;

pub use balanced::BalancedModularity;
pub use modularity::Modularity;

use crate::community::{CommunityId, GroupableGraph, VertexLinks};
use crate::community_error::{CommunityError, Result};
use crate::graph::{VertexId, WeightedAdjacency};
use serde::{Deserialize, Serialize};

/// A quality function over a grouped graph with O(degree) move deltas.
pub trait Criterion: Send + Sync {
    /// Global quality of the current assignment; 0 on an edgeless graph.
    fn score(&self, graph: &GroupableGraph) -> f64;

    /// Score change from taking `links.vertex` out of its community into a
    /// singleton.
    fn remove_contribution(&self, graph: &GroupableGraph, links: &VertexLinks) -> f64;

    /// Score change from moving `links.vertex`, as a singleton, into `target`.
    ///
    /// When `target` is the vertex's own community the aggregates are taken
    /// without the vertex.
    fn insert_contribution(&self, graph: &GroupableGraph, links: &VertexLinks, target: CommunityId) -> f64;

    /// Score change from moving `links.vertex` into `target`.
    fn move_gain(&self, graph: &GroupableGraph, links: &VertexLinks, target: CommunityId) -> f64 {
        if target == links.community {
            return 0.0;
        }
        self.remove_contribution(graph, links) + self.insert_contribution(graph, links, target)
    }

    /// Convenience form of [`Criterion::move_gain`] that gathers the links of `v`.
    fn gain_of(&self, graph: &GroupableGraph, v: VertexId, target: CommunityId) -> Result<f64> {
        if graph.stats(target).is_none() {
            return Err(CommunityError::CommunityNotFound(target));
        }
        let links = graph.links(v)?;
        Ok(self.move_gain(graph, &links, target))
    }
}

/// Aggregates of `target` as seen by a vertex about to join it.
///
/// Returns `(links, total, size)` with the vertex's own contribution taken
/// out when `target` is its current community.
pub(crate) fn target_view(graph: &GroupableGraph, links: &VertexLinks, target: CommunityId) -> (f64, f64, usize) {
    let stats = graph.stats(target).unwrap_or_default();
    if target == links.community {
        (
            links.own_links,
            stats.total - links.degree,
            stats.size.saturating_sub(links.size),
        )
    } else {
        (links.links_to(target), stats.total, stats.size)
    }
}

/// Criterion selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CriterionKind {
    /// Newman modularity with a resolution parameter.
    Modularity { resolution: f64 },
    /// Modularity minus a size-concentration penalty of strength `alpha`.
    BalancedModularity { resolution: f64, alpha: f64 },
}

impl Default for CriterionKind {
    fn default() -> Self {
        CriterionKind::Modularity { resolution: 1.0 }
    }
}

impl CriterionKind {
    pub fn modularity() -> Self {
        Self::default()
    }

    pub fn balanced(alpha: f64) -> Self {
        CriterionKind::BalancedModularity {
            resolution: 1.0,
            alpha,
        }
    }

    /// Rejects non-finite or negative parameters and `alpha` outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        let resolution = match *self {
            CriterionKind::Modularity { resolution } => resolution,
            CriterionKind::BalancedModularity { resolution, alpha } => {
                if !(0.0..=1.0).contains(&alpha) {
                    return Err(CommunityError::InvalidConfig {
                        name: "alpha",
                        message: "must lie in [0, 1]",
                    });
                }
                resolution
            }
        };
        if !resolution.is_finite() || resolution < 0.0 {
            return Err(CommunityError::InvalidConfig {
                name: "resolution",
                message: "must be finite and non-negative",
            });
        }
        Ok(())
    }

    pub fn name(&self) -> &'static str {
        match self {
            CriterionKind::Modularity { .. } => "modularity",
            CriterionKind::BalancedModularity { .. } => "balanced_modularity",
        }
    }
}

impl Criterion for CriterionKind {
    fn score(&self, graph: &GroupableGraph) -> f64 {
        match *self {
            CriterionKind::Modularity { resolution } => Modularity::new(resolution).score(graph),
            CriterionKind::BalancedModularity { resolution, alpha } => {
                BalancedModularity::new(resolution, alpha).score(graph)
            }
        }
    }

    fn remove_contribution(&self, graph: &GroupableGraph, links: &VertexLinks) -> f64 {
        match *self {
            CriterionKind::Modularity { resolution } => {
                Modularity::new(resolution).remove_contribution(graph, links)
            }
            CriterionKind::BalancedModularity { resolution, alpha } => {
                BalancedModularity::new(resolution, alpha).remove_contribution(graph, links)
            }
        }
    }

    fn insert_contribution(&self, graph: &GroupableGraph, links: &VertexLinks, target: CommunityId) -> f64 {
        match *self {
            CriterionKind::Modularity { resolution } => {
                Modularity::new(resolution).insert_contribution(graph, links, target)
            }
            CriterionKind::BalancedModularity { resolution, alpha } => {
                BalancedModularity::new(resolution, alpha).insert_contribution(graph, links, target)
            }
        }
    }
}

/// `m2` of the graph, or `None` when it has no weight to score.
#[inline]
pub(crate) fn scoring_weight(graph: &GroupableGraph) -> Option<f64> {
    let m2 = graph.total_weight();
    (m2 > 0.0).then_some(m2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    fn random_graph(n: usize, edge_prob: f64, rng: &mut SmallRng) -> GroupableGraph {
        let mut g = GroupableGraph::new();
        for v in 0..n {
            g.add_vertex(v);
        }
        for u in 0..n {
            for v in u..n {
                if rng.r#gen::<f64>() < edge_prob {
                    g.add_edge(u, v, rng.gen_range(0.1..3.0), false).unwrap();
                }
            }
        }
        g
    }

    #[test]
    fn kind_validation() {
        assert!(CriterionKind::default().validate().is_ok());
        assert!(CriterionKind::balanced(0.5).validate().is_ok());
        assert!(matches!(
            CriterionKind::balanced(1.5).validate(),
            Err(CommunityError::InvalidConfig { name: "alpha", .. })
        ));
        assert!(
            CriterionKind::Modularity {
                resolution: f64::NAN
            }
            .validate()
            .is_err()
        );
    }

    #[test]
    fn gain_of_unknown_target_fails() {
        let mut g = GroupableGraph::new();
        g.add_vertex(0);
        g.add_vertex(1);
        g.move_vertex(1, 0).unwrap();
        let kind = CriterionKind::default();
        assert_eq!(kind.gain_of(&g, 0, 1), Err(CommunityError::CommunityNotFound(1)));
        assert_eq!(kind.gain_of(&g, 5, 0), Err(CommunityError::VertexNotFound(5)));
    }

    proptest! {
        #[test]
        fn prop_gains_sum_to_score_change(
            n in 2usize..12,
            edge_prob in 0.2f64..0.9,
            moves in 1usize..30,
            alpha in 0.0f64..1.0,
            balanced in any::<bool>(),
            seed in any::<u64>(),
        ) {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut g = random_graph(n, edge_prob, &mut rng);
            let kind = if balanced {
                CriterionKind::BalancedModularity { resolution: 1.0, alpha }
            } else {
                CriterionKind::Modularity { resolution: 1.0 }
            };

            let start = kind.score(&g);
            let mut predicted = start;
            for _ in 0..moves {
                let v = rng.gen_range(0..n);
                let communities: Vec<_> = g.communities().collect();
                let target = communities[rng.gen_range(0..communities.len())];
                let links = g.links(v).unwrap();
                predicted += kind.move_gain(&g, &links, target);
                g.move_vertex(v, target).unwrap();
                let actual = kind.score(&g);
                prop_assert!((predicted - actual).abs() < 1e-9, "predicted {} actual {}", predicted, actual);
            }
        }
    }
}
