//! Multi-level local-search optimizer (Louvain method).
//!
//! A *round* works on a stack of levels:
//!
//! 1. **Local moving.** Passes over the vertices of the current level move
//!    each vertex into the neighbouring community with the best gain above
//!    `epsilon`, until a pass commits no move.
//! 2. **Aggregation.** If the level ended with fewer communities than
//!    vertices (and more than one), it is collapsed and step 1 repeats on the
//!    collapsed graph.
//! 3. **Unfolding.** The stack is popped; each coarse grouping merges the
//!    communities of the level below.
//!
//! [`Louvain::run`] repeats rounds until one commits no move at any level,
//! so a second run on an unchanged graph is a no-op. Runs resume from the
//! graph's current assignment, which is how dynamic updates stay cheap.
//!
//! Candidates for a vertex are the communities of its neighbours. Equal
//! gains resolve to the lowest community id, so identical input and
//! configuration give identical partitions.

pub mod order;
#[cfg(feature = "rayon")]
mod parallel;

pub use order::VisitOrder;

use crate::community::{Collapse, CommunityId, GroupableGraph, VertexLinks};
use crate::community_error::Result;
use crate::config::{DEFAULT_EPSILON, EngineConfig};
use crate::criterion::{Criterion, CriterionKind};
use crate::debug_invariants::DebugInvariants;
use crate::graph::{VertexId, WeightedAdjacency};
use order::Visitor;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Cooperative interrupt flag, checked between vertices.
///
/// Clones share the flag, so a token handed to another thread can stop a
/// running optimizer. The assignment stays consistent when a run stops early.
#[derive(Debug, Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Outcome of one level of local moving.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LevelSummary {
    pub round: usize,
    /// 0 for the caller's graph, +1 per collapse.
    pub level: usize,
    pub vertices: usize,
    /// Communities when the level converged.
    pub communities: usize,
    pub moves: usize,
    pub passes: usize,
}

/// Statistics of a whole [`Louvain::run`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OptimizationReport {
    pub rounds: usize,
    pub levels: Vec<LevelSummary>,
    /// Committed vertex moves over all levels and rounds.
    pub moves: usize,
    pub communities: usize,
    pub score: f64,
    /// The run was stopped through its [`StopToken`].
    pub interrupted: bool,
    pub elapsed: Duration,
}

impl OptimizationReport {
    /// Deepest level reached.
    pub fn depth(&self) -> usize {
        self.levels.iter().map(|l| l.level + 1).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct PassOutcome {
    moves: usize,
    interrupted: bool,
}

/// Louvain optimizer over a [`Criterion`].
#[derive(Debug, Clone)]
pub struct Louvain<C = CriterionKind> {
    criterion: C,
    epsilon: f64,
    order: VisitOrder,
    max_levels: usize,
    parallel_window: usize,
    stop: StopToken,
}

impl Louvain<CriterionKind> {
    /// Builds an optimizer from a validated configuration.
    pub fn from_config(cfg: &EngineConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self::new(cfg.criterion)
            .with_epsilon(cfg.epsilon)
            .with_order(cfg.order)
            .with_max_levels(cfg.max_levels)
            .with_parallel_window(cfg.parallel_window))
    }
}

impl<C: Criterion> Louvain<C> {
    pub fn new(criterion: C) -> Self {
        Self {
            criterion,
            epsilon: DEFAULT_EPSILON,
            order: VisitOrder::Insertion,
            max_levels: 0,
            parallel_window: 0,
            stop: StopToken::new(),
        }
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_order(mut self, order: VisitOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_max_levels(mut self, max_levels: usize) -> Self {
        self.max_levels = max_levels;
        self
    }

    pub fn with_parallel_window(mut self, window: usize) -> Self {
        self.parallel_window = window;
        self
    }

    pub fn with_stop_token(mut self, stop: StopToken) -> Self {
        self.stop = stop;
        self
    }

    pub fn criterion(&self) -> &C {
        &self.criterion
    }

    /// Token that interrupts runs of this optimizer.
    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    /// Optimizes the assignment of `graph` in place, starting from its
    /// current communities.
    pub fn run(&self, graph: &mut GroupableGraph) -> Result<OptimizationReport> {
        let started = Instant::now();
        let mut report = OptimizationReport::default();
        let mut visitor = Visitor::new(self.order);

        if !graph.is_empty() {
            loop {
                report.rounds += 1;
                let moves = self.round(graph, &mut visitor, &mut report)?;
                report.moves += moves;
                if moves == 0 || report.interrupted {
                    break;
                }
            }
        }

        report.communities = graph.community_count();
        report.score = self.criterion.score(graph);
        report.elapsed = started.elapsed();
        graph.debug_assert_invariants();
        log::info!(
            "louvain: {} rounds, depth {}, {} moves, {} communities, score {:.6}{}",
            report.rounds,
            report.depth(),
            report.moves,
            report.communities,
            report.score,
            if report.interrupted { " (interrupted)" } else { "" }
        );
        Ok(report)
    }

    /// One descent through the levels and back. Returns the committed moves.
    fn round(
        &self,
        graph: &mut GroupableGraph,
        visitor: &mut Visitor,
        report: &mut OptimizationReport,
    ) -> Result<usize> {
        let mut stack: Vec<Collapse> = Vec::new();
        let mut moves = 0;

        // 1. Descend: local moving, then collapse while it still shrinks the graph
        loop {
            let level = stack.len();
            let current = match stack.last_mut() {
                Some(top) => &mut top.graph,
                None => &mut *graph,
            };
            let (summary, interrupted) = self.local_moving(current, report.rounds, level, visitor)?;
            moves += summary.moves;
            let (vertices, communities) = (summary.vertices, summary.communities);
            report.levels.push(summary);
            if interrupted {
                report.interrupted = true;
                break;
            }
            let deeper = self.max_levels == 0 || level + 1 < self.max_levels;
            if !deeper || communities <= 1 || communities >= vertices {
                break;
            }
            let collapse = current.collapse()?;
            stack.push(collapse);
        }

        // 2. Unfold every coarse grouping onto the level below
        while let Some(Collapse { graph: coarse, origin }) = stack.pop() {
            let parent = match stack.last_mut() {
                Some(top) => &mut top.graph,
                None => &mut *graph,
            };
            parent.absorb(&coarse, &origin)?;
        }
        Ok(moves)
    }

    /// Passes over one level until a pass commits nothing.
    fn local_moving(
        &self,
        graph: &mut GroupableGraph,
        round: usize,
        level: usize,
        visitor: &mut Visitor,
    ) -> Result<(LevelSummary, bool)> {
        let mut summary = LevelSummary {
            round,
            level,
            vertices: graph.vertex_count(),
            ..LevelSummary::default()
        };
        let mut order: Vec<VertexId> = graph.vertices().collect();
        let mut interrupted = false;

        loop {
            visitor.arrange(&mut order);
            let outcome = self.pass(graph, &order, level)?;
            summary.passes += 1;
            summary.moves += outcome.moves;
            log::debug!(
                "round {round} level {level} pass {}: {} moves, {} communities",
                summary.passes,
                outcome.moves,
                graph.community_count()
            );
            if outcome.interrupted {
                interrupted = true;
                break;
            }
            if outcome.moves == 0 {
                break;
            }
        }

        summary.communities = graph.community_count();
        log::debug!(
            "round {round} level {level}: {} vertices -> {} communities after {} passes",
            summary.vertices,
            summary.communities,
            summary.passes
        );
        Ok((summary, interrupted))
    }

    fn pass(&self, graph: &mut GroupableGraph, order: &[VertexId], level: usize) -> Result<PassOutcome> {
        #[cfg(feature = "rayon")]
        if self.parallel_window > 1 {
            return self.windowed_pass(graph, order, level);
        }
        self.sequential_pass(graph, order, level)
    }

    fn sequential_pass(
        &self,
        graph: &mut GroupableGraph,
        order: &[VertexId],
        level: usize,
    ) -> Result<PassOutcome> {
        let mut outcome = PassOutcome::default();
        for &v in order {
            if self.stop.is_stopped() {
                outcome.interrupted = true;
                break;
            }
            let links = graph.links(v)?;
            if let Some((target, gain)) = self.best_move(graph, &links) {
                self.commit(graph, &links, target, gain, level)?;
                outcome.moves += 1;
            }
        }
        Ok(outcome)
    }

    fn commit(
        &self,
        graph: &mut GroupableGraph,
        links: &VertexLinks,
        target: CommunityId,
        gain: f64,
        level: usize,
    ) -> Result<()> {
        graph.commit_move(links, target)?;
        log::trace!(
            "level {level}: vertex {} {} -> {target} (gain {gain:.3e})",
            links.vertex,
            links.community
        );
        Ok(())
    }

    /// Best neighbouring community for `links.vertex`, if any beats `epsilon`.
    ///
    /// Candidates are scanned in ascending id order and only a strictly
    /// larger gain replaces the current best.
    pub(crate) fn best_move(&self, graph: &GroupableGraph, links: &VertexLinks) -> Option<(CommunityId, f64)> {
        if links.links.is_empty() {
            return None;
        }
        let remove = self.criterion.remove_contribution(graph, links);
        let mut best: Option<(CommunityId, f64)> = None;
        for &c in links.links.keys() {
            let gain = remove + self.criterion.insert_contribution(graph, links, c);
            if gain > self.epsilon && best.is_none_or(|(_, g)| gain > g) {
                best = Some((c, gain));
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criterion::Modularity;

    fn graph_from(n: usize, edges: &[(usize, usize, f64)]) -> GroupableGraph {
        let mut g = GroupableGraph::new();
        for v in 0..n {
            g.add_vertex(v);
        }
        for &(u, v, w) in edges {
            g.add_edge(u, v, w, false).unwrap();
        }
        g
    }

    fn ring_of_cliques(cliques: usize, size: usize) -> GroupableGraph {
        let mut edges = Vec::new();
        for c in 0..cliques {
            let base = c * size;
            for i in 0..size {
                for j in (i + 1)..size {
                    edges.push((base + i, base + j, 1.0));
                }
            }
            let next = ((c + 1) % cliques) * size;
            edges.push((base, next + 1, 1.0));
        }
        graph_from(cliques * size, &edges)
    }

    #[test]
    fn triangle_is_one_community() {
        let mut g = graph_from(3, &[(0, 1, 1.0), (1, 2, 1.0), (0, 2, 1.0)]);
        let report = Louvain::new(Modularity::default()).run(&mut g).unwrap();
        assert_eq!(g.community_count(), 1);
        assert_eq!(report.communities, 1);
        assert!(report.score.abs() < 1e-12);
    }

    #[test]
    fn ring_of_cliques_finds_every_clique() {
        let mut g = ring_of_cliques(6, 5);
        let report = Louvain::new(CriterionKind::default()).run(&mut g).unwrap();
        assert_eq!(g.community_count(), 6);
        for c in 0..6 {
            let base = c * 5;
            for i in 1..5 {
                assert_eq!(g.community_of(base + i), g.community_of(base));
            }
        }
        assert!(report.score > 0.7);
        assert!(g.validate_invariants().is_ok());
    }

    #[test]
    fn second_run_is_noop() {
        let mut g = ring_of_cliques(5, 4);
        let louvain = Louvain::new(CriterionKind::default()).with_order(VisitOrder::Shuffled { seed: 9 });
        louvain.run(&mut g).unwrap();
        let before: Vec<_> = g.assignment().iter().collect();
        let again = louvain.run(&mut g).unwrap();
        assert_eq!(again.moves, 0);
        assert_eq!(again.rounds, 1);
        assert_eq!(g.assignment().iter().collect::<Vec<_>>(), before);
    }

    #[test]
    fn empty_graph_yields_empty_report() {
        let mut g = GroupableGraph::new();
        let report = Louvain::new(CriterionKind::default()).run(&mut g).unwrap();
        assert_eq!(report.rounds, 0);
        assert_eq!(report.communities, 0);
        assert_eq!(report.score, 0.0);
    }

    #[test]
    fn max_levels_limits_depth() {
        let mut g = ring_of_cliques(8, 3);
        let report = Louvain::new(CriterionKind::default())
            .with_max_levels(1)
            .run(&mut g)
            .unwrap();
        assert_eq!(report.depth(), 1);
        assert!(report.levels.iter().all(|l| l.level == 0));
    }

    #[test]
    fn stopped_token_interrupts() {
        let mut g = ring_of_cliques(4, 4);
        let louvain = Louvain::new(CriterionKind::default());
        louvain.stop_token().stop();
        let report = louvain.run(&mut g).unwrap();
        assert!(report.interrupted);
        assert_eq!(report.moves, 0);
        assert_eq!(g.community_count(), 16);
        assert!(g.validate_invariants().is_ok());
    }

    #[test]
    fn ties_go_to_lowest_community() {
        // 1 is linked equally to 0 and 2
        let mut g = graph_from(3, &[(0, 1, 1.0), (1, 2, 1.0)]);
        let louvain = Louvain::new(CriterionKind::default());
        let links = g.links(1).unwrap();
        let (target, _) = louvain.best_move(&g, &links).unwrap();
        assert_eq!(target, 0);
        louvain.run(&mut g).unwrap();
        assert_eq!(g.community_of(1), g.community_of(0));
    }

    #[test]
    fn large_epsilon_blocks_moves() {
        let mut g = graph_from(3, &[(0, 1, 1.0), (1, 2, 1.0), (0, 2, 1.0)]);
        let report = Louvain::new(CriterionKind::default())
            .with_epsilon(10.0)
            .run(&mut g)
            .unwrap();
        assert_eq!(report.moves, 0);
        assert_eq!(g.community_count(), 3);
    }

    #[test]
    fn from_config_rejects_invalid() {
        let cfg = EngineConfig::default().with_epsilon(f64::NAN);
        assert!(Louvain::from_config(&cfg).is_err());
        assert!(Louvain::from_config(&EngineConfig::default()).is_ok());
    }
}
