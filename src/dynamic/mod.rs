//! Incremental maintenance of a partition under edge changes.
//!
//! [`DynamicUpdateController`] owns one [`GroupableGraph`] session. Each batch
//! of [`EdgeChange`]s is applied change by change:
//!
//! 1. validate the change (weight, endpoints, duplicates);
//! 2. notify observers with [`EdgeChangeObserver::before_change`];
//! 3. apply it to the graph, creating endpoints as singleton communities;
//! 4. disband the affected communities and prune vertices left without edges;
//! 5. notify observers with [`EdgeChangeObserver::after_change`].
//!
//! A rejected change is reported by its batch position and leaves the graph
//! untouched; the rest of the batch still applies. After the batch the
//! optimizer runs once, resuming from the current assignment.
//!
//! Vertices are addressed by external [`Label`]s, interned to dense ids in
//! first-seen order. A community is reported under the label of its
//! representative member.

pub mod change;
pub mod interner;
pub mod observer;

pub use change::{ChangeFailure, ChangeReport, EdgeChange, EdgeRecord, Label};
pub use interner::LabelInterner;
pub use observer::{ChangeContext, EdgeChangeObserver};

use crate::community::{CommunityId, GroupableGraph};
use crate::community_error::{CommunityError, Result};
use crate::config::EngineConfig;
use crate::criterion::{Criterion, CriterionKind};
use crate::graph::weighted::check_weight;
use crate::graph::{VertexId, Weight, WeightedAdjacency};
use crate::louvain::{Louvain, OptimizationReport, StopToken};
use crate::metrics;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default)]
struct ChangeEffect {
    disbanded: usize,
    pruned: usize,
}

/// Session object holding a graph, its partition and the optimizer.
#[derive(Debug, Clone)]
pub struct DynamicUpdateController<C = CriterionKind> {
    graph: GroupableGraph,
    labels: LabelInterner,
    optimizer: Louvain<C>,
    config: EngineConfig,
    last_report: OptimizationReport,
    last_elapsed: Duration,
    total_elapsed: Duration,
}

impl DynamicUpdateController<CriterionKind> {
    /// Empty session using the criterion named in `config`.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let optimizer = Louvain::from_config(&config)?;
        Ok(Self::assemble(config, optimizer))
    }
}

impl<C: Criterion> DynamicUpdateController<C> {
    /// Empty session with a custom criterion; `config.criterion` is ignored.
    pub fn with_criterion(config: EngineConfig, criterion: C) -> Result<Self> {
        config.validate()?;
        let optimizer = Louvain::new(criterion)
            .with_epsilon(config.epsilon)
            .with_order(config.order)
            .with_max_levels(config.max_levels)
            .with_parallel_window(config.parallel_window);
        Ok(Self::assemble(config, optimizer))
    }

    fn assemble(config: EngineConfig, optimizer: Louvain<C>) -> Self {
        Self {
            graph: GroupableGraph::new(),
            labels: LabelInterner::new(),
            optimizer,
            config,
            last_report: OptimizationReport::default(),
            last_elapsed: Duration::ZERO,
            total_elapsed: Duration::ZERO,
        }
    }

    // ------------------------------------------------------------------
    // Updates
    // ------------------------------------------------------------------

    /// Applies a batch of changes, then re-optimizes once.
    ///
    /// Changes rejected for their own content are listed in the report. A
    /// bookkeeping failure aborts the batch and is returned as the error.
    pub fn apply_edge_changes<I>(&mut self, changes: I) -> Result<ChangeReport>
    where
        I: IntoIterator,
        I::Item: Into<EdgeChange>,
    {
        self.apply_edge_changes_observed(changes, &mut [])
    }

    /// [`Self::apply_edge_changes`] with observers called around every change.
    pub fn apply_edge_changes_observed<I>(
        &mut self,
        changes: I,
        observers: &mut [&mut dyn EdgeChangeObserver],
    ) -> Result<ChangeReport>
    where
        I: IntoIterator,
        I::Item: Into<EdgeChange>,
    {
        let started = Instant::now();
        let mut report = ChangeReport::default();

        for (index, change) in changes.into_iter().enumerate() {
            let change = change.into();
            match self.apply_change(index, &change, observers) {
                Ok(effect) => {
                    report.applied += 1;
                    report.disbanded += effect.disbanded;
                    report.pruned += effect.pruned;
                }
                Err(error) if error.is_structural() => {
                    log::warn!("edge change #{index} {change:?} rejected: {error}");
                    report.failures.push(ChangeFailure {
                        index,
                        change,
                        error,
                    });
                }
                Err(error) => {
                    log::error!("edge change #{index} {change:?} broke the session: {error}");
                    return Err(error);
                }
            }
        }

        report.optimization = self.optimizer.run(&mut self.graph)?;
        self.last_report = report.optimization.clone();
        self.record_time(started);
        log::info!(
            "batch: {} applied, {} failed, {} disbanded, {} pruned; {} communities over {} vertices",
            report.applied,
            report.failures.len(),
            report.disbanded,
            report.pruned,
            self.graph.community_count(),
            self.graph.vertex_count()
        );
        Ok(report)
    }

    /// Re-runs the optimizer without changing the graph.
    pub fn optimize(&mut self) -> Result<OptimizationReport> {
        let started = Instant::now();
        let report = self.optimizer.run(&mut self.graph)?;
        self.last_report = report.clone();
        self.record_time(started);
        Ok(report)
    }

    /// Replaces the partition with a prior `{vertex, community}` mapping.
    ///
    /// Community labels only group vertices; each group is named after its
    /// smallest member. Vertices the mapping omits start alone, labels not in
    /// the graph are skipped. Returns the number of seeded vertices. The
    /// next batch (or [`Self::optimize`]) resumes from this partition.
    pub fn seed_assignment<I>(&mut self, mapping: I) -> Result<usize>
    where
        I: IntoIterator<Item = (Label, Label)>,
    {
        let mut pairs = Vec::new();
        for (vertex, community) in mapping {
            match self.vertex(vertex) {
                Some(v) => pairs.push((v, community)),
                None => log::warn!("seed assignment: vertex {vertex} is not in the graph"),
            }
        }
        let seeded = pairs.len();
        self.graph = GroupableGraph::with_assignment(self.graph.graph().clone(), pairs)?;
        log::debug!(
            "seeded {seeded} vertices into {} communities",
            self.graph.community_count()
        );
        Ok(seeded)
    }

    /// Registers `label` as an isolated singleton community.
    ///
    /// Returns `false` if the vertex is already in the graph. With
    /// `auto_create_vertices` off this is the only way endpoints enter the
    /// session. The vertex stays until an edge removal leaves it isolated
    /// with pruning enabled.
    pub fn add_vertex(&mut self, label: Label) -> bool {
        if self.vertex(label).is_some() {
            return false;
        }
        let id = self.ensure_vertex(label);
        log::trace!("registered vertex {label} as {id}");
        true
    }

    /// [`Self::add_vertex`] for every label; returns how many were new.
    pub fn add_vertices<I>(&mut self, labels: I) -> usize
    where
        I: IntoIterator<Item = Label>,
    {
        labels.into_iter().filter(|&label| self.add_vertex(label)).count()
    }

    /// Handle that interrupts the running optimizer from another thread.
    pub fn stop_token(&self) -> StopToken {
        self.optimizer.stop_token()
    }

    fn record_time(&mut self, started: Instant) {
        self.last_elapsed = started.elapsed();
        self.total_elapsed += self.last_elapsed;
    }

    fn apply_change(
        &mut self,
        index: usize,
        change: &EdgeChange,
        observers: &mut [&mut dyn EdgeChangeObserver],
    ) -> Result<ChangeEffect> {
        match *change {
            EdgeChange::Insert {
                source,
                destination,
                weight,
            } => self.insert_edge(index, change, (source, destination), weight, observers),
            EdgeChange::Remove {
                source,
                destination,
            } => self.remove_edge(index, change, (source, destination), observers),
        }
    }

    fn insert_edge(
        &mut self,
        index: usize,
        change: &EdgeChange,
        (source, destination): (Label, Label),
        weight: Weight,
        observers: &mut [&mut dyn EdgeChangeObserver],
    ) -> Result<ChangeEffect> {
        // 1. Validate before anything is touched
        check_weight(weight)?;
        let (u, v) = (self.vertex(source), self.vertex(destination));
        if !self.config.auto_create_vertices {
            if let Some(missing) = [(source, u), (destination, v)]
                .into_iter()
                .find_map(|(label, id)| id.is_none().then_some(label))
            {
                return Err(CommunityError::InvalidEdge {
                    source_label: source,
                    destination,
                    missing,
                });
            }
        }
        if let (Some(u), Some(v)) = (u, v) {
            if !self.config.replace_existing && self.graph.graph().edge(u, v).is_some() {
                return Err(CommunityError::DuplicateEdge(source, destination));
            }
        }

        // 2. Apply
        self.notify_before(index, change, observers);
        let u = self.ensure_vertex(source);
        let v = self.ensure_vertex(destination);
        self.graph.add_edge(u, v, weight, self.config.replace_existing)?;

        // 3. Split communities the new edge connects
        let mut effect = ChangeEffect::default();
        if self.config.disband_on_change {
            let cu = self.community_id(u)?;
            let cv = self.community_id(v)?;
            if cu != cv {
                effect.disbanded += self.graph.disband(cu)?;
                effect.disbanded += self.graph.disband(cv)?;
            }
        }
        self.notify_after(index, change, observers);
        Ok(effect)
    }

    fn remove_edge(
        &mut self,
        index: usize,
        change: &EdgeChange,
        (source, destination): (Label, Label),
        observers: &mut [&mut dyn EdgeChangeObserver],
    ) -> Result<ChangeEffect> {
        // 1. Validate
        let (u, v) = match (self.vertex(source), self.vertex(destination)) {
            (Some(u), Some(v)) => (u, v),
            (None, _) => {
                return Err(CommunityError::InvalidEdge {
                    source_label: source,
                    destination,
                    missing: source,
                });
            }
            (_, None) => {
                return Err(CommunityError::InvalidEdge {
                    source_label: source,
                    destination,
                    missing: destination,
                });
            }
        };
        if self.graph.graph().edge(u, v).is_none() {
            return Err(CommunityError::EdgeNotFound(source, destination));
        }

        // 2. Apply
        self.notify_before(index, change, observers);
        let cu = self.community_id(u)?;
        let cv = self.community_id(v)?;
        self.graph.remove_edge(u, v)?;

        // 3. Split the community that lost an internal edge, then prune
        let mut effect = ChangeEffect::default();
        if self.config.disband_on_change && cu == cv {
            effect.disbanded += self.graph.disband(cu)?;
        }
        if self.config.prune_isolated {
            let endpoints = if u == v { vec![u] } else { vec![u, v] };
            for x in endpoints {
                if self.graph.graph().neighbor_count(x) == 0 {
                    self.graph.remove_vertex(x)?;
                    effect.pruned += 1;
                }
            }
        }
        self.notify_after(index, change, observers);
        Ok(effect)
    }

    fn ensure_vertex(&mut self, label: Label) -> VertexId {
        let id = self.labels.intern(label);
        self.graph.add_vertex(id);
        id
    }

    fn community_id(&self, v: VertexId) -> Result<CommunityId> {
        self.graph
            .community_of(v)
            .ok_or(CommunityError::VertexNotFound(v))
    }

    fn context<'a>(&'a self, index: usize, change: &'a EdgeChange) -> ChangeContext<'a> {
        let (source, destination) = change.endpoints();
        ChangeContext {
            index,
            change,
            source: self.vertex(source),
            destination: self.vertex(destination),
            graph: &self.graph,
        }
    }

    fn notify_before(&self, index: usize, change: &EdgeChange, observers: &mut [&mut dyn EdgeChangeObserver]) {
        if observers.is_empty() {
            return;
        }
        let ctx = self.context(index, change);
        for observer in observers.iter_mut() {
            observer.before_change(&ctx);
        }
    }

    fn notify_after(&self, index: usize, change: &EdgeChange, observers: &mut [&mut dyn EdgeChangeObserver]) {
        if observers.is_empty() {
            return;
        }
        let ctx = self.context(index, change);
        for observer in observers.iter_mut() {
            observer.after_change(&ctx);
        }
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    /// Id of the vertex labelled `label`, if it is in the graph.
    fn vertex(&self, label: Label) -> Option<VertexId> {
        self.labels
            .get(label)
            .filter(|&id| self.graph.contains_vertex(id))
    }

    /// Id of the community labelled `label`, if it exists.
    fn community(&self, label: Label) -> Option<CommunityId> {
        self.vertex(label)
            .filter(|&id| self.graph.assignment().contains_community(id))
    }

    fn label_of(&self, id: VertexId) -> Option<Label> {
        self.labels.label(id)
    }

    fn sorted_labels(&self, ids: impl Iterator<Item = VertexId>) -> Vec<Label> {
        let mut out: Vec<Label> = ids.filter_map(|id| self.label_of(id)).collect();
        out.sort_unstable();
        out
    }

    /// Member count of every community, ascending by community label.
    pub fn community_sizes(&self) -> Vec<(Label, usize)> {
        let mut sizes: Vec<(Label, usize)> = metrics::community_sizes(self.graph.assignment().iter())
            .into_iter()
            .filter_map(|(c, n)| Some((self.label_of(c)?, n)))
            .collect();
        sizes.sort_unstable();
        sizes
    }

    /// Score of the current partition under the active criterion.
    pub fn quality(&self) -> f64 {
        self.optimizer.criterion().score(&self.graph)
    }

    pub fn community_count(&self) -> usize {
        self.graph.community_count()
    }

    /// Community labels, ascending.
    pub fn communities(&self) -> Vec<Label> {
        self.sorted_labels(self.graph.communities())
    }

    /// Community of the vertex labelled `vertex`.
    pub fn community_of(&self, vertex: Label) -> Option<Label> {
        self.vertex(vertex)
            .and_then(|v| self.graph.community_of(v))
            .and_then(|c| self.label_of(c))
    }

    /// Member labels of `community`, ascending.
    pub fn members(&self, community: Label) -> Option<Vec<Label>> {
        let c = self.community(community)?;
        let members = self.graph.assignment().members_of(c).ok()?;
        Some(self.sorted_labels(members))
    }

    /// Internal stubs of `community`: twice its internal edge weight plus loops.
    pub fn community_inner_weight(&self, community: Label) -> Option<Weight> {
        self.community(community)
            .and_then(|c| self.graph.stats(c))
            .map(|s| s.inner)
    }

    /// Sum of the degrees of the members of `community`.
    pub fn community_total_weight(&self, community: Label) -> Option<Weight> {
        self.community(community)
            .and_then(|c| self.graph.stats(c))
            .map(|s| s.total)
    }

    /// Weight between two communities; the inner weight when they coincide.
    pub fn community_edge_weight(&self, a: Label, b: Label) -> Option<Weight> {
        let (a, b) = (self.community(a)?, self.community(b)?);
        self.graph.weight_between(a, b).ok()
    }

    /// Neighbouring communities of `community` with the weight to each, ascending by label.
    pub fn community_neighbours(&self, community: Label) -> Option<Vec<(Label, Weight)>> {
        let c = self.community(community)?;
        let neighbours = self.graph.neighbouring_communities(c).ok()?;
        let mut out: Vec<(Label, Weight)> = neighbours
            .into_iter()
            .filter_map(|(n, w)| self.label_of(n).map(|l| (l, w)))
            .collect();
        out.sort_unstable_by_key(|&(l, _)| l);
        Some(out)
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.vertex_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.graph().edge_count()
    }

    /// Sum of weighted degrees of the graph.
    pub fn total_weight(&self) -> Weight {
        self.graph.total_weight()
    }

    pub fn contains_vertex(&self, vertex: Label) -> bool {
        self.vertex(vertex).is_some()
    }

    /// Neighbours of `vertex` with edge weights, ascending by label.
    pub fn neighbours(&self, vertex: Label) -> Option<Vec<(Label, Weight)>> {
        let v = self.vertex(vertex)?;
        let mut out: Vec<(Label, Weight)> = self
            .graph
            .neighbors(v)
            .filter_map(|(u, w)| self.label_of(u).map(|l| (l, w)))
            .collect();
        out.sort_unstable_by_key(|&(l, _)| l);
        Some(out)
    }

    /// Weight of edge `{u, v}`, 0 when absent.
    pub fn weight(&self, u: Label, v: Label) -> Weight {
        match (self.vertex(u), self.vertex(v)) {
            (Some(u), Some(v)) => self.graph.graph().weight(u, v),
            _ => 0.0,
        }
    }

    /// `{vertex, community}` pairs sorted by vertex label.
    pub fn assignment(&self) -> Vec<(Label, Label)> {
        let mut out: Vec<(Label, Label)> = self
            .graph
            .assignment()
            .iter()
            .filter_map(|(v, c)| Some((self.label_of(v)?, self.label_of(c)?)))
            .collect();
        out.sort_unstable();
        out
    }

    /// Community label → sorted member labels.
    pub fn community_mapping(&self) -> BTreeMap<Label, Vec<Label>> {
        let mut out: BTreeMap<Label, Vec<Label>> = BTreeMap::new();
        for (v, c) in self.assignment() {
            out.entry(c).or_default().push(v);
        }
        out
    }

    /// Processing time of the last batch or [`Self::optimize`] call.
    pub fn last_elapsed(&self) -> Duration {
        self.last_elapsed
    }

    /// Processing time accumulated over the session.
    pub fn total_elapsed(&self) -> Duration {
        self.total_elapsed
    }

    /// Report of the most recent optimizer run.
    pub fn last_report(&self) -> &OptimizationReport {
        &self.last_report
    }

    pub fn graph(&self) -> &GroupableGraph {
        &self.graph
    }

    pub fn labels(&self) -> &LabelInterner {
        &self.labels
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
