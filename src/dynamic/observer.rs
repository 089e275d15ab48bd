//! Hooks around individual edge changes.

use super::change::EdgeChange;
use crate::community::GroupableGraph;
use crate::graph::VertexId;

/// Read-only view of one change and the graph it applies to.
///
/// Endpoint ids are `None` while the endpoint is not in the graph: before an
/// insertion creates it, or after a removal prunes it.
#[derive(Debug, Clone, Copy)]
pub struct ChangeContext<'a> {
    /// Position of the change in its batch.
    pub index: usize,
    pub change: &'a EdgeChange,
    pub source: Option<VertexId>,
    pub destination: Option<VertexId>,
    pub graph: &'a GroupableGraph,
}

/// Observer notified before and after every structural change of a batch.
///
/// `before_change` runs before the graph is touched; `after_change` runs
/// once the edge change, disbanding and pruning are done. Neither runs for a
/// change rejected during validation.
pub trait EdgeChangeObserver {
    fn before_change(&mut self, _ctx: &ChangeContext<'_>) {}

    fn after_change(&mut self, _ctx: &ChangeContext<'_>) {}
}
