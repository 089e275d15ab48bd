//! Edge changes and per-batch reports.

use crate::community_error::CommunityError;
use crate::louvain::OptimizationReport;
use serde::{Deserialize, Serialize};

/// External vertex label as produced by readers.
pub type Label = u64;

/// Edge record `{source, destination, weight}` as produced by readers.
///
/// A weight of exactly zero removes the edge; any other weight inserts it
/// (or replaces the weight of an existing edge).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: Label,
    pub destination: Label,
    pub weight: f64,
}

impl EdgeRecord {
    pub fn new(source: Label, destination: Label, weight: f64) -> Self {
        Self {
            source,
            destination,
            weight,
        }
    }

    /// Record that removes edge `{source, destination}`.
    pub fn removal(source: Label, destination: Label) -> Self {
        Self::new(source, destination, 0.0)
    }
}

impl From<(Label, Label, f64)> for EdgeRecord {
    fn from((source, destination, weight): (Label, Label, f64)) -> Self {
        Self::new(source, destination, weight)
    }
}

/// One structural change to the graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EdgeChange {
    Insert {
        source: Label,
        destination: Label,
        weight: f64,
    },
    Remove {
        source: Label,
        destination: Label,
    },
}

impl EdgeChange {
    pub fn insert(source: Label, destination: Label, weight: f64) -> Self {
        EdgeChange::Insert {
            source,
            destination,
            weight,
        }
    }

    pub fn remove(source: Label, destination: Label) -> Self {
        EdgeChange::Remove {
            source,
            destination,
        }
    }

    #[inline]
    pub fn endpoints(&self) -> (Label, Label) {
        match *self {
            EdgeChange::Insert {
                source,
                destination,
                ..
            }
            | EdgeChange::Remove {
                source,
                destination,
            } => (source, destination),
        }
    }

    #[inline]
    pub fn is_removal(&self) -> bool {
        matches!(self, EdgeChange::Remove { .. })
    }
}

impl From<EdgeRecord> for EdgeChange {
    fn from(r: EdgeRecord) -> Self {
        if r.weight == 0.0 {
            EdgeChange::remove(r.source, r.destination)
        } else {
            EdgeChange::insert(r.source, r.destination, r.weight)
        }
    }
}

impl From<(Label, Label, f64)> for EdgeChange {
    fn from(t: (Label, Label, f64)) -> Self {
        EdgeRecord::from(t).into()
    }
}

/// A change that was rejected, by position in its batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeFailure {
    pub index: usize,
    pub change: EdgeChange,
    pub error: CommunityError,
}

/// Outcome of one call to `apply_edge_changes`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeReport {
    /// Changes applied to the graph.
    pub applied: usize,
    /// Rejected changes; the others in the batch still applied.
    pub failures: Vec<ChangeFailure>,
    /// Vertices split out of their communities by disbanding.
    pub disbanded: usize,
    /// Vertices dropped after losing their last edge.
    pub pruned: usize,
    /// Re-optimization run after the batch.
    pub optimization: OptimizationReport,
}

impl ChangeReport {
    /// `true` when every change of the batch applied.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Batch positions of the rejected changes, ascending.
    pub fn failed_indices(&self) -> Vec<usize> {
        self.failures.iter().map(|f| f.index).collect()
    }
}
