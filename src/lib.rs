#![cfg_attr(docsrs, feature(doc_cfg))]
//! # dyncomm
//!
//! dyncomm computes and incrementally maintains a community structure over an
//! undirected weighted graph that changes through edge insertions and
//! removals. A batch of changes is applied to an existing partition and the
//! Louvain optimizer resumes from it instead of restarting from singletons.
//!
//! ## Layers
//! - [`graph`]: adjacency-based weighted graph and the read-only
//!   [`WeightedAdjacency`](graph::WeightedAdjacency) view.
//! - [`community`]: vertex ↔ community index, community aggregates
//!   maintained on every move, collapse into a reduced graph and unfold.
//! - [`criterion`]: quality functions with O(degree) move gains
//!   (modularity, balanced modularity).
//! - [`louvain`]: the multi-level local-search optimizer.
//! - [`dynamic`]: edge-change batches, observers, label interning and the
//!   session object tying everything together.
//!
//! ## Determinism
//!
//! Adjacency and candidate sets are ordered maps, ties resolve to the lowest
//! community id, and shuffled visiting orders draw from a `SmallRng` seeded
//! by configuration. Identical input and configuration give identical
//! partitions.
//!
//! ## Features
//! - `rayon`: parallel gain evaluation in fixed-size windows of a pass.
//! - `strict-invariants`: run invariant checks in release builds too.
//!
//! ## Usage
//!
//! ```
//! use dyncomm::prelude::*;
//!
//! let mut session = DynamicUpdateController::new(EngineConfig::default()).unwrap();
//! let triangle = [
//!     EdgeRecord::new(1, 2, 1.0),
//!     EdgeRecord::new(2, 3, 1.0),
//!     EdgeRecord::new(1, 3, 1.0),
//! ];
//! session.apply_edge_changes(triangle).unwrap();
//! assert_eq!(session.community_count(), 1);
//! ```

pub mod community;
pub mod community_error;
pub mod config;
pub mod criterion;
pub mod debug_invariants;
pub mod dynamic;
pub mod graph;
pub mod louvain;
pub mod metrics;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::community::{CommunityId, CommunityStats, GroupableGraph, ReversibleAssignment};
    pub use crate::community_error::{CommunityError, Result};
    pub use crate::config::EngineConfig;
    pub use crate::criterion::{BalancedModularity, Criterion, CriterionKind, Modularity};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::dynamic::{
        ChangeReport, DynamicUpdateController, EdgeChange, EdgeChangeObserver, EdgeRecord, Label,
    };
    pub use crate::graph::{VertexId, Weight, WeightedAdjacency, WeightedGraph};
    pub use crate::louvain::{Louvain, OptimizationReport, StopToken, VisitOrder};
}

// Sessions are moved to worker threads and cloned for concurrent use.
static_assertions::assert_impl_all!(graph::WeightedGraph: Send, Sync, Clone);
static_assertions::assert_impl_all!(community::GroupableGraph: Send, Sync, Clone);
static_assertions::assert_impl_all!(dynamic::DynamicUpdateController: Send, Sync, Clone);
static_assertions::assert_impl_all!(louvain::StopToken: Send, Sync, Clone);
