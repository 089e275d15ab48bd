//! Community bookkeeping on top of [`crate::graph`].
//!
//! - [`assignment`]: the vertex ↔ community index.
//! - [`groupable`]: graph plus assignment with incrementally maintained
//!   community aggregates, collapse and unfold.
//! - [`counters`]: brute-force aggregates used to check the incremental ones.

pub mod assignment;
pub mod counters;
pub mod groupable;

pub use assignment::{CommunityId, Departure, ReversibleAssignment};
pub use counters::{CommunityCounters, compute_counters};
pub use groupable::{Collapse, CommunityStats, GroupableGraph, VertexLinks};

#[cfg(test)]
mod tests;
