//! Undirected weighted graphs.
//!
//! [`WeightedGraph`] owns vertices and edges; [`WeightedAdjacency`] is the
//! read-only view that scoring and metrics code is written against.

pub mod traits;
pub mod weighted;

pub use traits::WeightedAdjacency;
pub use weighted::{Neighbors, WeightedGraph};

/// Dense vertex handle.
pub type VertexId = usize;

/// Edge weight (finite and non-negative).
pub type Weight = f64;
