//! CommunityError: unified error type for dyncomm public APIs
//!
//! Structural failures from the graph and the assignment are reported through
//! this type and propagate unchanged up to the dynamic-update controller.
//! Nothing inside the optimization loop produces an error once a graph has
//! been built.

use crate::graph::VertexId;
use thiserror::Error;

/// Result alias used across `dyncomm`.
pub type Result<T> = std::result::Result<T, CommunityError>;

/// Unified error type for dyncomm operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommunityError {
    /// The vertex is not part of the graph.
    #[error("vertex {0} not found")]
    VertexNotFound(VertexId),
    /// No edge joins the two endpoints.
    ///
    /// Endpoints are vertex ids from the graph layer and external labels
    /// from the dynamic-update controller, as with `DuplicateEdge`.
    #[error("edge ({0}, {1}) not found")]
    EdgeNotFound(u64, u64),
    /// The community id names no live community.
    #[error("community {0} not found")]
    CommunityNotFound(VertexId),
    /// Inserting an edge that already exists without asking for replacement.
    #[error("edge ({0}, {1}) already exists")]
    DuplicateEdge(u64, u64),
    /// Edge weights must be finite and non-negative.
    #[error("invalid edge weight {0}: weights must be finite and >= 0")]
    InvalidWeight(f64),
    /// An edge references a vertex that does not exist and auto-creation is off.
    #[error("invalid edge ({source_label}, {destination}): endpoint {missing} does not exist")]
    InvalidEdge {
        /// External label of the first endpoint.
        source_label: u64,
        /// External label of the second endpoint.
        destination: u64,
        /// The label that could not be resolved.
        missing: u64,
    },
    /// Rejected configuration value.
    #[error("invalid parameter '{name}': {message}")]
    InvalidConfig {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: &'static str,
    },
    /// Internal bookkeeping disagrees with a from-scratch recount.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl CommunityError {
    /// True for the errors a caller may fix by adjusting the offending change
    /// (as opposed to configuration or bookkeeping failures).
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            CommunityError::VertexNotFound(_)
                | CommunityError::EdgeNotFound(..)
                | CommunityError::DuplicateEdge(..)
                | CommunityError::InvalidWeight(_)
                | CommunityError::InvalidEdge { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_items() {
        let e = CommunityError::DuplicateEdge(3, 7);
        assert_eq!(e.to_string(), "edge (3, 7) already exists");
        let e = CommunityError::InvalidEdge {
            source_label: 10,
            destination: 11,
            missing: 11,
        };
        assert!(e.to_string().contains("endpoint 11"));
    }

    #[test]
    fn structural_classification() {
        assert!(CommunityError::InvalidWeight(-1.0).is_structural());
        assert!(
            !CommunityError::InvalidConfig {
                name: "epsilon",
                message: "must be finite"
            }
            .is_structural()
        );
    }
}
