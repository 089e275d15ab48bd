use super::*;
use crate::graph::WeightedAdjacency;

use crate::debug_invariants::DebugInvariants;

#[test]
fn empty_graph_collapses_to_empty_graph() {
    let g = GroupableGraph::new();
    let collapse = g.collapse().unwrap();
    assert!(collapse.graph.is_empty());
    assert!(collapse.origin.is_empty());
    assert!(collapse.graph.validate_invariants().is_ok());
}

#[test]
fn isolated_vertex_survives_collapse() {
    let mut g = GroupableGraph::new();
    g.add_vertex(0);
    g.add_vertex(4);
    let collapse = g.collapse().unwrap();
    assert_eq!(collapse.origin, vec![0, 4]);
    assert_eq!(collapse.graph.vertex_count(), 2);
    assert_eq!(collapse.graph.total_weight(), 0.0);
}
