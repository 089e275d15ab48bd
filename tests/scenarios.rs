mod util;

use dyncomm::metrics::modularity_from_scratch;
use dyncomm::prelude::*;
use util::*;

#[test]
fn triangle_is_one_community() {
    let mut dc = session();
    dc.apply_edge_changes(records(&[(1, 2, 1.0), (2, 3, 1.0), (1, 3, 1.0)]))
        .unwrap();
    assert_eq!(groups(&dc), vec![vec![1, 2, 3]]);
    assert!(dc.quality().abs() < 1e-12);
}

#[test]
fn disjoint_triangles_are_two_communities() {
    let mut dc = session();
    let mut edges = clique(&[1, 2, 3]);
    edges.extend(clique(&[4, 5, 6]));
    dc.apply_edge_changes(edges).unwrap();
    assert_eq!(groups(&dc), vec![vec![1, 2, 3], vec![4, 5, 6]]);
    assert!((dc.quality() - 0.5).abs() < 1e-12);
}

#[test]
fn ring_of_cliques_recovers_cliques() {
    let mut edges = cliques(5, 4);
    edges.extend(ring_bridges(5, 4, 1.0));
    let dc = from_scratch(EngineConfig::default(), &edges);
    let expected: Vec<Vec<Label>> = (0..5).map(|c| (c * 4..c * 4 + 4).collect()).collect();
    assert_eq!(groups(&dc), expected);
}

/// Edges {1,2} and {3,4} joined by a heavy bridge 2-3.
fn heavy_bridge() -> Vec<EdgeRecord> {
    records(&[(1, 2, 1.0), (3, 4, 1.0), (2, 3, 10.0)])
}

#[test]
fn removing_bridge_splits_when_it_improves() {
    let mut dc = session();
    dc.apply_edge_changes(heavy_bridge()).unwrap();
    assert_eq!(groups(&dc), vec![vec![1, 2, 3, 4]]);

    let report = dc.apply_edge_changes([EdgeRecord::removal(2, 3)]).unwrap();
    assert!(report.is_clean());
    assert_eq!(groups(&dc), vec![vec![1, 2], vec![3, 4]]);

    // the split beats keeping the old community
    let merged = modularity_from_scratch(dc.graph().graph(), |_| Some(0), 1.0);
    assert!(dc.quality() > merged);
    assert!((dc.quality() - 0.5).abs() < 1e-12);
}

#[test]
fn removing_bridge_between_separate_communities_keeps_them() {
    let mut dc = session();
    let mut edges = clique(&[1, 2, 3]);
    edges.extend(clique(&[4, 5, 6]));
    edges.push(EdgeRecord::new(3, 4, 1.0));
    dc.apply_edge_changes(edges).unwrap();
    let before = groups(&dc);
    assert_eq!(before, vec![vec![1, 2, 3], vec![4, 5, 6]]);

    dc.apply_edge_changes([EdgeRecord::removal(3, 4)]).unwrap();
    assert_eq!(groups(&dc), before);
}

#[test]
fn without_disbanding_removal_cannot_split() {
    let cfg = EngineConfig::default().with_disband_on_change(false);
    let mut dc = DynamicUpdateController::new(cfg).unwrap();
    dc.apply_edge_changes(heavy_bridge()).unwrap();
    dc.apply_edge_changes([EdgeRecord::removal(2, 3)]).unwrap();
    // local moves only reach neighbouring communities, and every neighbour is inside
    assert_eq!(dc.community_count(), 1);
    assert!(dc.quality().abs() < 1e-12);
}

#[test]
fn empty_session_is_not_an_error() {
    let mut dc = session();
    let report = dc.apply_edge_changes(Vec::<EdgeRecord>::new()).unwrap();
    assert_eq!(report.applied, 0);
    assert_eq!(report.optimization.rounds, 0);
    assert_eq!(dc.community_count(), 0);
    assert_eq!(dc.quality(), 0.0);
    assert!(dc.assignment().is_empty());
}

#[test]
fn collapse_keeps_total_weight_and_score() {
    let mut edges = cliques(3, 4);
    edges.extend(ring_bridges(3, 4, 0.5));
    edges.push(EdgeRecord::new(0, 0, 2.0));
    let dc = from_scratch(EngineConfig::default(), &edges);
    let collapse = dc.graph().collapse().unwrap();
    assert_eq!(collapse.graph.vertex_count(), dc.community_count());
    assert!((collapse.graph.total_weight() - dc.total_weight()).abs() < 1e-9);
    let m = Modularity::default();
    assert!((m.score(&collapse.graph) - m.score(dc.graph())).abs() < 1e-12);
}

#[test]
fn self_loops_count_once() {
    let mut dc = session();
    dc.apply_edge_changes(records(&[(1, 1, 2.0), (1, 2, 1.0)])).unwrap();
    assert_eq!(dc.total_weight(), 4.0);
    assert_eq!(dc.weight(1, 1), 2.0);
    let c = dc.community_of(1).unwrap();
    let inner = dc.community_inner_weight(c).unwrap();
    let total = dc.community_total_weight(c).unwrap();
    assert!(inner <= total);
}
