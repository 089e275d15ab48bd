#![allow(dead_code)]
use dyncomm::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Edge records from `(source, destination, weight)` triples.
pub fn records(list: &[(Label, Label, f64)]) -> Vec<EdgeRecord> {
    list.iter().copied().map(EdgeRecord::from).collect()
}

/// Unit-weight clique over `labels`.
pub fn clique(labels: &[Label]) -> Vec<EdgeRecord> {
    let mut out = Vec::new();
    for (i, &u) in labels.iter().enumerate() {
        for &v in &labels[i + 1..] {
            out.push(EdgeRecord::new(u, v, 1.0));
        }
    }
    out
}

/// `count` cliques of `size` labels each; clique `c` holds labels `c*size ..`.
pub fn cliques(count: u64, size: u64) -> Vec<EdgeRecord> {
    (0..count)
        .flat_map(|c| clique(&(c * size..(c + 1) * size).collect::<Vec<_>>()))
        .collect()
}

/// Weak edges joining clique `c` to clique `c + 1` around a ring.
pub fn ring_bridges(count: u64, size: u64, weight: f64) -> Vec<EdgeRecord> {
    (0..count)
        .map(|c| EdgeRecord::new(c * size, ((c + 1) % count) * size + 1, weight))
        .collect()
}

/// Planted-partition random graph with `groups` blocks of `size` vertices.
pub fn planted_partition(groups: u64, size: u64, p_in: f64, p_out: f64, seed: u64) -> Vec<EdgeRecord> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let n = groups * size;
    let mut out = Vec::new();
    for u in 0..n {
        for v in (u + 1)..n {
            let p = if u / size == v / size { p_in } else { p_out };
            if rng.r#gen::<f64>() < p {
                out.push(EdgeRecord::new(u, v, 1.0));
            }
        }
    }
    out
}

/// Fresh session with default configuration.
pub fn session() -> DynamicUpdateController {
    DynamicUpdateController::new(EngineConfig::default()).unwrap()
}

/// Fresh session fed `edges` in one batch.
pub fn from_scratch(cfg: EngineConfig, edges: &[EdgeRecord]) -> DynamicUpdateController {
    let mut dc = DynamicUpdateController::new(cfg).unwrap();
    dc.apply_edge_changes(edges.iter().copied()).unwrap();
    dc
}

/// Member lists of every community, sorted; independent of representative choice.
pub fn groups<C: Criterion>(dc: &DynamicUpdateController<C>) -> Vec<Vec<Label>> {
    let mut out: Vec<Vec<Label>> = dc.community_mapping().into_values().collect();
    out.sort();
    out
}
