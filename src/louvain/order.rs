//! Vertex visitation order for local moving.

use crate::graph::VertexId;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Order in which a pass visits the vertices of a level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VisitOrder {
    /// Ascending vertex id, which is insertion order for interned labels.
    #[default]
    Insertion,
    /// A fresh permutation per pass, drawn from a `SmallRng` seeded once per run.
    Shuffled { seed: u64 },
}

/// Produces the visiting sequence of every pass of one optimizer run.
#[derive(Debug, Clone)]
pub(crate) struct Visitor {
    rng: Option<SmallRng>,
}

impl Visitor {
    pub(crate) fn new(order: VisitOrder) -> Self {
        let rng = match order {
            VisitOrder::Insertion => None,
            VisitOrder::Shuffled { seed } => Some(SmallRng::seed_from_u64(seed)),
        };
        Self { rng }
    }

    /// Reorders `vertices` (ascending on entry) for the next pass.
    pub(crate) fn arrange(&mut self, vertices: &mut [VertexId]) {
        match self.rng.as_mut() {
            None => vertices.sort_unstable(),
            Some(rng) => {
                vertices.sort_unstable();
                vertices.shuffle(rng);
            }
        }
    }
}
