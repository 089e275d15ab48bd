//! Engine configuration.
//!
//! [`EngineConfig`] gathers every option the optimizer and the dynamic
//! controller recognise. It deserializes from partial documents (missing
//! fields take their defaults) and is checked once by [`EngineConfig::validate`]
//! when an engine is built from it.

use crate::community_error::{CommunityError, Result};
use crate::criterion::CriterionKind;
use crate::louvain::VisitOrder;
use serde::{Deserialize, Serialize};

/// Default move-acceptance threshold.
pub const DEFAULT_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Quality function to maximise.
    pub criterion: CriterionKind,
    /// A move is committed only when its gain exceeds this positive threshold.
    pub epsilon: f64,
    /// Vertex visitation order within a pass.
    pub order: VisitOrder,
    /// Maximum number of levels per round; 0 means unbounded.
    pub max_levels: usize,
    /// Create unknown endpoints on insertion instead of failing with `InvalidEdge`.
    pub auto_create_vertices: bool,
    /// Overwrite the weight of an existing edge instead of failing with `DuplicateEdge`.
    pub replace_existing: bool,
    /// Drop a vertex from the graph once its last edge is removed.
    pub prune_isolated: bool,
    /// Split the communities touched by an edge change back into singletons.
    pub disband_on_change: bool,
    /// Vertices evaluated in parallel per window; 0 is sequential.
    /// Has no effect without the `rayon` feature.
    pub parallel_window: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            criterion: CriterionKind::default(),
            epsilon: DEFAULT_EPSILON,
            order: VisitOrder::Insertion,
            max_levels: 0,
            auto_create_vertices: true,
            replace_existing: true,
            prune_isolated: true,
            disband_on_change: true,
            parallel_window: 0,
        }
    }
}

impl EngineConfig {
    pub fn with_criterion(mut self, criterion: CriterionKind) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_order(mut self, order: VisitOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_max_levels(mut self, max_levels: usize) -> Self {
        self.max_levels = max_levels;
        self
    }

    pub fn with_auto_create_vertices(mut self, enabled: bool) -> Self {
        self.auto_create_vertices = enabled;
        self
    }

    pub fn with_replace_existing(mut self, enabled: bool) -> Self {
        self.replace_existing = enabled;
        self
    }

    pub fn with_prune_isolated(mut self, enabled: bool) -> Self {
        self.prune_isolated = enabled;
        self
    }

    pub fn with_disband_on_change(mut self, enabled: bool) -> Self {
        self.disband_on_change = enabled;
        self
    }

    pub fn with_parallel_window(mut self, window: usize) -> Self {
        self.parallel_window = window;
        self
    }

    /// Checks every parameter, returning the first one out of range.
    pub fn validate(&self) -> Result<()> {
        self.criterion.validate()?;
        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            return Err(CommunityError::InvalidConfig {
                name: "epsilon",
                message: "must be finite and positive",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = EngineConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.epsilon, DEFAULT_EPSILON);
        assert!(cfg.auto_create_vertices);
        assert_eq!(cfg.max_levels, 0);
    }

    #[test]
    fn rejects_bad_epsilon() {
        let cfg = EngineConfig::default().with_epsilon(-1.0);
        assert!(matches!(
            cfg.validate(),
            Err(CommunityError::InvalidConfig { name: "epsilon", .. })
        ));
        assert!(EngineConfig::default().with_epsilon(f64::INFINITY).validate().is_err());
        assert!(matches!(
            EngineConfig::default().with_epsilon(0.0).validate(),
            Err(CommunityError::InvalidConfig { name: "epsilon", .. })
        ));
    }

    #[test]
    fn partial_json_takes_defaults() {
        let cfg: EngineConfig = serde_json::from_str(
            r#"{
                "criterion": {"kind": "balanced_modularity", "resolution": 1.0, "alpha": 0.3},
                "order": {"kind": "shuffled", "seed": 11},
                "max_levels": 2
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.criterion, CriterionKind::balanced(0.3));
        assert_eq!(cfg.order, VisitOrder::Shuffled { seed: 11 });
        assert_eq!(cfg.max_levels, 2);
        assert!(cfg.prune_isolated);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn builder_round_trips_through_json() {
        let cfg = EngineConfig::default()
            .with_auto_create_vertices(false)
            .with_disband_on_change(false)
            .with_parallel_window(64);
        let json = serde_json::to_string(&cfg).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
