//! cost.rs
//! Local edit costs between two view nodes.

use crate::config::{AlignmentConfig, ArcMatchMode};
use crate::tree::{ViewKind, ViewNode};

/// Contribution of a match between incompatible node kinds.
pub const NO_MATCH: f64 = f32::MAX as f64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    pub arc_match: ArcMatchMode,
    pub weight_combinatorial: f64,
    pub weight_arc: f64,
    pub weight_scalar: f64,
}

impl CostModel {
    pub fn from_config(config: &AlignmentConfig) -> Self {
        Self {
            arc_match: config.arc_match,
            weight_combinatorial: config.weight_combinatorial,
            weight_arc: config.weight_arc,
            weight_scalar: config.weight_scalar,
        }
    }

    /// Cost of matching `a` with `b`.
    pub fn substitute(&self, a: &ViewNode, b: &ViewNode) -> f64 {
        let compatible = match (a.kind, b.kind) {
            (ViewKind::Critical(x), ViewKind::Critical(y)) => x == y,
            (ViewKind::Midpoint, ViewKind::Midpoint) => true,
            _ => false,
        };
        if !compatible {
            return NO_MATCH;
        }
        let degree_penalty = if a.children.len() == b.children.len() { 0.0 } else { 1.0 };
        let arc_diff = (a.measures.get(self.arc_match) - b.measures.get(self.arc_match)).abs();
        let scalar_diff = (a.scalar - b.scalar).abs();

        self.weight_combinatorial * degree_penalty
            + self.weight_arc * arc_diff
            + self.weight_scalar * scalar_diff
    }

    /// Cost of deleting `a` (or inserting it, from the other side).
    pub fn remove(&self, a: &ViewNode) -> f64 {
        self.weight_combinatorial
            + self.weight_arc * a.measures.get(self.arc_match)
            + self.weight_scalar * a.scalar.abs()
    }
}
