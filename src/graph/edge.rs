//! A consensus arc between two `AlignmentNode`s.

use crate::store::{NodeId, TreeRef};
use crate::tree::{ArcMeasures, CtArc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentEdge {
    pub ends: (NodeId, NodeId),
    pub scalar_distance: f64,
    pub area: f64,
    pub volume: f64,
    pub branch: Option<usize>,
    /// One entry per contributing tree arc, in merge order.
    pub refs: Vec<TreeRef>,
}

impl AlignmentEdge {
    pub fn from_arc(ends: (NodeId, NodeId), arc: &CtArc, origin: TreeRef) -> Self {
        Self {
            ends,
            scalar_distance: arc.scalar_distance,
            area: arc.area,
            volume: arc.volume,
            branch: None,
            refs: vec![origin],
        }
    }

    /// Structural edge no input arc maps onto.
    pub fn connector(ends: (NodeId, NodeId), scalar_distance: f64) -> Self {
        Self { ends, scalar_distance, area: 0.0, volume: 0.0, branch: None, refs: Vec::new() }
    }

    pub fn frequency(&self) -> usize { self.refs.len() }

    /// The end opposite to `node`.
    pub fn other(&self, node: NodeId) -> NodeId {
        if self.ends.0 == node { self.ends.1 } else { self.ends.0 }
    }

    pub fn measures(&self) -> ArcMeasures {
        ArcMeasures { persistence: self.scalar_distance, area: self.area, volume: self.volume }
    }
}
