//! A consensus critical point.

use crate::store::{EdgeId, NodeType, TreeRef};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentNode {
    pub node_type: NodeType,
    /// Aggregated scalar value over all contributing trees.
    pub scalar: f64,
    /// Assigned by the branch decomposition.
    pub branch: Option<usize>,
    pub edges: SmallVec<[EdgeId; 3]>,
    /// One entry per contributing tree, in merge order.
    pub refs: Vec<TreeRef>,
}

impl AlignmentNode {
    pub fn new(node_type: NodeType, scalar: f64, origin: TreeRef) -> Self {
        Self { node_type, scalar, branch: None, edges: SmallVec::new(), refs: vec![origin] }
    }

    /// Number of contributing trees.
    pub fn frequency(&self) -> usize { self.refs.len() }
}
