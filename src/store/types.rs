use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline(always)]
    pub fn index(&self) -> usize { self.0 as usize }
    pub fn new(idx: usize) -> Self { Self(idx as u32) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct EdgeId(pub u32);

impl EdgeId {
    #[inline(always)]
    pub fn index(&self) -> usize { self.0 as usize }
    pub fn new(idx: usize) -> Self { Self(idx as u32) }
}

/// The kind of critical point a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    Minimum,
    Maximum,
    Saddle,
}

impl NodeType {
    pub fn is_extremum(&self) -> bool {
        !matches!(self, NodeType::Saddle)
    }
}

/// Provenance entry: which input tree contributed, and the index of the
/// contributing node (or arc) inside that tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TreeRef {
    pub tree: usize,
    pub element: usize,
}

impl TreeRef {
    pub fn new(tree: usize, element: usize) -> Self { Self { tree, element } }
}
