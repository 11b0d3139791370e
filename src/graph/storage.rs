//! storage.rs
//! Dense arena holding the consensus graph of one root candidate.

use super::edge::AlignmentEdge;
use super::node::AlignmentNode;
use crate::store::{EdgeId, NodeId, NodeType, TreeRef};
use crate::tree::{ArcMeasures, BinaryView, ContourTree, Neighbours, RootingError, TreeSource};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusGraph {
    nodes: Vec<AlignmentNode>,
    edges: Vec<AlignmentEdge>,
    root: NodeId,
}

impl ConsensusGraph {
    /// Copies tree `tree_index` one-to-one and roots it at vertex `root`.
    pub fn seed(tree: &ContourTree, tree_index: usize, root: usize) -> Result<Self, RootingError> {
        let count = tree.node_count();
        if root >= count {
            return Err(RootingError::RootOutOfRange { root, count });
        }

        let nodes = tree
            .nodes()
            .iter()
            .enumerate()
            .map(|(i, n)| AlignmentNode::new(n.node_type, n.scalar, TreeRef::new(tree_index, i)))
            .collect();
        let edges = tree
            .arcs()
            .iter()
            .enumerate()
            .map(|(i, arc)| {
                let ends = (NodeId::new(arc.ends.0), NodeId::new(arc.ends.1));
                AlignmentEdge::from_arc(ends, arc, TreeRef::new(tree_index, i))
            })
            .collect();

        Ok(Self::from_parts(nodes, edges, NodeId::new(root)))
    }

    /// Assembles a graph, rebuilding every node's adjacency from `edges`.
    pub(crate) fn from_parts(mut nodes: Vec<AlignmentNode>, edges: Vec<AlignmentEdge>, root: NodeId) -> Self {
        for node in nodes.iter_mut() {
            node.edges.clear();
        }
        for (i, edge) in edges.iter().enumerate() {
            nodes[edge.ends.0.index()].edges.push(EdgeId::new(i));
            nodes[edge.ends.1.index()].edges.push(EdgeId::new(i));
        }
        Self { nodes, edges, root }
    }

    pub fn root(&self) -> NodeId { self.root }
    pub fn nodes(&self) -> &[AlignmentNode] { &self.nodes }
    pub fn edges(&self) -> &[AlignmentEdge] { &self.edges }
    pub fn node(&self, id: NodeId) -> &AlignmentNode { &self.nodes[id.index()] }
    pub fn edge(&self, id: EdgeId) -> &AlignmentEdge { &self.edges[id.index()] }
    pub fn node_mut(&mut self, id: NodeId) -> &mut AlignmentNode { &mut self.nodes[id.index()] }
    pub fn edge_mut(&mut self, id: EdgeId) -> &mut AlignmentEdge { &mut self.edges[id.index()] }
    pub fn edge_count(&self) -> usize { self.edges.len() }

    /// Binary view rooted at the current consensus root.
    pub fn rooted_view(&self) -> Result<BinaryView, RootingError> {
        BinaryView::rooted(self, self.root.index())
    }
}

impl TreeSource for ConsensusGraph {
    fn node_count(&self) -> usize { self.nodes.len() }
    fn arc_count(&self) -> usize { self.edges.len() }
    fn node_type(&self, node: usize) -> NodeType { self.nodes[node].node_type }
    fn node_scalar(&self, node: usize) -> f64 { self.nodes[node].scalar }

    fn neighbours(&self, node: usize) -> Neighbours {
        let id = NodeId::new(node);
        self.nodes[node]
            .edges
            .iter()
            .map(|&e| (e.index(), self.edges[e.index()].other(id).index()))
            .collect()
    }

    fn arc_ends(&self, arc: usize) -> (usize, usize) {
        let (a, b) = self.edges[arc].ends;
        (a.index(), b.index())
    }

    fn arc_measures(&self, arc: usize) -> ArcMeasures { self.edges[arc].measures() }
}
