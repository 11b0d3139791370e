//! output.rs
//! Flattened arrays handed back to the hosting pipeline.

use crate::graph::ConsensusGraph;
use crate::store::TreeRef;
use crate::tree::ContourTree;
use serde::{Deserialize, Serialize};

/// Per-tree rows are laid out row-major, `tree_count` entries per node (or
/// edge), indexed by original input position. `-1` marks a tree that does not
/// contribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentOutput {
    pub tree_count: usize,
    /// Scalar value per consensus node.
    pub vertices: Vec<f64>,
    pub frequencies: Vec<usize>,
    pub branch_ids: Vec<i64>,
    /// Original vertex id per node and tree.
    pub vertex_ids: Vec<i64>,
    /// Segmentation id of the contributing vertex's incident arc per node and tree.
    pub segmentation_ids: Vec<i64>,
    /// Two node indices per consensus edge.
    pub edges: Vec<usize>,
    /// Original arc id per edge and tree. A row of all `-1` is a connector
    /// edge that no input arc maps onto.
    pub arc_ids: Vec<i64>,
    /// Winning root vertex in the seeding tree.
    pub root: usize,
    pub cost: f64,
    /// Original tree indices in processing order.
    pub merge_order: Vec<usize>,
}

impl AlignmentOutput {
    pub fn collect(
        graph: &ConsensusGraph,
        trees: &[ContourTree],
        root: usize,
        cost: f64,
        merge_order: Vec<usize>,
    ) -> Self {
        let tree_count = trees.len();
        let nodes = graph.nodes();
        let edges = graph.edges();

        let mut vertex_ids = vec![-1; nodes.len() * tree_count];
        let mut segmentation_ids = vec![-1; nodes.len() * tree_count];
        for (i, node) in nodes.iter().enumerate() {
            for &TreeRef { tree, element } in &node.refs {
                vertex_ids[i * tree_count + tree] = element as i64;
                segmentation_ids[i * tree_count + tree] = trees[tree].segmentation_of(element).unwrap_or(-1);
            }
        }

        let mut arc_ids = vec![-1; edges.len() * tree_count];
        for (i, edge) in edges.iter().enumerate() {
            for r in &edge.refs {
                arc_ids[i * tree_count + r.tree] = r.element as i64;
            }
        }

        Self {
            tree_count,
            vertices: nodes.iter().map(|n| n.scalar).collect(),
            frequencies: nodes.iter().map(|n| n.frequency()).collect(),
            branch_ids: nodes.iter().map(|n| n.branch.map_or(-1, |b| b as i64)).collect(),
            vertex_ids,
            segmentation_ids,
            edges: edges.iter().flat_map(|e| [e.ends.0.index(), e.ends.1.index()]).collect(),
            arc_ids,
            root,
            cost,
            merge_order,
        }
    }

    pub fn node_count(&self) -> usize { self.vertices.len() }
    pub fn edge_count(&self) -> usize { self.edges.len() / 2 }

    pub fn vertex_row(&self, node: usize) -> &[i64] {
        &self.vertex_ids[node * self.tree_count..(node + 1) * self.tree_count]
    }

    pub fn segmentation_row(&self, node: usize) -> &[i64] {
        &self.segmentation_ids[node * self.tree_count..(node + 1) * self.tree_count]
    }

    pub fn arc_row(&self, edge: usize) -> &[i64] {
        &self.arc_ids[edge * self.tree_count..(edge + 1) * self.tree_count]
    }

    pub fn edge_ends(&self, edge: usize) -> (usize, usize) {
        (self.edges[2 * edge], self.edges[2 * edge + 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::decompose;
    use crate::graph::AlignmentEdge;
    use crate::store::NodeId;
    use crate::tree::TreeInput;

    #[test]
    fn test_rows_hold_provenance_per_tree() {
        let trees = vec![
            ContourTree::build(0, &TreeInput::from_arcs(vec![0.0, 1.0], &[(0, 1)])).unwrap(),
            ContourTree::build(1, &TreeInput::from_arcs(vec![3.0, 1.0, 0.0], &[(0, 1), (1, 2)])).unwrap(),
        ];
        let mut graph = ConsensusGraph::seed(&trees[1], 1, 0).unwrap();
        decompose(&mut graph);
        let out = AlignmentOutput::collect(&graph, &trees, 0, 0.0, vec![1]);

        assert_eq!(out.node_count(), 3);
        assert_eq!(out.edge_count(), 2);
        assert_eq!(out.vertex_row(2), &[-1, 2]);
        assert_eq!(out.segmentation_row(0), &[-1, 0]);
        assert_eq!(out.arc_row(1), &[-1, 1]);
        assert_eq!(out.edge_ends(1), (1, 2));
        assert_eq!(out.vertices, vec![3.0, 1.0, 0.0]);
        assert_eq!(out.frequencies, vec![1, 1, 1]);
        assert_eq!(out.branch_ids, vec![0, 0, 0]);
    }

    #[test]
    fn test_connector_edge_has_an_empty_arc_row() {
        let trees = vec![
            ContourTree::build(0, &TreeInput::from_arcs(vec![0.0, 1.0], &[(0, 1)])).unwrap(),
            ContourTree::build(1, &TreeInput::from_arcs(vec![3.0, 1.0, 0.0], &[(0, 1), (1, 2)])).unwrap(),
        ];
        let seeded = ConsensusGraph::seed(&trees[1], 1, 0).unwrap();
        let edges = vec![
            seeded.edges()[0].clone(),
            AlignmentEdge::connector((NodeId::new(1), NodeId::new(2)), 1.0),
        ];
        let graph = ConsensusGraph::from_parts(seeded.nodes().to_vec(), edges, seeded.root());
        let out = AlignmentOutput::collect(&graph, &trees, 0, 0.0, vec![1]);

        assert_eq!(out.arc_row(0), &[-1, 0]);
        assert_eq!(out.arc_row(1), &[-1, -1]);
        assert_eq!(out.edge_ends(1), (1, 2));
    }
}
