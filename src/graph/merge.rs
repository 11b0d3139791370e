//! merge.rs
//! Folds a traceback into the consensus graph.
//!
//! Existing nodes keep their index; nodes only present in the incoming tree
//! are appended. Edges are rebuilt in traceback pre-order, each one carrying
//! the old consensus arc and/or incoming tree arc that ends at its lower node.
//!
//! An arc midpoint is not a node. Its traceback entry becomes a junction, and
//! the two real nodes meeting there are rejoined by a single edge carrying
//! the split arc(s).

use super::edge::AlignmentEdge;
use super::node::AlignmentNode;
use super::storage::ConsensusGraph;
use crate::compute::{Pairing, TraceNode};
use crate::config::AggregationPolicy;
use crate::engine::AlignmentError;
use crate::store::{EdgeId, NodeId, TreeRef};
use crate::tree::{BinaryView, ContourTree, ViewId, ViewKind, ViewNode};
use smallvec::SmallVec;

/// Where a traceback entry hangs.
#[derive(Debug, Clone, Copy)]
enum Link {
    Root,
    Node(NodeId),
    Junction(usize),
}

/// Real nodes meeting at a midpoint, plus the arcs split by it.
struct Junction {
    ends: SmallVec<[NodeId; 3]>,
    old: Option<usize>,
    incoming: Option<usize>,
}

pub struct ConsensusMerger<'t> {
    /// All input trees, by original index.
    trees: &'t [ContourTree],
    policy: AggregationPolicy,
}

impl<'t> ConsensusMerger<'t> {
    pub fn new(trees: &'t [ContourTree], policy: AggregationPolicy) -> Self {
        Self { trees, policy }
    }

    /// `left` must be a view of `graph`, `right` a view of tree `tree_index`,
    /// and `trace` an alignment between the two. Either view may be rooted at
    /// an arc midpoint. Fails with `UnmergeableView` when a midpoint is paired
    /// with a critical point, or when its junction does not join exactly two
    /// nodes.
    pub fn merge(
        &self,
        graph: &ConsensusGraph,
        left: &BinaryView,
        right: &BinaryView,
        trace: &TraceNode,
        tree_index: usize,
    ) -> Result<ConsensusGraph, AlignmentError> {
        let mut nodes: Vec<AlignmentNode> = graph.nodes().to_vec();
        let mut edges = Vec::with_capacity(graph.edge_count() + right.len());
        let mut junctions: Vec<Junction> = Vec::new();
        let mut root = None;

        let mut stack: Vec<(&TraceNode, Link)> = vec![(trace, Link::Root)];
        while let Some((step, link)) = stack.pop() {
            let here = match midpoint_arcs(step.pairing, left, right)? {
                Some((old, incoming)) => {
                    let mut junction = Junction { ends: SmallVec::new(), old, incoming };
                    match link {
                        Link::Root => {}
                        Link::Node(p) => junction.ends.push(p),
                        Link::Junction(_) => return Err(AlignmentError::UnmergeableView),
                    }
                    junctions.push(junction);
                    Link::Junction(junctions.len() - 1)
                }
                None => {
                    let id = self.resolve_node(&mut nodes, step.pairing, left, right, tree_index)?;
                    match link {
                        Link::Root => root = Some(id),
                        Link::Node(p) => {
                            let old = step.pairing.left().and_then(|l| left.node(l).arc);
                            let incoming = step.pairing.right().and_then(|r| right.node(r).arc);
                            edges.push(self.resolve_edge(graph, &nodes, (id, p), old, incoming, tree_index));
                        }
                        Link::Junction(j) => junctions[j].ends.push(id),
                    }
                    Link::Node(id)
                }
            };
            for child in step.children.iter().rev() {
                stack.push((child.as_ref(), here));
            }
        }

        for junction in junctions {
            let &[a, b] = junction.ends.as_slice() else {
                return Err(AlignmentError::UnmergeableView);
            };
            edges.push(self.resolve_edge(graph, &nodes, (b, a), junction.old, junction.incoming, tree_index));
        }

        // A midpoint root leaves the previous root in place.
        Ok(ConsensusGraph::from_parts(nodes, edges, root.unwrap_or(graph.root())))
    }

    fn resolve_node(
        &self,
        nodes: &mut Vec<AlignmentNode>,
        pairing: Pairing,
        left: &BinaryView,
        right: &BinaryView,
        tree_index: usize,
    ) -> Result<NodeId, AlignmentError> {
        let tree = &self.trees[tree_index];
        match pairing {
            Pairing::Matched(l, r) => {
                let id = source_node(left, l)?;
                let v = source_node(right, r)?;
                let node = &mut nodes[id];
                let previous = node.refs.len();
                node.refs.push(TreeRef::new(tree_index, v));
                let scalar = self.aggregate(
                    node.scalar,
                    previous,
                    tree.node(v).scalar,
                    node.refs.iter().map(|r| self.trees[r.tree].node(r.element).scalar),
                );
                node.scalar = scalar;
                Ok(NodeId::new(id))
            }
            Pairing::LeftOnly(l) => Ok(NodeId::new(source_node(left, l)?)),
            Pairing::RightOnly(r) => {
                let v = source_node(right, r)?;
                let ct = tree.node(v);
                nodes.push(AlignmentNode::new(ct.node_type, ct.scalar, TreeRef::new(tree_index, v)));
                Ok(NodeId::new(nodes.len() - 1))
            }
        }
    }

    /// Edge between `child` and `parent`, inheriting consensus edge `old`
    /// and incoming tree arc `incoming`.
    fn resolve_edge(
        &self,
        graph: &ConsensusGraph,
        nodes: &[AlignmentNode],
        (child, parent): (NodeId, NodeId),
        old: Option<usize>,
        incoming: Option<usize>,
        tree_index: usize,
    ) -> AlignmentEdge {
        let mut edge = match old {
            Some(e) => {
                let mut edge = graph.edge(EdgeId::new(e)).clone();
                edge.ends = (child, parent);
                edge.branch = None;
                edge
            }
            None => {
                let gap = (nodes[child.index()].scalar - nodes[parent.index()].scalar).abs();
                AlignmentEdge::connector((child, parent), gap)
            }
        };

        if let Some(a) = incoming {
            let arc = self.trees[tree_index].arc(a);
            let previous = edge.refs.len();
            edge.refs.push(TreeRef::new(tree_index, a));

            let arcs: Vec<_> = edge.refs.iter().map(|r| self.trees[r.tree].arc(r.element)).collect();
            edge.scalar_distance = self.aggregate(
                edge.scalar_distance,
                previous,
                arc.scalar_distance,
                arcs.iter().map(|c| c.scalar_distance),
            );
            edge.area = self.aggregate(edge.area, previous, arc.area, arcs.iter().map(|c| c.area));
            edge.volume = self.aggregate(edge.volume, previous, arc.volume, arcs.iter().map(|c| c.volume));
        }
        edge
    }

    /// New aggregate after `sample` joins `previous` earlier contributions.
    /// `all` yields every contribution, the new one included.
    fn aggregate(&self, current: f64, previous: usize, sample: f64, all: impl Iterator<Item = f64>) -> f64 {
        match self.policy {
            AggregationPolicy::Average => {
                let n = previous as f64;
                (current * n + sample) / (n + 1.0)
            }
            AggregationPolicy::Median => median(all.collect()),
            AggregationPolicy::LastMatched => sample,
        }
    }
}

fn source_node(view: &BinaryView, id: ViewId) -> Result<usize, AlignmentError> {
    view.node(id).node.ok_or(AlignmentError::UnmergeableView)
}

/// Split arcs `(old, incoming)` when `pairing` involves a midpoint, `None`
/// when it pairs critical points only.
fn midpoint_arcs(
    pairing: Pairing,
    left: &BinaryView,
    right: &BinaryView,
) -> Result<Option<(Option<usize>, Option<usize>)>, AlignmentError> {
    let l = pairing.left().map(|id| left.node(id));
    let r = pairing.right().map(|id| right.node(id));
    let is_midpoint = |n: Option<&ViewNode>| n.is_some_and(|n| n.kind == ViewKind::Midpoint);

    match (is_midpoint(l), is_midpoint(r)) {
        (false, false) => Ok(None),
        (true, true) => Ok(Some((l.and_then(|n| n.arc), r.and_then(|n| n.arc)))),
        (true, false) if r.is_none() => Ok(Some((l.and_then(|n| n.arc), None))),
        (false, true) if l.is_none() => Ok(Some((None, r.and_then(|n| n.arc)))),
        _ => Err(AlignmentError::UnmergeableView),
    }
}

/// Mean of the two middle values for even counts.
fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        0.5 * (values[mid - 1] + values[mid])
    } else {
        values[mid]
    }
}
