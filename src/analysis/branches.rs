//! branches.rs
//! Branch decomposition of the consensus graph.
//!
//! The graph is hung from its root. The first branch runs from the root to
//! the most extreme leaf below it (highest for an ascending branch, lowest for
//! a descending one). Every side subtree hanging off a branch then becomes a
//! new branch, processed breadth first, together with the edge that attaches
//! it. Ties between equally extreme leaves go to the first one reached in
//! adjacency order.

use crate::graph::ConsensusGraph;
use crate::store::{EdgeId, NodeId, NodeType};
use smallvec::SmallVec;
use std::collections::VecDeque;

/// An edge and the node it leads down to.
type Hang = (EdgeId, NodeId);

/// Assigns a branch id to every node and edge and returns the number of branches.
pub fn decompose(graph: &mut ConsensusGraph) -> usize {
    let n = graph.nodes().len();
    let (roots, parent, children) = hang(graph);

    let mut node_branch: Vec<Option<usize>> = vec![None; n];
    let mut edge_branch: Vec<Option<usize>> = vec![None; graph.edge_count()];
    let mut queue: VecDeque<(NodeId, Option<Hang>)> = roots.into_iter().map(|r| (r, None)).collect();
    let mut next = 0;

    while let Some((anchor, via)) = queue.pop_front() {
        let first = via.map_or(anchor, |(_, node)| node);
        let ascending = match via {
            None => graph.node(first).node_type != NodeType::Maximum,
            Some(_) => graph.node(first).scalar >= graph.node(anchor).scalar,
        };

        // 1. Walk back from the extreme leaf to the first node of the branch.
        let leaf = extreme_leaf(graph, &children, first, ascending);
        let mut path = vec![leaf];
        let mut node = leaf;
        while node != first {
            let Some((edge, up)) = parent[node.index()] else { break };
            edge_branch[edge.index()] = Some(next);
            path.push(up);
            node = up;
        }
        path.reverse();

        // 2. Label the branch.
        if let Some((edge, _)) = via {
            edge_branch[edge.index()] = Some(next);
        }
        for &p in &path {
            node_branch[p.index()] = Some(next);
        }

        // 3. Queue the side subtrees, top to bottom.
        for (i, &p) in path.iter().enumerate() {
            let below = path.get(i + 1).copied();
            for &(edge, child) in &children[p.index()] {
                if Some(child) != below {
                    queue.push_back((p, Some((edge, child))));
                }
            }
        }
        next += 1;
    }

    for (i, branch) in node_branch.into_iter().enumerate() {
        graph.node_mut(NodeId::new(i)).branch = branch;
    }
    for (i, branch) in edge_branch.into_iter().enumerate() {
        graph.edge_mut(EdgeId::new(i)).branch = branch;
    }
    next
}

type Hanging = (Vec<NodeId>, Vec<Option<Hang>>, Vec<SmallVec<[Hang; 3]>>);

/// Parent links and child lists of the graph hung from its root. A node not
/// reachable from the root starts a further component of its own.
fn hang(graph: &ConsensusGraph) -> Hanging {
    let n = graph.nodes().len();
    let mut roots = Vec::new();
    let mut parent = vec![None; n];
    let mut children: Vec<SmallVec<[Hang; 3]>> = vec![SmallVec::new(); n];
    let mut seen = vec![false; n];

    for start in std::iter::once(graph.root().index()).chain(0..n) {
        if start >= n || seen[start] {
            continue;
        }
        seen[start] = true;
        roots.push(NodeId::new(start));

        let mut stack = vec![NodeId::new(start)];
        while let Some(node) = stack.pop() {
            for &edge in &graph.node(node).edges {
                let other = graph.edge(edge).other(node);
                if !seen[other.index()] {
                    seen[other.index()] = true;
                    parent[other.index()] = Some((edge, node));
                    children[node.index()].push((edge, other));
                    stack.push(other);
                }
            }
        }
    }
    (roots, parent, children)
}

fn extreme_leaf(graph: &ConsensusGraph, children: &[SmallVec<[Hang; 3]>], first: NodeId, ascending: bool) -> NodeId {
    let mut best: Option<(NodeId, f64)> = None;
    let mut stack = vec![first];
    while let Some(node) = stack.pop() {
        let below = &children[node.index()];
        if below.is_empty() {
            let s = graph.node(node).scalar;
            let better = match best {
                None => true,
                Some((_, b)) if ascending => s > b,
                Some((_, b)) => s < b,
            };
            if better {
                best = Some((node, s));
            }
        }
        stack.extend(below.iter().rev().map(|&(_, c)| c));
    }
    best.map_or(first, |(node, _)| node)
}
