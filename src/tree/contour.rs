//! contour.rs
//! Tree Adapter: a contour tree built from the flat per-tree arrays a hosting
//! pipeline hands over.

use super::source::{ArcMeasures, Neighbours, TreeSource};
use crate::engine::AlignmentError;
use crate::store::NodeType;
use petgraph::algo::{connected_components, is_cyclic_undirected};
use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Raw arrays describing one input tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TreeInput {
    /// Scalar value per vertex.
    pub scalars: Vec<f64>,
    /// Region size per edge.
    pub region_sizes: Vec<i64>,
    /// Segmentation id per edge.
    pub segmentation_ids: Vec<i64>,
    /// Vertex id pairs, two entries per edge.
    pub topology: Vec<i64>,
    pub vertex_count: usize,
    pub edge_count: usize,
}

impl TreeInput {
    /// Convenience constructor: region size 1 and segmentation id = edge index.
    pub fn from_arcs(scalars: Vec<f64>, arcs: &[(usize, usize)]) -> Self {
        let region_sizes = vec![1; arcs.len()];
        Self::with_regions(scalars, arcs, region_sizes)
    }

    pub fn with_regions(scalars: Vec<f64>, arcs: &[(usize, usize)], region_sizes: Vec<i64>) -> Self {
        let topology = arcs.iter().flat_map(|&(a, b)| [a as i64, b as i64]).collect();
        Self {
            vertex_count: scalars.len(),
            edge_count: arcs.len(),
            segmentation_ids: (0..arcs.len() as i64).collect(),
            region_sizes,
            topology,
            scalars,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CtNode {
    pub node_type: NodeType,
    pub scalar: f64,
    pub arcs: SmallVec<[usize; 3]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CtArc {
    pub ends: (usize, usize),
    pub scalar_distance: f64,
    pub area: f64,
    pub volume: f64,
    pub segmentation_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContourTree {
    nodes: Vec<CtNode>,
    arcs: Vec<CtArc>,
    binary: bool,
}

impl ContourTree {
    /// Builds the adapter for input tree `tree`, verifying that the realized
    /// node count agrees with the declared vertex count.
    pub fn build(tree: usize, input: &TreeInput) -> Result<Self, AlignmentError> {
        let n = input.vertex_count;
        let m = input.edge_count;

        check_len(tree, "scalars", n, input.scalars.len())?;
        check_len(tree, "region_sizes", m, input.region_sizes.len())?;
        check_len(tree, "segmentation_ids", m, input.segmentation_ids.len())?;
        check_len(tree, "topology", 2 * m, input.topology.len())?;
        if let Some(vertex) = input.scalars[..n].iter().position(|s| !s.is_finite()) {
            return Err(AlignmentError::NonFiniteScalar { tree, vertex });
        }

        // 1. Resolve arc endpoints; any id outside 0..n cannot be realized.
        let mut ends = Vec::with_capacity(m);
        let mut referenced = vec![false; n];
        let mut realized = 0;
        for i in 0..m {
            let (a, b) = (input.topology[2 * i], input.topology[2 * i + 1]);
            let (a, b) = match (usize::try_from(a), usize::try_from(b)) {
                (Ok(a), Ok(b)) if a < n && b < n => (a, b),
                _ => {
                    let max_id = a.max(b).max(0) as usize;
                    return Err(AlignmentError::ConstructionMismatch {
                        tree,
                        declared: n,
                        realized: max_id + 1,
                    });
                }
            };
            for v in [a, b] {
                if !referenced[v] {
                    referenced[v] = true;
                    realized += 1;
                }
            }
            ends.push((a, b));
        }
        if m == 0 {
            realized = n.min(1);
        }
        if realized != n {
            return Err(AlignmentError::ConstructionMismatch { tree, declared: n, realized });
        }

        // 2. Nodes and arcs.
        let mut nodes: Vec<CtNode> = input.scalars[..n]
            .iter()
            .map(|&scalar| CtNode { node_type: NodeType::Minimum, scalar, arcs: SmallVec::new() })
            .collect();

        let mut arcs = Vec::with_capacity(m);
        for (i, &(a, b)) in ends.iter().enumerate() {
            let scalar_distance = (nodes[a].scalar - nodes[b].scalar).abs();
            let area = input.region_sizes[i] as f64;
            arcs.push(CtArc {
                ends: (a, b),
                scalar_distance,
                area,
                volume: area * scalar_distance,
                segmentation_id: input.segmentation_ids[i],
            });
            nodes[a].arcs.push(i);
            nodes[b].arcs.push(i);
        }

        // 3. Classify critical points from the local neighbourhood.
        for v in 0..n {
            let node_type = match nodes[v].arcs.as_slice() {
                [] => NodeType::Minimum,
                [only] => {
                    let (a, b) = arcs[*only].ends;
                    let other = if a == v { b } else { a };
                    if nodes[other].scalar > nodes[v].scalar {
                        NodeType::Minimum
                    } else {
                        NodeType::Maximum
                    }
                }
                _ => NodeType::Saddle,
            };
            nodes[v].node_type = node_type;
        }

        let binary = Self::check_binary(&nodes, &ends);
        Ok(Self { nodes, arcs, binary })
    }

    /// A non-empty arc set forming one acyclic component, node degree <= 3.
    fn check_binary(nodes: &[CtNode], ends: &[(usize, usize)]) -> bool {
        if nodes.is_empty() || nodes.iter().any(|n| n.arcs.len() > 3) {
            return false;
        }
        let mut graph = UnGraph::<(), ()>::with_capacity(nodes.len(), ends.len());
        for _ in nodes {
            graph.add_node(());
        }
        for &(a, b) in ends {
            graph.add_edge(NodeIndex::new(a), NodeIndex::new(b), ());
        }
        connected_components(&graph) <= 1 && !is_cyclic_undirected(&graph)
    }

    pub fn is_binary(&self) -> bool { self.binary }
    pub fn node(&self, idx: usize) -> &CtNode { &self.nodes[idx] }
    pub fn arc(&self, idx: usize) -> &CtArc { &self.arcs[idx] }
    pub fn nodes(&self) -> &[CtNode] { &self.nodes }
    pub fn arcs(&self) -> &[CtArc] { &self.arcs }

    /// Vertex indices of all minima and maxima, ascending.
    pub fn extrema(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.node_type.is_extremum())
            .map(|(i, _)| i)
    }

    /// Segmentation id of the first arc incident to `node`, if it has one.
    pub fn segmentation_of(&self, node: usize) -> Option<i64> {
        self.nodes[node].arcs.first().map(|&a| self.arcs[a].segmentation_id)
    }
}

fn check_len(tree: usize, field: &'static str, expected: usize, actual: usize) -> Result<(), AlignmentError> {
    if actual < expected {
        return Err(AlignmentError::InputLength { tree, field, expected, actual });
    }
    Ok(())
}

impl TreeSource for ContourTree {
    fn node_count(&self) -> usize { self.nodes.len() }
    fn arc_count(&self) -> usize { self.arcs.len() }
    fn node_type(&self, node: usize) -> NodeType { self.nodes[node].node_type }
    fn node_scalar(&self, node: usize) -> f64 { self.nodes[node].scalar }

    fn neighbours(&self, node: usize) -> Neighbours {
        self.nodes[node]
            .arcs
            .iter()
            .map(|&arc| {
                let (a, b) = self.arcs[arc].ends;
                (arc, if a == node { b } else { a })
            })
            .collect()
    }

    fn arc_ends(&self, arc: usize) -> (usize, usize) { self.arcs[arc].ends }

    fn arc_measures(&self, arc: usize) -> ArcMeasures {
        let a = &self.arcs[arc];
        ArcMeasures { persistence: a.scalar_distance, area: a.area, volume: a.volume }
    }
}
