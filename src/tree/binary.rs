//! binary.rs
//! Rooted binary projections of a `TreeSource`, used for one pairwise
//! alignment step and dropped afterwards.

use super::source::{ArcMeasures, TreeSource};
use crate::store::NodeType;
use smallvec::SmallVec;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RootingError {
    #[error("root {root} is out of range for a tree with {count} nodes")]
    RootOutOfRange { root: usize, count: usize },
    #[error("arc {arc} is out of range for a tree with {count} arcs")]
    ArcOutOfRange { arc: usize, count: usize },
    #[error("node {node} has {children} children below the chosen root")]
    NotBinary { node: usize, children: usize },
    #[error("the source is not a tree (node {node} reached twice)")]
    NotATree { node: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub u32);

impl ViewId {
    #[inline(always)]
    pub fn index(&self) -> usize { self.0 as usize }
    pub fn new(idx: usize) -> Self { Self(idx as u32) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Critical(NodeType),
    /// Virtual root placed in the middle of an arc.
    Midpoint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewNode {
    pub kind: ViewKind,
    pub scalar: f64,
    /// Source node index; `None` for a midpoint.
    pub node: Option<usize>,
    /// Source arc towards the parent (or the split arc of a midpoint).
    pub arc: Option<usize>,
    /// Measures of `arc`, zero when there is none.
    pub measures: ArcMeasures,
    pub parent: Option<ViewId>,
    pub children: SmallVec<[ViewId; 2]>,
}

#[derive(Debug, Clone)]
pub struct BinaryView {
    nodes: Vec<ViewNode>,
    root: ViewId,
}

impl BinaryView {
    /// Primal rooting: the view root is source node `root`.
    pub fn rooted<S: TreeSource>(src: &S, root: usize) -> Result<Self, RootingError> {
        let count = src.node_count();
        if root >= count {
            return Err(RootingError::RootOutOfRange { root, count });
        }
        let mut view = Self { nodes: Vec::with_capacity(count), root: ViewId(0) };
        let mut visited = vec![false; count];
        view.grow(src, root, None, None, &mut visited)?;
        Ok(view)
    }

    /// Dual rooting: the view root is a midpoint on source arc `arc`, whose two
    /// children are the subtrees hanging off either end of it.
    pub fn dual_rooted<S: TreeSource>(src: &S, arc: usize) -> Result<Self, RootingError> {
        if arc >= src.arc_count() {
            return Err(RootingError::ArcOutOfRange { arc, count: src.arc_count() });
        }
        let count = src.node_count();
        let (a, b) = src.arc_ends(arc);
        let mut view = Self { nodes: Vec::with_capacity(count + 1), root: ViewId(0) };
        view.nodes.push(ViewNode {
            kind: ViewKind::Midpoint,
            scalar: 0.5 * (src.node_scalar(a) + src.node_scalar(b)),
            node: None,
            arc: Some(arc),
            measures: src.arc_measures(arc),
            parent: None,
            children: SmallVec::new(),
        });
        let mut visited = vec![false; count];
        let root = view.root;
        for end in [a, b] {
            view.grow(src, end, Some(arc), Some(root), &mut visited)?;
        }
        // Both halves of the split arc hang below the midpoint without measures.
        let halves = view.nodes[0].children.clone();
        for child in halves {
            let node = &mut view.nodes[child.index()];
            node.arc = None;
            node.measures = ArcMeasures::default();
        }
        Ok(view)
    }

    /// Depth-first growth from `start`, entering it through `via`.
    fn grow<S: TreeSource>(
        &mut self,
        src: &S,
        start: usize,
        via: Option<usize>,
        parent: Option<ViewId>,
        visited: &mut [bool],
    ) -> Result<(), RootingError> {
        let mut stack = vec![(start, via, parent)];

        while let Some((node, via, parent)) = stack.pop() {
            if visited[node] {
                return Err(RootingError::NotATree { node });
            }
            visited[node] = true;

            let id = ViewId::new(self.nodes.len());
            self.nodes.push(ViewNode {
                kind: ViewKind::Critical(src.node_type(node)),
                scalar: src.node_scalar(node),
                node: Some(node),
                arc: via,
                measures: via.map(|a| src.arc_measures(a)).unwrap_or_default(),
                parent,
                children: SmallVec::new(),
            });
            if let Some(p) = parent {
                self.nodes[p.index()].children.push(id);
            }

            let below: SmallVec<[(usize, usize); 3]> =
                src.neighbours(node).into_iter().filter(|&(arc, _)| Some(arc) != via).collect();
            if below.len() > 2 {
                return Err(RootingError::NotBinary { node, children: below.len() });
            }
            // Reverse push keeps the children in adjacency order.
            for (arc, other) in below.into_iter().rev() {
                stack.push((other, Some(arc), Some(id)));
            }
        }
        Ok(())
    }

    pub fn root(&self) -> ViewId { self.root }
    pub fn len(&self) -> usize { self.nodes.len() }
    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    #[inline(always)]
    pub fn node(&self, id: ViewId) -> &ViewNode { &self.nodes[id.index()] }

    /// The child in `slot` (0 or 1), if present.
    #[inline(always)]
    pub fn child(&self, id: ViewId, slot: usize) -> Option<ViewId> {
        self.nodes[id.index()].children.get(slot).copied()
    }

    pub fn child_count(&self, id: ViewId) -> usize { self.nodes[id.index()].children.len() }

    /// Ids in pre-order; children always come after their parent.
    pub fn ids(&self) -> impl DoubleEndedIterator<Item = ViewId> + '_ {
        (0..self.nodes.len()).map(ViewId::new)
    }
}
