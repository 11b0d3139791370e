//! trace.rs
//! Reconstruction of one cost-optimal alignment from the filled tables.

use super::aligner::{pick, ForestStep, PairwiseAligner, TreeStep};
use crate::tree::{BinaryView, ViewId};
use smallvec::SmallVec;

/// Which side(s) a traceback node stems from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pairing {
    Matched(ViewId, ViewId),
    /// Present only in the left view (deleted).
    LeftOnly(ViewId),
    /// Present only in the right view (inserted).
    RightOnly(ViewId),
}

impl Pairing {
    pub fn left(&self) -> Option<ViewId> {
        match *self {
            Pairing::Matched(l, _) | Pairing::LeftOnly(l) => Some(l),
            Pairing::RightOnly(_) => None,
        }
    }

    pub fn right(&self) -> Option<ViewId> {
        match *self {
            Pairing::Matched(_, r) | Pairing::RightOnly(r) => Some(r),
            Pairing::LeftOnly(_) => None,
        }
    }
}

pub type TraceChildren = SmallVec<[Box<TraceNode>; 2]>;

#[derive(Debug, Clone, PartialEq)]
pub struct TraceNode {
    pub pairing: Pairing,
    pub children: TraceChildren,
    pub size: usize,
    pub height: usize,
}

impl TraceNode {
    pub fn new(pairing: Pairing, children: TraceChildren) -> Self {
        let size = 1 + children.iter().map(|c| c.size).sum::<usize>();
        let height = 1 + children.iter().map(|c| c.height).max().unwrap_or(0);
        Self { pairing, children, size, height }
    }

    /// All pairings in pre-order.
    pub fn pairings(&self) -> Vec<Pairing> {
        let mut out = Vec::with_capacity(self.size);
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node.pairing);
            stack.extend(node.children.iter().rev().map(|c| c.as_ref()));
        }
        out
    }

    pub fn is_full_match(&self) -> bool {
        self.pairings().iter().all(|p| matches!(p, Pairing::Matched(..)))
    }
}

// Dropping a deep trace through the default glue recurses once per level.
impl Drop for TraceNode {
    fn drop(&mut self) {
        let mut stack: Vec<Box<TraceNode>> = self.children.drain(..).collect();
        while let Some(mut node) = stack.pop() {
            stack.extend(node.children.drain(..));
        }
    }
}

/// Pending traceback work. `parent` is the arena slot the produced node(s)
/// attach to.
#[derive(Debug, Clone, Copy)]
enum Task {
    Tree { a: Option<ViewId>, b: Option<ViewId>, parent: Option<usize> },
    Forest { a: ViewId, b: ViewId, parent: usize },
    /// A whole subtree present on one side only.
    Unmatched { id: ViewId, side: fn(ViewId) -> Pairing, parent: usize },
    /// A node removed inside a forest; its own children are aligned against
    /// the other side's forest `(a, b)`.
    Removed { pairing: Pairing, a: ViewId, b: ViewId, parent: usize },
}

struct Slot {
    pairing: Pairing,
    children: SmallVec<[usize; 2]>,
}

pub struct Tracer<'x, 'a> {
    aligner: &'x mut PairwiseAligner<'a>,
    slots: Vec<Slot>,
    tasks: Vec<Task>,
}

impl<'x, 'a> Tracer<'x, 'a> {
    pub fn new(aligner: &'x mut PairwiseAligner<'a>) -> Self {
        Self { aligner, slots: Vec::new(), tasks: Vec::new() }
    }

    /// Traceback of the root pair. Works off an explicit task stack, so deep
    /// trees do not grow the call stack.
    pub fn trace(&mut self) -> TraceNode {
        let (l, r) = (self.aligner.left().root(), self.aligner.right().root());
        self.aligner.align();
        self.slots.clear();
        self.tasks.clear();
        self.tasks.push(Task::Tree { a: Some(l), b: Some(r), parent: None });

        while let Some(task) = self.tasks.pop() {
            self.run(task);
        }
        self.assemble()
            .unwrap_or_else(|| TraceNode::new(Pairing::Matched(l, r), TraceChildren::new()))
    }

    fn slot(&mut self, pairing: Pairing, parent: Option<usize>) -> usize {
        let id = self.slots.len();
        self.slots.push(Slot { pairing, children: SmallVec::new() });
        if let Some(p) = parent {
            self.slots[p].children.push(id);
        }
        id
    }

    /// Queues `tasks` so they run in the given order.
    fn then(&mut self, tasks: impl DoubleEndedIterator<Item = Task>) {
        self.tasks.extend(tasks.rev());
    }

    fn run(&mut self, task: Task) {
        let (l, r) = (self.aligner.left(), self.aligner.right());
        match task {
            Task::Tree { a: None, b: None, .. } => {}
            Task::Tree { a: Some(a), b: None, parent } => {
                let id = self.slot(Pairing::LeftOnly(a), parent);
                self.then(unmatched_children(l, a, Pairing::LeftOnly, id));
            }
            Task::Tree { a: None, b: Some(b), parent } => {
                let id = self.slot(Pairing::RightOnly(b), parent);
                self.then(unmatched_children(r, b, Pairing::RightOnly, id));
            }
            Task::Tree { a: Some(a), b: Some(b), parent } => self.run_pair(a, b, parent),
            Task::Forest { a, b, parent } => self.run_forest(a, b, parent),
            Task::Unmatched { id, side, parent } => {
                let view = if matches!(side(id), Pairing::LeftOnly(_)) { l } else { r };
                let own = self.slot(side(id), Some(parent));
                self.then(unmatched_children(view, id, side, own));
            }
            Task::Removed { pairing, a, b, parent } => {
                let own = self.slot(pairing, Some(parent));
                self.tasks.push(Task::Forest { a, b, parent: own });
            }
        }
    }

    fn run_pair(&mut self, a: ViewId, b: ViewId, parent: Option<usize>) {
        let (l, r) = (self.aligner.left(), self.aligner.right());
        let alternatives = self.aligner.tree_alternatives(a, b);
        let step = pick(&alternatives).map_or(TreeStep::Match, |(s, _)| s);

        match step {
            TreeStep::Match => {
                let id = self.slot(Pairing::Matched(a, b), parent);
                self.tasks.push(Task::Forest { a, b, parent: id });
            }
            TreeStep::DeleteLeft { kept } => {
                let id = self.slot(Pairing::LeftOnly(a), parent);
                self.then((0..2).map(|slot| Task::Tree {
                    a: l.child(a, slot),
                    b: if slot == kept { Some(b) } else { None },
                    parent: Some(id),
                }));
            }
            TreeStep::DeleteRight { kept } => {
                let id = self.slot(Pairing::RightOnly(b), parent);
                self.then((0..2).map(|slot| Task::Tree {
                    a: if slot == kept { Some(a) } else { None },
                    b: r.child(b, slot),
                    parent: Some(id),
                }));
            }
        }
    }

    fn run_forest(&mut self, a: ViewId, b: ViewId, parent: usize) {
        let (l, r) = (self.aligner.left(), self.aligner.right());
        let alternatives = self.aligner.forest_alternatives(a, b);
        let step = pick(&alternatives).map_or(ForestStep::Straight, |(s, _)| s);
        let (a0, a1) = (l.child(a, 0), l.child(a, 1));
        let (b0, b1) = (r.child(b, 0), r.child(b, 1));
        let tree = |a, b| Task::Tree { a, b, parent: Some(parent) };

        let parts = match step {
            ForestStep::Straight => [tree(a0, b0), tree(a1, b1)],
            ForestStep::Crossed => [tree(a0, b1), tree(a1, b0)],
            ForestStep::DeleteLeft { slot, child } => {
                let removed = Task::Removed { pairing: Pairing::LeftOnly(child), a: child, b, parent };
                let sibling = tree(l.child(a, 1 - slot), None);
                if slot == 0 { [removed, sibling] } else { [sibling, removed] }
            }
            ForestStep::DeleteRight { slot, child } => {
                let removed = Task::Removed { pairing: Pairing::RightOnly(child), a, b: child, parent };
                let sibling = tree(None, r.child(b, 1 - slot));
                if slot == 0 { [removed, sibling] } else { [sibling, removed] }
            }
        };
        self.then(parts.into_iter());
    }

    /// Builds the boxed tree from the arena. Children always sit in later
    /// slots than their parent, so a backwards pass sees them first.
    fn assemble(&self) -> Option<TraceNode> {
        let mut built: Vec<Option<TraceNode>> = Vec::with_capacity(self.slots.len());
        built.resize_with(self.slots.len(), || None);
        for (i, slot) in self.slots.iter().enumerate().rev() {
            let children = slot.children.iter().filter_map(|&c| built[c].take()).map(Box::new).collect();
            built[i] = Some(TraceNode::new(slot.pairing, children));
        }
        built.into_iter().next().flatten()
    }
}

fn unmatched_children(
    view: &BinaryView,
    id: ViewId,
    side: fn(ViewId) -> Pairing,
    parent: usize,
) -> impl DoubleEndedIterator<Item = Task> + '_ {
    view.node(id).children.iter().map(move |&c| Task::Unmatched { id: c, side, parent })
}
