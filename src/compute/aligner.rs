//! aligner.rs
//! Pairwise alignment of two rooted binary views by dynamic programming over
//! two mutually recursive memo tables: whole subtrees and child forests.

use super::cost::CostModel;
use crate::tree::{BinaryView, ViewId};
use smallvec::SmallVec;

/// How the subtree pair `(a, b)` is aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeStep {
    Match,
    /// `a` is deleted; its child in slot `kept` absorbs `b`, the other is deleted.
    DeleteLeft { kept: usize },
    /// `b` is inserted; its child in slot `kept` absorbs `a`, the other is inserted.
    DeleteRight { kept: usize },
}

/// How the children of a matched pair `(a, b)` are aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForestStep {
    Straight,
    Crossed,
    /// The left child in `slot` is deleted and its own children take over
    /// `b`'s children; the left sibling is deleted whole.
    DeleteLeft { slot: usize, child: ViewId },
    DeleteRight { slot: usize, child: ViewId },
}

pub(crate) type Alternatives<S> = SmallVec<[(S, f64); 6]>;

/// First alternative attaining the minimum. Fill and traceback both go
/// through here, so they always agree on ties. A NaN never replaces a
/// number already seen.
pub(crate) fn pick<S: Copy>(alternatives: &[(S, f64)]) -> Option<(S, f64)> {
    let mut best: Option<(S, f64)> = None;
    for &(step, value) in alternatives {
        if best.map_or(true, |(_, v)| value < v) {
            best = Some((step, value));
        }
    }
    best
}

/// `align` fills both tables bottom-up without recursion, so tree height is
/// bounded only by memory (two `|left| x |right|` tables). Calling `tree` or
/// `forest` on an unfilled cell evaluates it recursively instead.
pub struct PairwiseAligner<'a> {
    left: &'a BinaryView,
    right: &'a BinaryView,
    cost: CostModel,
    // |left| x |right|, row-major by left id.
    tree_memo: Vec<Option<f64>>,
    forest_memo: Vec<Option<f64>>,
    // Cost of deleting (inserting) each whole subtree.
    left_removal: Vec<f64>,
    right_removal: Vec<f64>,
}

impl<'a> PairwiseAligner<'a> {
    pub fn new(left: &'a BinaryView, right: &'a BinaryView, cost: CostModel) -> Self {
        let cells = left.len() * right.len();
        Self {
            left,
            right,
            cost,
            tree_memo: vec![None; cells],
            forest_memo: vec![None; cells],
            left_removal: subtree_removal(left, &cost),
            right_removal: subtree_removal(right, &cost),
        }
    }

    pub fn left(&self) -> &'a BinaryView { self.left }
    pub fn right(&self) -> &'a BinaryView { self.right }

    /// Minimum edit cost between the two roots.
    pub fn align(&mut self) -> f64 {
        let (l, r) = (self.left.root(), self.right.root());
        if self.tree_memo[self.key(l, r)].is_none() {
            self.fill();
        }
        self.tree(Some(l), Some(r))
    }

    /// Fills every cell. Ids are pre-order, so walking both sides backwards
    /// sees every child pair first; within a cell the forest goes before the
    /// tree that reads it.
    fn fill(&mut self) {
        let (l, r) = (self.left, self.right);
        for a in l.ids().rev() {
            for b in r.ids().rev() {
                let key = self.key(a, b);
                if self.forest_memo[key].is_none() {
                    let alternatives = self.forest_alternatives(a, b);
                    self.forest_memo[key] = Some(pick(&alternatives).map_or(0.0, |(_, v)| v));
                }
                if self.tree_memo[key].is_none() {
                    let alternatives = self.tree_alternatives(a, b);
                    self.tree_memo[key] = Some(pick(&alternatives).map_or(0.0, |(_, v)| v));
                }
            }
        }
    }

    /// Number of filled cells in both tables.
    pub fn filled(&self) -> usize {
        self.tree_memo.iter().chain(self.forest_memo.iter()).filter(|c| c.is_some()).count()
    }

    #[inline(always)]
    fn key(&self, a: ViewId, b: ViewId) -> usize {
        a.index() * self.right.len() + b.index()
    }

    /// Alignment cost of two (possibly absent) subtrees.
    pub fn tree(&mut self, a: Option<ViewId>, b: Option<ViewId>) -> f64 {
        match (a, b) {
            (None, None) => 0.0,
            (Some(a), None) => self.left_removal[a.index()],
            (None, Some(b)) => self.right_removal[b.index()],
            (Some(a), Some(b)) => {
                let key = self.key(a, b);
                if let Some(v) = self.tree_memo[key] {
                    return v;
                }
                let alternatives = self.tree_alternatives(a, b);
                let v = pick(&alternatives).map_or(0.0, |(_, v)| v);
                self.tree_memo[key] = Some(v);
                v
            }
        }
    }

    /// Alignment cost of the child forests of `a` and `b`.
    pub fn forest(&mut self, a: ViewId, b: ViewId) -> f64 {
        let key = self.key(a, b);
        if let Some(v) = self.forest_memo[key] {
            return v;
        }
        let alternatives = self.forest_alternatives(a, b);
        let v = pick(&alternatives).map_or(0.0, |(_, v)| v);
        self.forest_memo[key] = Some(v);
        v
    }

    pub(crate) fn tree_alternatives(&mut self, a: ViewId, b: ViewId) -> Alternatives<TreeStep> {
        let (l, r) = (self.left, self.right);
        let mut alternatives = Alternatives::new();

        // 1. Match a with b.
        let matched = self.cost.substitute(l.node(a), r.node(b)) + self.forest(a, b);
        alternatives.push((TreeStep::Match, matched));

        // 2. Delete a; b descends into one of a's children.
        let delete_a = self.cost.remove(l.node(a));
        for kept in 0..l.child_count(a).max(1) {
            let v = delete_a + self.tree(l.child(a, kept), Some(b)) + self.tree(l.child(a, 1 - kept), None);
            alternatives.push((TreeStep::DeleteLeft { kept }, v));
        }

        // 3. Insert b; a descends into one of b's children.
        let insert_b = self.cost.remove(r.node(b));
        for kept in 0..r.child_count(b).max(1) {
            let v = insert_b + self.tree(Some(a), r.child(b, kept)) + self.tree(None, r.child(b, 1 - kept));
            alternatives.push((TreeStep::DeleteRight { kept }, v));
        }

        alternatives
    }

    pub(crate) fn forest_alternatives(&mut self, a: ViewId, b: ViewId) -> Alternatives<ForestStep> {
        let (l, r) = (self.left, self.right);
        let (a0, a1) = (l.child(a, 0), l.child(a, 1));
        let (b0, b1) = (r.child(b, 0), r.child(b, 1));
        let mut alternatives = Alternatives::new();

        let straight = self.tree(a0, b0) + self.tree(a1, b1);
        alternatives.push((ForestStep::Straight, straight));
        let crossed = self.tree(a0, b1) + self.tree(a1, b0);
        alternatives.push((ForestStep::Crossed, crossed));

        for slot in 0..2 {
            if let Some(child) = l.child(a, slot) {
                let v = self.cost.remove(l.node(child))
                    + self.forest(child, b)
                    + self.tree(l.child(a, 1 - slot), None);
                alternatives.push((ForestStep::DeleteLeft { slot, child }, v));
            }
        }
        for slot in 0..2 {
            if let Some(child) = r.child(b, slot) {
                let v = self.cost.remove(r.node(child))
                    + self.forest(a, child)
                    + self.tree(None, r.child(b, 1 - slot));
                alternatives.push((ForestStep::DeleteRight { slot, child }, v));
            }
        }

        alternatives
    }
}

fn subtree_removal(view: &BinaryView, cost: &CostModel) -> Vec<f64> {
    let mut removal = vec![0.0; view.len()];
    // Pre-order ids: walking backwards sees every child before its parent.
    for id in view.ids().rev() {
        let own = cost.remove(view.node(id));
        let below: f64 = view.node(id).children.iter().map(|c| removal[c.index()]).sum();
        removal[id.index()] = own + below;
    }
    removal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArcMatchMode;
    use crate::tree::{ContourTree, TreeInput};

    fn model(wc: f64, wa: f64, ws: f64) -> CostModel {
        CostModel { arc_match: ArcMatchMode::Persistence, weight_combinatorial: wc, weight_arc: wa, weight_scalar: ws }
    }

    fn tree(scalars: Vec<f64>, arcs: &[(usize, usize)]) -> ContourTree {
        ContourTree::build(0, &TreeInput::from_arcs(scalars, arcs)).unwrap()
    }

    fn path() -> ContourTree {
        tree(vec![0.0, 5.0, 10.0], &[(0, 1), (1, 2)])
    }

    fn superset() -> ContourTree {
        // path() with an extra saddle(3)/max(4) branch on the lower arc
        tree(vec![0.0, 5.0, 10.0, 2.0, 8.0], &[(0, 3), (3, 1), (1, 2), (3, 4)])
    }

    #[test]
    fn test_pick_prefers_first_of_equal_minima() {
        let alternatives = [("a", 2.0), ("b", 1.0), ("c", 1.0), ("d", 3.0)];
        assert_eq!(pick(&alternatives), Some(("b", 1.0)));
        assert_eq!(pick::<&str>(&[]), None);
    }

    #[test]
    fn test_pick_skips_nan_after_a_number() {
        let alternatives = [("a", 1.0), ("b", f64::NAN), ("c", 2.0)];
        assert_eq!(pick(&alternatives), Some(("a", 1.0)));
    }

    #[test]
    fn test_deep_path_aligns_without_recursion() {
        let n = 800;
        let arcs: Vec<(usize, usize)> = (1..n).map(|i| (i - 1, i)).collect();
        let deep = tree((0..n).map(|i| i as f64).collect(), &arcs);
        let view = BinaryView::rooted(&deep, 0).unwrap();
        let mut aligner = PairwiseAligner::new(&view, &view, model(1.0, 1.0, 1.0));
        assert_eq!(aligner.align(), 0.0);
        assert_eq!(aligner.filled(), 2 * n * n);
    }

    #[test]
    fn test_identical_trees_cost_nothing() {
        let (t1, t2) = (superset(), superset());
        let left = BinaryView::rooted(&t1, 0).unwrap();
        let right = BinaryView::rooted(&t2, 0).unwrap();
        let mut aligner = PairwiseAligner::new(&left, &right, model(1.0, 1.0, 1.0));
        assert_eq!(aligner.align(), 0.0);
    }

    #[test]
    fn test_superset_costs_extra_nodes() {
        let (small, big) = (path(), superset());
        let left = BinaryView::rooted(&small, 0).unwrap();
        let right = BinaryView::rooted(&big, 0).unwrap();

        let mut aligner = PairwiseAligner::new(&left, &right, model(1.0, 0.0, 0.0));
        assert_eq!(aligner.align(), 2.0);

        // Symmetric in the sides.
        let mut swapped = PairwiseAligner::new(&right, &left, model(1.0, 0.0, 0.0));
        assert_eq!(swapped.align(), 2.0);
    }

    #[test]
    fn test_against_empty_side_is_sum_of_removals() {
        let big = superset();
        let view = BinaryView::rooted(&big, 0).unwrap();
        let mut aligner = PairwiseAligner::new(&view, &view, model(1.0, 1.0, 0.0));
        // 5 nodes and arcs 2 + 3 + 5 + 6.
        assert_eq!(aligner.tree(Some(view.root()), None), 5.0 + 16.0);
        assert_eq!(aligner.tree(None, Some(view.root())), 21.0);
        assert_eq!(aligner.tree(None, None), 0.0);
    }

    #[test]
    fn test_crossed_children_are_matched() {
        // Same Y shape, children listed in opposite order.
        let t1 = tree(vec![0.0, 4.0, 10.0, 7.0], &[(0, 1), (1, 2), (1, 3)]);
        let t2 = tree(vec![0.0, 4.0, 7.0, 10.0], &[(0, 1), (1, 2), (1, 3)]);
        let left = BinaryView::rooted(&t1, 0).unwrap();
        let right = BinaryView::rooted(&t2, 0).unwrap();
        let mut aligner = PairwiseAligner::new(&left, &right, model(1.0, 1.0, 1.0));
        assert_eq!(aligner.align(), 0.0);
    }

    #[test]
    fn test_every_cell_computed_at_most_once() {
        let (t1, t2) = (superset(), path());
        let left = BinaryView::rooted(&t1, 0).unwrap();
        let right = BinaryView::rooted(&t2, 0).unwrap();
        let mut aligner = PairwiseAligner::new(&left, &right, model(1.0, 1.0, 0.0));
        let first = aligner.align();
        let filled = aligner.filled();
        assert!(filled <= 2 * left.len() * right.len());
        assert_eq!(aligner.align(), first);
        assert_eq!(aligner.filled(), filled);
    }
}
